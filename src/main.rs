fn main() {
    roadtones_lib::run()
}
