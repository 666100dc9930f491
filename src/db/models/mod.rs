pub mod sheet_row;

pub use sheet_row::SheetRow;
