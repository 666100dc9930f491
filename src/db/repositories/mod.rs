pub mod sheet_rows;
