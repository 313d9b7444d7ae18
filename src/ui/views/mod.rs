mod product_table;

pub use product_table::ProductTableView;
