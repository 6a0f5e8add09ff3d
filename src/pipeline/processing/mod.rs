// Pipeline processing: per-table cleaning and the denormalizing join

pub mod clean;
pub mod join;

pub use clean::{clean_products, clean_transactions, clean_users, TableStats};
pub use join::join;
