pub mod decoder;
pub mod filter;
pub mod format;
pub mod models;
