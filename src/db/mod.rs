//! Database module for PostgreSQL connection handling

pub mod connection;

pub use connection::{init_pool, qualified, quote_ident};
