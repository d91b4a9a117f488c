//! Storage layer
//!
//! A single SQLite database holds every user's data. Services borrow the
//! connection from `Database`; row mapping lives in `rows`.

pub mod database;
pub mod files;
pub(crate) mod rows;
pub mod schema;

pub use database::Database;
pub use files::{read_to_string, write_atomic};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
