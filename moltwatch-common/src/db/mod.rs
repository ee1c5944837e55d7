//! Database access: initialization, schema, and row models

pub mod init;
pub mod models;

pub use init::init_database;
