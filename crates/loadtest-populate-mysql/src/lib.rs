//! MySQL backend for the unit-ingest insert workload.

pub mod args;
pub mod error;
pub mod store;

pub use args::{mask_connection_password, DbConfig, MySQLPopulateArgs};
pub use error::MySQLPopulatorError;
pub use store::MySQLStore;
