pub mod config;
pub mod database;
pub mod error;
pub mod types;

pub use config::{Config, StoreKind};
pub use database::Database;
