//! Data layer: store initialization, row types, repositories

pub mod error;
pub mod repositories;
pub mod schema;
pub mod store;
pub mod types;

pub use error::DataError;
pub use store::Store;
