//! HTTP surface: routing, auth middleware, shared response types

pub mod auth;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod server;
pub mod types;

pub use server::ApiServer;
