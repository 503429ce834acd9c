//! Repositories: free functions over the SQLite pool
//!
//! Write-path functions that must participate in the ingestion transaction
//! take `&mut SqliteConnection`; everything else takes the pool.

pub mod project;
pub mod span;
pub mod stats;
pub mod trace;
pub mod user;
