//! SQLite backend for the Curio decision-record engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every mutation runs inside a single
//! `BEGIN IMMEDIATE` transaction, which serialises writers and makes the
//! read-decide-write sequence of a status change atomic.

mod encode;
mod queries;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
