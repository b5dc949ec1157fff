//! Core types and trait definitions for the Curio decision-record engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! It holds the status state machine, the conflict-resolution planner, the
//! content diff and the timeline projections; storage backends apply what
//! these compute.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod conflict;
pub mod decision;
pub mod error;
pub mod record;
pub mod relationship;
pub mod status;
pub mod store;
pub mod timeline;
pub mod version;

pub use error::{Classify, Error, ErrorKind, Result};
