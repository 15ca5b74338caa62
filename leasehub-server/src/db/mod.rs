//! Database layer - client and repositories
//!
//! # Design Principles
//!
//! - One cached client; repositories borrow the `Database`
//! - Rely on unique indexes and handle duplicate-key errors
//! - Transactions for multi-document writes (leads, wishlists)
//! - Joins via `$lookup` in a single aggregation, never per-row queries

pub mod pool;
pub mod repos;

pub use pool::{connect, ensure_indexes, ping};
pub use repos::*;
