//! # Storage Module
//!
//! Persistent storage backends.

mod redb_store;

pub use redb_store::RedbStore;
