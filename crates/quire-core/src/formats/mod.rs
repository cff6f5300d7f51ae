//! # Formats Module
//!
//! Serialization formats for Quire snapshots.

mod persistence;

pub use persistence::*;
