//! Record store abstraction and implementations for Tandem.
//!
//! The progress core never owns its data: it reads activity logs, pairings
//! and repair signals from a store and writes idempotent completion records
//! back. This crate provides the trait plus an in-memory and a JSON-file
//! backend.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;

pub use trait_::{RecordStore, StorageError, Result};
pub use json_storage::JsonStore;
pub use memory::MemoryStore;
