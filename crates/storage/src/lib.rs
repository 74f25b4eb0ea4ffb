//! Task store abstraction and implementations.
//!
//! This crate provides the trait the agent reads tasks through and writes
//! resolution results back to, with a JSON-file backend, an in-memory
//! backend and a retrying wrapper.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;
pub mod retry;

pub use trait_::{TaskStore, StoreError, Result};
pub use json_storage::JsonTaskStore;
pub use memory::MemoryTaskStore;
pub use retry::{RetryPolicy, RetryingStore};
