//! Execution layer - dependency resolution and result caching.

#![warn(missing_docs)]

pub mod cache;
pub mod dependency;
pub mod engine;

pub use cache::{CacheError, ResultCache};
pub use dependency::{blocked_tasks, detect_cycles, topological_order, DependencyResolver};
pub use engine::{EngineConfig, ResolutionEngine};
