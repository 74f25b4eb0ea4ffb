//! The resolution engine - cache lookup in front of the resolver.

use std::path::PathBuf;

use tda_core::{DependencyGraph, ResolutionOutcome, ResolutionResult, TaskSpec};
use tracing::{debug, info};

use crate::{DependencyResolver, ResultCache};

/// Configuration for the resolution engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// File mirror for the result cache (None = memory only)
    pub cache_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror the result cache to `path`.
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }
}

/// Resolves task graphs, memoizing results per canonical graph.
///
/// ```text
/// tasks → graph → canonical key → cache hit?  → cached result
///                                 cache miss? → resolve → store
/// ```
pub struct ResolutionEngine {
    resolver: DependencyResolver,
    cache: ResultCache,
}

impl ResolutionEngine {
    /// Create an engine with an in-memory cache.
    pub fn new() -> Self {
        Self::with_cache(ResultCache::in_memory())
    }

    /// Create an engine using `cache`.
    pub fn with_cache(cache: ResultCache) -> Self {
        Self {
            resolver: DependencyResolver::new(),
            cache,
        }
    }

    /// Create an engine from configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        match &config.cache_path {
            Some(path) => Self::with_cache(ResultCache::open(path)),
            None => Self::new(),
        }
    }

    /// Resolve a task list.
    pub fn process(&self, tasks: &[TaskSpec]) -> ResolutionOutcome {
        self.process_graph(DependencyGraph::from_tasks(tasks))
    }

    /// Resolve a graph, serving identical graphs from the cache.
    ///
    /// A miss writes the cache file mirror synchronously, so async callers
    /// should run this on a blocking thread.
    pub fn process_graph(&self, graph: DependencyGraph) -> ResolutionOutcome {
        let key = graph.canonical_key();

        if let Some(result) = self.cache.get(&key) {
            debug!("Cache hit for graph of {} tasks", graph.len());
            return ResolutionOutcome {
                from_cache: true,
                result,
            };
        }

        let result = self.resolver.resolve(&graph);
        if result.is_fully_resolved() {
            info!("Resolved {} tasks", graph.len());
        } else {
            info!(
                "Resolved {} tasks ({} blocked, {} cycles)",
                graph.len(),
                result.blocked_tasks.len(),
                result.cycles_detected.len()
            );
        }
        self.cache.put(key, result.clone());

        ResolutionOutcome {
            from_cache: false,
            result,
        }
    }

    /// Resolve without consulting or filling the cache.
    pub fn resolve_uncached(&self, graph: &DependencyGraph) -> ResolutionResult {
        self.resolver.resolve(graph)
    }

    /// Get a reference to the result cache.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }
}

impl Default for ResolutionEngine {
    fn default() -> Self {
        Self::new()
    }
}
