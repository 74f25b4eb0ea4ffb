//! Dependency graph - task id to the ids it depends on.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::task::TaskSpec;

/// Mapping from task id to its declared dependencies.
///
/// Iteration follows insertion order, which is also the tie-break order of
/// the resolver. Inserting an id twice replaces the dependency list but keeps
/// the position of the first insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyGraph {
    edges: IndexMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from tasks in submission order.
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a TaskSpec>) -> Self {
        tasks
            .into_iter()
            .map(|t| (t.id.clone(), t.depends_on.clone()))
            .collect()
    }

    /// Insert or replace the dependencies of a task.
    pub fn insert(&mut self, id: impl Into<String>, depends_on: Vec<String>) {
        self.edges.insert(id.into(), depends_on);
    }

    /// Dependencies declared by `id`, if it is a node of the graph.
    pub fn dependencies(&self, id: &str) -> Option<&[String]> {
        self.edges.get(id).map(Vec::as_slice)
    }

    /// Whether `id` is a node of the graph.
    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Node ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Nodes with their dependencies, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.edges.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Position of `id` in insertion order.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.edges.get_index_of(id)
    }

    /// Node at `index` in insertion order.
    pub fn get_index(&self, index: usize) -> Option<(&str, &[String])> {
        self.edges
            .get_index(index)
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Canonical string form used as a cache key.
    ///
    /// Keys are sorted, dependency lists keep their declared order, and the
    /// output is compact JSON, so two graphs share a key exactly when they
    /// hold the same edges.
    pub fn canonical_key(&self) -> String {
        let mut sorted: Vec<_> = self.edges.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let object: Map<String, Value> = sorted
            .into_iter()
            .map(|(id, deps)| (id.clone(), Value::from(deps.clone())))
            .collect();

        Value::Object(object).to_string()
    }

    /// Borrow the underlying ordered map.
    pub fn as_map(&self) -> &IndexMap<String, Vec<String>> {
        &self.edges
    }
}

impl FromIterator<(String, Vec<String>)> for DependencyGraph {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        let mut graph = Self::new();
        for (id, deps) in iter {
            graph.insert(id, deps);
        }
        graph
    }
}

impl From<IndexMap<String, Vec<String>>> for DependencyGraph {
    fn from(edges: IndexMap<String, Vec<String>>) -> Self {
        Self { edges }
    }
}
