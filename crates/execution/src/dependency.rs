//! Dependency resolution for tasks.
//!
//! Resolution runs in two passes over a [`DependencyGraph`]:
//!
//! 1. a depth-first walk that records every closed loop it meets, and
//! 2. Kahn's algorithm over the nodes that are not part of any loop.
//!
//! Whatever the second pass cannot place is reported as blocked. Nothing in
//! here fails: dangling edges and cycles degrade into blocked tasks.

use std::collections::{HashMap, HashSet, VecDeque};

use tda_core::{DependencyGraph, ResolutionResult};
use tracing::debug;

/// Resolves task dependency graphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyResolver;

impl DependencyResolver {
    /// Create a new resolver.
    pub fn new() -> Self {
        Self
    }

    /// Resolve `graph` into an execution order, blocked tasks and cycles.
    pub fn resolve(&self, graph: &DependencyGraph) -> ResolutionResult {
        let cycles = detect_cycles(graph);
        let cycle_members: HashSet<&str> = cycles
            .iter()
            .flat_map(|c| c.iter().map(String::as_str))
            .collect();

        let execution_order = topological_order(graph, &cycle_members);
        let blocked = blocked_tasks(graph, &execution_order, &cycles);

        debug!(
            "Resolved {} tasks: {} ordered, {} blocked, {} cycles",
            graph.len(),
            execution_order.len(),
            blocked.len(),
            cycles.len()
        );

        ResolutionResult {
            execution_order,
            blocked_tasks: blocked,
            cycles_detected: cycles,
            raw_graph: graph.clone(),
        }
    }
}

/// Find closed loops with a depth-first walk.
///
/// Roots are taken in graph order and dependencies are followed in declared
/// order. Reaching a node on the active path records the path slice from
/// that node plus the node again; reaching a finished node records nothing.
/// Edges to ids outside the graph are not followed.
///
/// Cycles are deduplicated by exact sequence only: two records of one loop
/// that start at different nodes are both kept.
pub fn detect_cycles(graph: &DependencyGraph) -> Vec<Vec<String>> {
    let n = graph.len();
    let name = |idx: usize| graph.get_index(idx).map(|(id, _)| id.to_string()).unwrap_or_default();

    let mut visited = vec![false; n];
    let mut on_path = vec![false; n];
    // (node, index of the next dependency to follow)
    let mut path: Vec<(usize, usize)> = Vec::new();
    let mut raw: Vec<Vec<String>> = Vec::new();

    for root in 0..n {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        on_path[root] = true;
        path.push((root, 0));

        while let Some(&(node, next)) = path.last() {
            let deps = graph.get_index(node).map(|(_, d)| d).unwrap_or(&[]);
            if next >= deps.len() {
                path.pop();
                on_path[node] = false;
                continue;
            }
            if let Some(frame) = path.last_mut() {
                frame.1 += 1;
            }

            let Some(dep) = graph.index_of(&deps[next]) else {
                continue;
            };

            if on_path[dep] {
                let start = path.iter().position(|&(n, _)| n == dep).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|&(n, _)| name(n)).collect();
                cycle.push(name(dep));
                raw.push(cycle);
            } else if !visited[dep] {
                visited[dep] = true;
                on_path[dep] = true;
                path.push((dep, 0));
            }
        }
    }

    let mut seen = HashSet::new();
    raw.into_iter().filter(|c| seen.insert(c.clone())).collect()
}

/// Order the nodes of `graph` that are not in `excluded` with Kahn's algorithm.
///
/// The in-degree of a node is the length of its dependency list, so a
/// dependency listed twice must be satisfied twice and never is; such a task
/// stays unscheduled. A dependency on an id outside the graph can never be
/// satisfied either.
///
/// Ties are broken by graph insertion order: the initial queue is seeded in
/// insertion order and newly freed dependents are enqueued in insertion
/// order, first-declared task first.
pub fn topological_order(graph: &DependencyGraph, excluded: &HashSet<&str>) -> Vec<String> {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    // dependency -> dependents, each dependent once, in graph order
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for (id, deps) in graph.iter() {
        *in_degree.entry(id).or_insert(0) += deps.len();

        let mut distinct = HashSet::new();
        for dep in deps {
            in_degree.entry(dep.as_str()).or_insert(0);
            if distinct.insert(dep.as_str()) {
                dependents.entry(dep.as_str()).or_default().push(id);
            }
        }
    }

    let mut queue: VecDeque<&str> = graph
        .ids()
        .filter(|id| in_degree.get(id).copied() == Some(0) && !excluded.contains(id))
        .collect();
    let mut emitted: HashSet<&str> = HashSet::new();
    let mut order = Vec::with_capacity(graph.len());

    while let Some(node) = queue.pop_front() {
        order.push(node.to_string());
        emitted.insert(node);

        let Some(waiting) = dependents.get(node) else {
            continue;
        };
        for &dependent in waiting {
            if excluded.contains(dependent) {
                continue;
            }
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 && !emitted.contains(dependent) {
                    queue.push_back(dependent);
                }
            }
        }
    }

    order
}

/// Tasks left out of `order`.
///
/// Non-cyclic leftovers come first in graph order, followed by cycle
/// members in order of first appearance across `cycles`. Each id appears
/// once.
pub fn blocked_tasks(graph: &DependencyGraph, order: &[String], cycles: &[Vec<String>]) -> Vec<String> {
    let ordered: HashSet<&str> = order.iter().map(String::as_str).collect();
    let cycle_members: HashSet<&str> = cycles
        .iter()
        .flat_map(|c| c.iter().map(String::as_str))
        .collect();

    let leftovers = graph
        .ids()
        .filter(|id| !ordered.contains(id) && !cycle_members.contains(id));
    let cyclic = cycles.iter().flat_map(|c| c.iter().map(String::as_str));

    let mut seen = HashSet::new();
    leftovers
        .chain(cyclic)
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(pairs: &[(&str, &[&str])]) -> DependencyGraph {
        pairs
            .iter()
            .map(|(id, deps)| (id.to_string(), deps.iter().map(|d| d.to_string()).collect::<Vec<_>>()))
            .collect()
    }

    fn strings(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn resolve(pairs: &[(&str, &[&str])]) -> ResolutionResult {
        DependencyResolver::new().resolve(&graph(pairs))
    }

    #[test]
    fn test_linear_chain() {
        let result = resolve(&[("A", &[]), ("B", &["A"]), ("C", &["B"])]);
        assert_eq!(result.execution_order, strings(&["A", "B", "C"]));
        assert!(result.blocked_tasks.is_empty());
        assert!(result.cycles_detected.is_empty());
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let result = resolve(&[("C", &[]), ("A", &[]), ("B", &["C", "A"]), ("D", &["A"])]);
        assert_eq!(result.execution_order, strings(&["C", "A", "B", "D"]));
    }

    #[test]
    fn test_dependencies_declared_after_dependents() {
        let result = resolve(&[("C", &["B"]), ("B", &["A"]), ("A", &[])]);
        assert_eq!(result.execution_order, strings(&["A", "B", "C"]));
    }

    #[test]
    fn test_three_node_cycle() {
        let result = resolve(&[("1", &["3"]), ("2", &["1"]), ("3", &["2"])]);

        assert!(result.execution_order.is_empty());
        let blocked: HashSet<_> = result.blocked_tasks.iter().map(String::as_str).collect();
        assert_eq!(blocked, HashSet::from(["1", "2", "3"]));
        assert_eq!(result.cycles_detected, vec![strings(&["1", "3", "2", "1"])]);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let result = resolve(&[("A", &["A"]), ("B", &[])]);
        assert_eq!(result.cycles_detected, vec![strings(&["A", "A"])]);
        assert_eq!(result.execution_order, strings(&["B"]));
        assert_eq!(result.blocked_tasks, strings(&["A"]));
    }

    #[test]
    fn test_dependents_of_cycle_are_blocked() {
        let result = resolve(&[("A", &["B"]), ("B", &["A"]), ("C", &["A"]), ("D", &[]), ("E", &["C"])]);

        assert_eq!(result.execution_order, strings(&["D"]));
        // Non-cyclic leftovers first, then cycle members
        assert_eq!(result.blocked_tasks, strings(&["C", "E", "A", "B"]));
    }

    #[test]
    fn test_dangling_dependency_blocks_without_error() {
        let result = resolve(&[("A", &[]), ("B", &["ghost"]), ("C", &["B"])]);
        assert_eq!(result.execution_order, strings(&["A"]));
        assert_eq!(result.blocked_tasks, strings(&["B", "C"]));
        assert!(result.cycles_detected.is_empty());
    }

    #[test]
    fn test_duplicate_dependency_entry_never_schedules() {
        let result = resolve(&[("A", &[]), ("B", &["A", "A"]), ("C", &[])]);
        assert_eq!(result.execution_order, strings(&["A", "C"]));
        assert_eq!(result.blocked_tasks, strings(&["B"]));
    }

    #[test]
    fn test_cycle_dedup_is_literal_not_rotation_invariant() {
        // Both loops share node B; the walk from A records A->B->A, then the
        // walk continues from B into C and back to B.
        let result = resolve(&[("A", &["B"]), ("B", &["A", "C"]), ("C", &["B"])]);
        assert_eq!(
            result.cycles_detected,
            vec![strings(&["A", "B", "A"]), strings(&["B", "C", "B"])]
        );

        // A loop closed twice along the same path is recorded once
        let result = resolve(&[("A", &["B"]), ("B", &["A", "A"])]);
        assert_eq!(result.cycles_detected, vec![strings(&["A", "B", "A"])]);
    }

    #[test]
    fn test_loops_through_shared_node_reported_separately() {
        let cycles = detect_cycles(&graph(&[("X", &["B"]), ("A", &["B"]), ("B", &["C"]), ("C", &["B", "A"])]));
        assert!(cycles.contains(&strings(&["B", "C", "B"])));
        assert!(cycles.iter().all(|c| c.first() == c.last()));
    }

    #[test]
    fn test_shared_substructure_is_not_a_cycle() {
        let result = resolve(&[("A", &["C"]), ("B", &["C"]), ("C", &[]), ("D", &["A", "B"])]);
        assert!(result.cycles_detected.is_empty());
        assert_eq!(result.execution_order, strings(&["C", "A", "B", "D"]));
    }

    #[test]
    fn test_empty_graph() {
        let result = resolve(&[]);
        assert!(result.execution_order.is_empty());
        assert!(result.blocked_tasks.is_empty());
        assert!(result.cycles_detected.is_empty());
    }

    #[test]
    fn test_raw_graph_echoed() {
        let g = graph(&[("A", &[]), ("B", &["A"])]);
        let result = DependencyResolver::new().resolve(&g);
        assert_eq!(result.raw_graph, g);
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let n = 50_000;
        let g: DependencyGraph = (0..n)
            .map(|i| {
                let deps = if i + 1 < n { vec![format!("t{}", i + 1)] } else { vec![] };
                (format!("t{}", i), deps)
            })
            .collect();
        let result = DependencyResolver::new().resolve(&g);
        assert_eq!(result.execution_order.len(), n);
        assert_eq!(result.execution_order[0], format!("t{}", n - 1));
    }

    /// Small deterministic generator so property checks run without extra crates.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: usize) -> usize {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((self.0 >> 33) as usize) % bound
        }
    }

    fn random_graph(rng: &mut Lcg, acyclic: bool) -> DependencyGraph {
        let n = 1 + rng.next(12);
        (0..n)
            .map(|i| {
                let fanout = rng.next(4);
                let deps: Vec<String> = (0..fanout)
                    .filter_map(|_| {
                        if acyclic {
                            (i > 0).then(|| format!("n{}", rng.next(i)))
                        } else {
                            // Occasionally point outside the graph
                            Some(format!("n{}", rng.next(n + 2)))
                        }
                    })
                    .collect();
                (format!("n{}", i), deps)
            })
            .collect()
    }

    #[test]
    fn test_property_acyclic_order_respects_dependencies() {
        let mut rng = Lcg(7);
        for _ in 0..300 {
            let mut g = random_graph(&mut rng, true);
            // Dedup dependency lists so every task is schedulable
            g = g
                .iter()
                .map(|(id, deps)| {
                    let mut seen = HashSet::new();
                    let deps: Vec<String> = deps.iter().filter(|d| seen.insert(d.as_str())).cloned().collect();
                    (id.to_string(), deps)
                })
                .collect();

            let result = DependencyResolver::new().resolve(&g);
            assert!(result.cycles_detected.is_empty());
            assert!(result.blocked_tasks.is_empty());
            assert_eq!(result.execution_order.len(), g.len());

            let position: HashMap<&str, usize> = result
                .execution_order
                .iter()
                .enumerate()
                .map(|(i, id)| (id.as_str(), i))
                .collect();
            for (id, deps) in g.iter() {
                for dep in deps {
                    assert!(position[dep.as_str()] < position[id]);
                }
            }
        }
    }

    #[test]
    fn test_property_every_task_classified_once() {
        let mut rng = Lcg(42);
        for _ in 0..300 {
            let g = random_graph(&mut rng, false);
            let result = DependencyResolver::new().resolve(&g);

            let ordered: HashSet<&str> = result.execution_order.iter().map(String::as_str).collect();
            let blocked: HashSet<&str> = result.blocked_tasks.iter().map(String::as_str).collect();
            let all: HashSet<&str> = g.ids().collect();

            assert_eq!(ordered.len(), result.execution_order.len());
            assert_eq!(blocked.len(), result.blocked_tasks.len());
            assert!(ordered.is_disjoint(&blocked));
            assert_eq!(&ordered | &blocked, all);
        }
    }

    #[test]
    fn test_property_cycles_are_closed_walks() {
        let mut rng = Lcg(1234);
        for _ in 0..300 {
            let g = random_graph(&mut rng, false);
            for cycle in detect_cycles(&g) {
                assert!(cycle.len() >= 2);
                assert_eq!(cycle.first(), cycle.last());
                for pair in cycle.windows(2) {
                    let deps = g.dependencies(&pair[0]).unwrap();
                    assert!(deps.contains(&pair[1]));
                }
            }
        }
    }
}
