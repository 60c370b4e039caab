//! Dependency graph construction and topological sorting.
//!
//! Nodes are registered seeds, addressed by their registration index. An edge
//! u→v means u must execute before v. The sorter is Kahn's algorithm with a
//! FIFO queue seeded in registration order, so seeds that become eligible at
//! the same time always keep their registration order. This makes the output
//! fully deterministic for a fixed registration sequence.

use std::collections::{HashMap, VecDeque};

use crate::seed::SeedKey;

pub(crate) struct DependencyGraph {
    /// Seeds waiting on each node, i.e. adjacency by dependent.
    dependents: Vec<Vec<usize>>,
    /// Unsatisfied prerequisite count per node.
    in_degree: Vec<usize>,
}

impl DependencyGraph {
    /// Build the graph from `(identity, normalized dependencies)` pairs in
    /// registration order. A dependency naming an unregistered seed is
    /// skipped without error.
    pub(crate) fn build(nodes: &[(SeedKey, &[SeedKey])]) -> Self {
        let index: HashMap<SeedKey, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (*key, i))
            .collect();

        let mut dependents = vec![Vec::new(); nodes.len()];
        let mut in_degree = vec![0; nodes.len()];

        for (i, (key, dependencies)) in nodes.iter().enumerate() {
            for dependency in *dependencies {
                match index.get(dependency) {
                    Some(&dep) => {
                        dependents[dep].push(i);
                        in_degree[i] += 1;
                    }
                    None => tracing::debug!(
                        "seed '{}' depends on unregistered seed '{}', ignoring",
                        key,
                        dependency
                    ),
                }
            }
        }

        Self {
            dependents,
            in_degree,
        }
    }

    /// Node count.
    pub(crate) fn len(&self) -> usize {
        self.in_degree.len()
    }

    /// Produce the execution order. A result shorter than [`len`](Self::len)
    /// means the missing nodes are stuck in at least one cycle.
    pub(crate) fn sort(&self) -> Vec<usize> {
        let mut in_degree = self.in_degree.clone();
        let mut order = Vec::with_capacity(in_degree.len());

        let mut queue: VecDeque<usize> = (0..in_degree.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();

        while let Some(i) = queue.pop_front() {
            order.push(i);

            for &dependent in &self.dependents[i] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        order
    }
}
