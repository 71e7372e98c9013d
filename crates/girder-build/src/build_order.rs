//! Build order computation over the resolved module graph
//!
//! Order edges are the public and private dependency lists; confessed
//! back-edges are skipped so accepted cycles do not break the sort.
//! Ties are broken by module name, making the order reproducible across
//! runs regardless of hash iteration order.

use crate::error::{BuildError, BuildResult};
use crate::graph::{ModuleGraph, ModuleId};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Computes compilation order and parallel groups for a resolved graph.
pub struct BuildOrder<'a> {
    graph: &'a ModuleGraph,
}

impl<'a> BuildOrder<'a> {
    pub fn new(graph: &'a ModuleGraph) -> Self {
        Self { graph }
    }

    /// Build-order dependencies of one module: public and private
    /// dependencies, minus confessed back-edges.
    fn build_dependencies(&self, id: ModuleId) -> Vec<ModuleId> {
        let module = &self.graph[id];
        let mut dependencies = Vec::new();
        for &dependency in module
            .public_dependencies()
            .iter()
            .chain(module.private_dependencies())
        {
            if module
                .descriptor()
                .confesses_cycle_on(self.graph[dependency].name())
            {
                continue;
            }
            if !dependencies.contains(&dependency) {
                dependencies.push(dependency);
            }
        }
        dependencies
    }

    /// Compute a sequential build order: every module appears after all
    /// of its build-order dependencies.
    pub fn compute_build_order(&self) -> BuildResult<Vec<ModuleId>> {
        if self.graph.is_empty() {
            return Ok(Vec::new());
        }

        let mut in_degree: HashMap<ModuleId, usize> = HashMap::new();
        let mut dependents: HashMap<ModuleId, Vec<ModuleId>> = HashMap::new();
        for id in self.graph.module_ids() {
            let dependencies = self.build_dependencies(id);
            in_degree.insert(id, dependencies.len());
            for dependency in dependencies {
                dependents.entry(dependency).or_default().push(id);
            }
        }

        // Min-heap keyed by name for deterministic tie-breaking.
        let mut ready: BinaryHeap<Reverse<(String, ModuleId)>> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&id, _)| Reverse((self.graph[id].name().to_string(), id)))
            .collect();

        let mut order = Vec::new();
        while let Some(Reverse((_, id))) = ready.pop() {
            order.push(id);
            if let Some(dependent_ids) = dependents.get(&id) {
                for &dependent in dependent_ids {
                    if let Some(degree) = in_degree.get_mut(&dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.push(Reverse((
                                self.graph[dependent].name().to_string(),
                                dependent,
                            )));
                        }
                    }
                }
            }
        }

        if order.len() != self.graph.len() {
            return Err(self.cycle_error());
        }
        Ok(order)
    }

    /// Group modules into waves that can compile concurrently: each group
    /// only depends on modules in earlier groups.
    pub fn parallel_groups(&self) -> BuildResult<Vec<Vec<ModuleId>>> {
        if self.graph.is_empty() {
            return Ok(Vec::new());
        }

        let mut groups = Vec::new();
        let mut built: HashSet<ModuleId> = HashSet::new();

        loop {
            let mut group: Vec<ModuleId> = self
                .graph
                .module_ids()
                .filter(|id| !built.contains(id))
                .filter(|&id| {
                    self.build_dependencies(id)
                        .iter()
                        .all(|dependency| built.contains(dependency))
                })
                .collect();

            if group.is_empty() {
                break;
            }

            group.sort_by(|&a, &b| self.graph[a].name().cmp(self.graph[b].name()));
            built.extend(group.iter().copied());
            groups.push(group);
        }

        if built.len() != self.graph.len() {
            return Err(self.cycle_error());
        }
        Ok(groups)
    }

    fn cycle_error(&self) -> BuildError {
        let cycle = self.find_cycle();
        let module = cycle.split(" -> ").next().unwrap_or("").to_string();
        BuildError::CircularDependency {
            module,
            route: "build order".to_string(),
            cycle,
        }
    }

    /// Extract one cycle for error reporting.
    fn find_cycle(&self) -> String {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        let mut path = Vec::new();

        for id in self.graph.module_ids() {
            if let Some(cycle) = self.dfs_find_cycle(id, &mut visited, &mut on_stack, &mut path) {
                return cycle;
            }
        }
        "unknown cycle".to_string()
    }

    fn dfs_find_cycle(
        &self,
        id: ModuleId,
        visited: &mut HashSet<ModuleId>,
        on_stack: &mut HashSet<ModuleId>,
        path: &mut Vec<ModuleId>,
    ) -> Option<String> {
        if on_stack.contains(&id) {
            path.push(id);
            let start = path.iter().position(|&m| m == id).unwrap_or(0);
            return Some(
                path[start..]
                    .iter()
                    .map(|&m| self.graph[m].name())
                    .collect::<Vec<_>>()
                    .join(" -> "),
            );
        }
        if visited.contains(&id) {
            return None;
        }

        visited.insert(id);
        on_stack.insert(id);
        path.push(id);

        for dependency in self.build_dependencies(id) {
            if let Some(cycle) = self.dfs_find_cycle(dependency, visited, on_stack, path) {
                return Some(cycle);
            }
        }

        on_stack.remove(&id);
        path.pop();
        None
    }
}
