//! Dependency graph ordering using topological sort
//!
//! Shared by the module graph (project dependencies) and each module's task
//! graph. Orders are deterministic: ready nodes are taken in name order.
use crate::error::{BuildError, BuildResult};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Directed graph of named nodes; an edge `a -> b` means `a` depends on `b`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }

    /// Add a node; returns false if it already existed
    pub fn add_node(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.nodes.contains_key(&name) {
            return false;
        }
        self.nodes.insert(name, BTreeSet::new());
        true
    }

    /// Add an edge `from -> to`; returns false if it already existed
    ///
    /// `from` is created if missing; `to` is checked by [`validate`](Self::validate).
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        self.nodes
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string())
    }

    /// Check whether a node exists
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Direct dependencies of a node
    pub fn dependencies(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.nodes.get(name)
    }

    /// All node names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Number of edges in the graph
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(BTreeSet::len).sum()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Validate that every edge points at an existing node
    pub fn validate(&self) -> BuildResult<()> {
        for (name, deps) in &self.nodes {
            for dep in deps {
                if !self.nodes.contains_key(dep) {
                    return Err(BuildError::ModuleNotFound {
                        module: format!("{} (required by {})", dep, name),
                    });
                }
            }
        }
        Ok(())
    }

    /// Topological order of the whole graph, dependencies first
    pub fn topological_order(&self) -> BuildResult<Vec<String>> {
        let all: BTreeSet<&str> = self.nodes.keys().map(String::as_str).collect();
        self.order_of_set(&all)
    }

    /// Topological order of `target` and everything it transitively depends on
    pub fn order_of(&self, target: &str) -> BuildResult<Vec<String>> {
        if !self.nodes.contains_key(target) {
            return Err(BuildError::module_not_found(target));
        }

        let mut reachable = BTreeSet::new();
        let mut stack = vec![target];
        while let Some(name) = stack.pop() {
            if !reachable.insert(name) {
                continue;
            }
            if let Some(deps) = self.nodes.get(name) {
                stack.extend(deps.iter().map(String::as_str));
            }
        }

        self.order_of_set(&reachable)
    }

    /// Kahn's algorithm restricted to `subset`
    fn order_of_set(&self, subset: &BTreeSet<&str>) -> BuildResult<Vec<String>> {
        self.validate()?;

        // In-degree = number of unsatisfied dependencies of a node
        let mut in_degree: BTreeMap<&str, usize> = subset
            .iter()
            .map(|name| (*name, self.nodes.get(*name).map_or(0, BTreeSet::len)))
            .collect();

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut result = Vec::with_capacity(subset.len());

        while let Some(name) = ready.pop_first() {
            result.push(name.to_string());

            for dependent in subset {
                let depends = self
                    .nodes
                    .get(*dependent)
                    .is_some_and(|deps| deps.contains(name));
                if !depends {
                    continue;
                }
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if result.len() != subset.len() {
            return Err(BuildError::CircularDependency(self.find_cycle()));
        }

        Ok(result)
    }

    /// Find a cycle in the graph (for error reporting)
    fn find_cycle(&self) -> String {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for name in self.nodes.keys() {
            if let Some(cycle) = self.dfs_find_cycle(name, &mut visited, &mut rec_stack, &mut path)
            {
                return cycle;
            }
        }

        "unknown cycle".to_string()
    }

    fn dfs_find_cycle(
        &self,
        name: &str,
        visited: &mut HashSet<String>,
        rec_stack: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<String> {
        if rec_stack.contains(name) {
            path.push(name.to_string());
            let start = path.iter().position(|n| n == name).unwrap_or(0);
            return Some(path[start..].join(" -> "));
        }

        if !visited.insert(name.to_string()) {
            return None;
        }

        rec_stack.insert(name.to_string());
        path.push(name.to_string());

        if let Some(deps) = self.nodes.get(name) {
            for dep in deps {
                if let Some(cycle) = self.dfs_find_cycle(dep, visited, rec_stack, path) {
                    return Some(cycle);
                }
            }
        }

        rec_stack.remove(name);
        path.pop();
        None
    }
}
