//! Per-module task graph
//!
//! Profiles register tasks and `depends_on` edges; both operations are
//! idempotent so re-applying a profile never duplicates anything.

use crate::error::{BuildError, BuildResult};
use crate::graph::DependencyGraph;
use std::collections::BTreeMap;

/// Well-known task names
pub mod names {
    pub const COMPILE_JAVA: &str = "compileJava";
    pub const COMPILE_TEST_JAVA: &str = "compileTestJava";
    pub const JAR: &str = "jar";
    pub const JAVADOC: &str = "javadoc";
    pub const JAVADOC_JAR: &str = "javadocJar";
    pub const SOURCES_JAR: &str = "sourcesJar";
    pub const CHECKSTYLE_MAIN: &str = "checkstyleMain";
    pub const CHECKSTYLE_TEST: &str = "checkstyleTest";
    pub const TEST: &str = "test";
    pub const CHECK: &str = "check";
    pub const SHADOW_JAR: &str = "shadowJar";
    pub const VERIFY_PUBLICATION_POLICY: &str = "verifyPublicationPolicy";
    pub const VERIFY_BANNED_DEPENDENCIES: &str = "verifyBannedDependencies";
    pub const PUBLISH: &str = "publish";
}

/// Task graph owned by a single module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGraph {
    module: String,
    descriptions: BTreeMap<String, String>,
    graph: DependencyGraph,
}

impl TaskGraph {
    /// Create an empty task graph for a module
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            descriptions: BTreeMap::new(),
            graph: DependencyGraph::new(),
        }
    }

    /// Register a task; returns false if it was already registered
    pub fn register(&mut self, name: &str, description: &str) -> bool {
        if !self.graph.add_node(name) {
            return false;
        }
        self.descriptions
            .insert(name.to_string(), description.to_string());
        true
    }

    /// Make `task` depend on `dependency`; both must be registered
    pub fn depends_on(&mut self, task: &str, dependency: &str) -> BuildResult<bool> {
        for name in [task, dependency] {
            if !self.graph.contains(name) {
                return Err(BuildError::task_not_found(&self.module, name));
            }
        }
        Ok(self.graph.add_edge(task, dependency))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.graph.contains(name)
    }

    pub fn description(&self, name: &str) -> Option<&str> {
        self.descriptions.get(name).map(String::as_str)
    }

    /// Direct dependencies of a task, sorted
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.graph
            .dependencies(name)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Registered task names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.graph.names()
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Number of `depends_on` edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Tasks to run for `target`, dependencies first
    pub fn execution_order(&self, target: &str) -> BuildResult<Vec<String>> {
        if !self.graph.contains(target) {
            return Err(BuildError::task_not_found(&self.module, target));
        }
        self.graph.order_of(target)
    }
}

#[cfg(test)]
mod tests {
    use super::names::*;
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let mut tasks = TaskGraph::new("core");
        assert!(tasks.register(JAR, "Assembles the jar"));
        assert!(!tasks.register(JAR, "Assembles the jar again"));
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks.description(JAR), Some("Assembles the jar"));
    }

    #[test]
    fn test_depends_on_requires_registration() {
        let mut tasks = TaskGraph::new("core");
        tasks.register(CHECK, "");
        let err = tasks.depends_on(CHECK, CHECKSTYLE_MAIN).unwrap_err();
        assert!(matches!(err, BuildError::TaskNotFound { ref task, .. } if task == CHECKSTYLE_MAIN));
    }

    #[test]
    fn test_execution_order() {
        let mut tasks = TaskGraph::new("core");
        for name in [COMPILE_JAVA, JAR, SHADOW_JAR, CHECK, TEST] {
            tasks.register(name, "");
        }
        tasks.depends_on(JAR, COMPILE_JAVA).unwrap();
        tasks.depends_on(SHADOW_JAR, JAR).unwrap();
        tasks.depends_on(CHECK, TEST).unwrap();

        assert_eq!(
            tasks.execution_order(SHADOW_JAR).unwrap(),
            vec![COMPILE_JAVA, JAR, SHADOW_JAR]
        );
        assert!(tasks.execution_order("missing").is_err());
    }
}
