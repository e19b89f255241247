// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, StepConfig};
use crate::engine::TaskName;
use crate::errors::ConfigError;

/// A named unit of work: prerequisites, step sequence, watch triggers.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDef {
    pub name: TaskName,
    /// Direct prerequisites: tasks that must succeed before this one runs.
    pub after: Vec<TaskName>,
    /// Glob patterns whose changes re-run this task (and its dependents).
    pub watch: Vec<String>,
    /// Ordered step sequence executed when this task runs.
    pub steps: Vec<StepConfig>,
}

/// Dependency graph over task definitions, keyed by task name.
///
/// The graph exclusively owns the definitions for the lifetime of the
/// process; registration order is preserved and used as the tie-break when
/// scheduling independent ready tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    order: Vec<TaskName>,
    nodes: HashMap<TaskName, TaskDef>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a configuration file, registering tasks in the
    /// config's (deterministic) iteration order.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self, ConfigError> {
        let mut graph = Self::new();
        for (name, tc) in cfg.task.iter() {
            graph.register(TaskDef {
                name: name.clone(),
                after: tc.after.clone(),
                watch: tc.watch.clone(),
                steps: tc.steps.clone(),
            })?;
        }
        Ok(graph)
    }

    /// Add a task definition.
    ///
    /// Re-registering an identical definition is a no-op; a differing
    /// definition under an existing name is rejected, since the graph may
    /// already be driving a run.
    pub fn register(&mut self, def: TaskDef) -> Result<(), ConfigError> {
        if let Some(existing) = self.nodes.get(&def.name) {
            if *existing == def {
                return Ok(());
            }
            return Err(ConfigError::DuplicateTask {
                task: def.name.clone(),
            });
        }
        self.order.push(def.name.clone());
        self.nodes.insert(def.name.clone(), def);
        Ok(())
    }

    /// Topological check: every prerequisite exists, no task depends on
    /// itself, and the prerequisite relation is acyclic. The cycle error
    /// names every task on the offending cycle.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for def in self.defs() {
            for dep in &def.after {
                if dep == &def.name {
                    return Err(ConfigError::Cycle {
                        cycle: vec![def.name.clone()],
                    });
                }
                if !self.nodes.contains_key(dep) {
                    return Err(ConfigError::UnknownDependency {
                        task: def.name.clone(),
                        missing: dep.clone(),
                    });
                }
            }
        }

        // Edge direction: prerequisite -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in &self.order {
            graph.add_node(name.as_str());
        }
        for def in self.defs() {
            for dep in &def.after {
                graph.add_edge(dep.as_str(), def.name.as_str(), ());
            }
        }

        // tarjan_scc reports each strongly connected component; any component
        // with more than one node is a dependency cycle.
        for component in tarjan_scc(&graph) {
            if component.len() > 1 {
                let mut cycle: Vec<String> =
                    component.iter().map(|n| n.to_string()).collect();
                cycle.sort();
                return Err(ConfigError::Cycle { cycle });
            }
        }

        Ok(())
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Task names in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TaskDef> {
        self.nodes.get(name)
    }

    /// Task definitions in registration order.
    pub fn defs(&self) -> impl Iterator<Item = &TaskDef> {
        self.order.iter().filter_map(|n| self.nodes.get(n))
    }

    /// Immediate prerequisites of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|d| d.after.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task, in registration order.
    pub fn dependents_of(&self, name: &str) -> Vec<TaskName> {
        self.defs()
            .filter(|d| d.after.iter().any(|dep| dep == name))
            .map(|d| d.name.clone())
            .collect()
    }

    /// The given tasks plus their transitive prerequisites.
    pub fn prerequisite_closure(&self, roots: &[TaskName]) -> Vec<TaskName> {
        self.closure(roots, |name| self.dependencies_of(name).to_vec())
    }

    /// The given task plus its transitive dependents.
    pub fn dependent_closure(&self, root: &str) -> Vec<TaskName> {
        self.closure(&[root.to_string()], |name| self.dependents_of(name))
    }

    /// Generic reachability walk; results come back in registration order.
    fn closure<F>(&self, roots: &[TaskName], neighbours: F) -> Vec<TaskName>
    where
        F: Fn(&str) -> Vec<TaskName>,
    {
        let mut member: HashMap<&str, ()> = HashMap::new();
        let mut stack: Vec<TaskName> = roots.to_vec();

        while let Some(name) = stack.pop() {
            let Some(def) = self.nodes.get(&name) else {
                continue;
            };
            if member.insert(def.name.as_str(), ()).is_none() {
                stack.extend(neighbours(&def.name));
            }
        }

        self.order
            .iter()
            .filter(|n| member.contains_key(n.as_str()))
            .cloned()
            .collect()
    }
}
