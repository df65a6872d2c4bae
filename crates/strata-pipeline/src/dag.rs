//! Task DAG building and topological ordering.

use crate::error::{PipelineError, PipelineResult};
use crate::task::{Task, TASKS};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};

/// A directed acyclic graph of task dependencies.
#[derive(Debug)]
pub struct TaskDag {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl TaskDag {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Build the DAG for the shipped task registry.
    pub fn for_registry() -> PipelineResult<Self> {
        Self::build(TASKS)
    }

    pub fn build(tasks: &[Task]) -> PipelineResult<Self> {
        let mut dag = Self::new();
        for task in tasks {
            dag.add_task(task.name);
        }
        for task in tasks {
            for dep in task.depends_on {
                if !dag.node_map.contains_key(*dep) {
                    return Err(PipelineError::UnknownTask {
                        name: (*dep).to_string(),
                    });
                }
                dag.add_dependency(task.name, dep);
            }
        }
        dag.validate()?;
        Ok(dag)
    }

    pub fn add_task(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(name) {
            idx
        } else {
            let idx = self.graph.add_node(name.to_string());
            self.node_map.insert(name.to_string(), idx);
            idx
        }
    }

    /// Add a dependency edge (`from` depends on `to`).
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from_idx = self.add_task(from);
        let to_idx = self.add_task(to);
        // Edge goes dependency -> dependent so topological sort yields
        // dependencies first.
        self.graph.add_edge(to_idx, from_idx, ());
    }

    /// Validate the DAG has no cycles.
    pub fn validate(&self) -> PipelineResult<()> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(PipelineError::CircularDependency {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Find a cycle path starting from a node for error reporting.
    fn find_cycle_path(&self, start: NodeIndex) -> String {
        let mut path: Vec<String> = vec![self.graph[start].clone()];
        let mut current = start;
        let mut visited = HashSet::new();
        visited.insert(current);

        while let Some(edge) = self.graph.edges(current).next() {
            let target = edge.target();
            path.push(self.graph[target].clone());
            if target == start || visited.contains(&target) {
                break;
            }
            visited.insert(target);
            current = target;
        }

        path.join(" -> ")
    }

    /// Tasks in execution order (dependencies first).
    pub fn topological_order(&self) -> PipelineResult<Vec<String>> {
        match toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .into_iter()
                .map(|idx| self.graph[idx].clone())
                .collect()),
            Err(cycle) => Err(PipelineError::CircularDependency {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Direct dependencies of a task.
    pub fn dependencies(&self, task: &str) -> Vec<String> {
        if let Some(&idx) = self.node_map.get(task) {
            self.graph
                .edges_directed(idx, petgraph::Direction::Incoming)
                .map(|e| self.graph[e.source()].clone())
                .collect()
        } else {
            Vec::new()
        }
    }

    pub fn contains(&self, task: &str) -> bool {
        self.node_map.contains_key(task)
    }
}

impl Default for TaskDag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
