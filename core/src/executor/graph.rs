use std::collections::{HashMap, HashSet};

use crate::error::ExecutorError;
use crate::executor::types::TaskLike;

/// Task dependency graph (DAG)
#[derive(Debug, Clone)]
pub struct TaskGraph<T: TaskLike> {
    /// Task nodes: task_id -> Task
    nodes: HashMap<String, T>,

    /// Dependency edges: task_id -> list of dependencies
    edges: HashMap<String, Vec<String>>,

    /// Reverse edges: task_id -> list of tasks that depend on it
    reverse_edges: HashMap<String, Vec<String>>,

    /// Original insertion order (for stable sorting)
    insertion_order: Vec<String>,
}

impl<T: TaskLike> TaskGraph<T> {
    /// Construct task graph from task list. Repeated dependency entries collapse to one edge.
    ///
    /// Unknown dependencies and cycles are rejected here, so every built graph is a DAG.
    pub fn from_tasks(tasks: &[T]) -> Result<Self, ExecutorError> {
        let mut nodes = HashMap::new();
        let mut edges = HashMap::new();
        let mut reverse_edges: HashMap<String, Vec<String>> = HashMap::new();
        let mut insertion_order = Vec::new();

        for task in tasks {
            if nodes.contains_key(task.id()) {
                return Err(ExecutorError::DuplicateTaskId(task.id().to_string()));
            }

            let task_id = task.id().to_string();
            let mut dependencies: Vec<String> = Vec::new();
            for dep in task.dependencies() {
                if !dependencies.contains(dep) {
                    dependencies.push(dep.clone());
                }
            }

            for dep in &dependencies {
                reverse_edges
                    .entry(dep.clone())
                    .or_default()
                    .push(task_id.clone());
            }

            nodes.insert(task_id.clone(), task.clone());
            edges.insert(task_id.clone(), dependencies);
            insertion_order.push(task_id);
        }

        let graph = Self {
            nodes,
            edges,
            reverse_edges,
            insertion_order,
        };
        graph.validate()?;
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct dependencies of a task, in declaration order.
    pub fn dependencies_of(&self, task_id: &str) -> &[String] {
        self.edges.get(task_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Validate dependency relationships
    fn validate(&self) -> Result<(), ExecutorError> {
        for task_id in &self.insertion_order {
            for dep in self.dependencies_of(task_id) {
                if !self.nodes.contains_key(dep) {
                    return Err(ExecutorError::DependencyNotFound {
                        task_id: task_id.clone(),
                        missing_dep: dep.clone(),
                    });
                }
            }
        }

        if let Some(cycle) = self.detect_cycle() {
            return Err(ExecutorError::CircularDependency(cycle));
        }

        Ok(())
    }

    /// Level the graph into waves.
    pub fn waves(&self) -> Result<Vec<Vec<String>>, ExecutorError> {
        self.topological_sort()
    }

    /// Topological sort using Kahn's algorithm
    ///
    /// Returns waves where tasks in the same wave can run in parallel. Every
    /// task lands in the wave right after its deepest dependency; within a
    /// wave tasks keep their input order.
    ///
    /// # Time Complexity
    ///
    /// O(V + E) plus a sort per wave.
    fn topological_sort(&self) -> Result<Vec<Vec<String>>, ExecutorError> {
        let position: HashMap<&str, usize> = self
            .insertion_order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        // edges[A] = [B, C] means A depends on B and C, so A's in-degree = 2
        let mut in_degree: HashMap<&str, usize> = self
            .edges
            .iter()
            .map(|(id, deps)| (id.as_str(), deps.len()))
            .collect();

        let mut waves: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = self
            .insertion_order
            .iter()
            .filter(|id| in_degree.get(id.as_str()).copied() == Some(0))
            .cloned()
            .collect();

        let mut processed = 0;

        while !current.is_empty() {
            processed += current.len();

            let mut next = Vec::new();
            for task_id in &current {
                let Some(dependents) = self.reverse_edges.get(task_id) else {
                    continue;
                };
                for dependent in dependents {
                    if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            next.push(dependent.clone());
                        }
                    }
                }
            }

            next.sort_by_key(|id| position.get(id.as_str()).copied().unwrap_or(usize::MAX));

            waves.push(std::mem::replace(&mut current, next));
        }

        if processed != self.nodes.len() {
            let cycle = self
                .detect_cycle()
                .unwrap_or_else(|| "unable to complete topological sort".to_string());
            return Err(ExecutorError::CircularDependency(cycle));
        }

        Ok(waves)
    }

    /// Detect circular dependencies using DFS
    ///
    /// # Time Complexity
    ///
    /// O(V + E) where V = number of tasks, E = number of dependencies
    fn detect_cycle(&self) -> Option<String> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for task_id in &self.insertion_order {
            if !visited.contains(task_id) && self.dfs_cycle(task_id, &mut visited, &mut stack) {
                return Some(format_cycle_path(&stack));
            }
        }

        None
    }

    fn dfs_cycle(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        stack: &mut Vec<String>,
    ) -> bool {
        visited.insert(node.to_string());
        stack.push(node.to_string());

        for dep in self.dependencies_of(node) {
            // Dependency already on the current path closes a cycle
            if let Some(pos) = stack.iter().position(|x| x == dep) {
                stack.push(dep.clone());
                *stack = stack[pos..].to_vec();
                return true;
            }

            if !visited.contains(dep)
                && self.nodes.contains_key(dep)
                && self.dfs_cycle(dep, visited, stack)
            {
                return true;
            }
        }

        stack.pop();
        false
    }
}

fn format_cycle_path(stack: &[String]) -> String {
    stack.join(" -> ")
}
