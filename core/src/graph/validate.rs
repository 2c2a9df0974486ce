use std::collections::{HashMap, HashSet};

use crate::error::GraphError;

use super::model::Task;

/// Dependency view over a task list, used for structural validation.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    /// Dependency edges: task_id -> list of dependencies
    pub edges: HashMap<String, Vec<String>>,

    /// Declared order of task ids
    order: Vec<String>,
}

impl TaskGraph {
    /// Build the graph, rejecting empty and duplicate ids.
    pub fn from_tasks(tasks: &[Task]) -> Result<Self, GraphError> {
        let mut edges = HashMap::with_capacity(tasks.len());
        let mut order = Vec::with_capacity(tasks.len());

        for (idx, task) in tasks.iter().enumerate() {
            if task.id.trim().is_empty() {
                return Err(GraphError::EmptyTaskId(idx));
            }
            if edges.contains_key(&task.id) {
                return Err(GraphError::DuplicateTaskId(task.id.clone()));
            }
            edges.insert(task.id.clone(), task.depends_on.clone());
            order.push(task.id.clone());
        }

        Ok(Self { edges, order })
    }

    /// Every dependency must name another task in the same list, or an id
    /// in `satisfied` (already completed earlier in the run).
    pub fn validate_against(&self, satisfied: &HashSet<&str>) -> Result<(), GraphError> {
        for task_id in &self.order {
            let Some(dependencies) = self.edges.get(task_id) else {
                continue;
            };
            for dep in dependencies {
                if dep == task_id {
                    return Err(GraphError::SelfDependency(task_id.clone()));
                }
                if !self.edges.contains_key(dep) && !satisfied.contains(dep.as_str()) {
                    return Err(GraphError::DependencyNotFound {
                        task_id: task_id.clone(),
                        missing_dep: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Detect circular dependencies using DFS. Returns the cycle path.
    ///
    /// # Time Complexity
    ///
    /// O(V + E) where V = number of tasks, E = number of dependencies
    pub fn detect_cycle(&self) -> Option<String> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for task_id in &self.order {
            if !visited.contains(task_id) && self.dfs_cycle(task_id, &mut visited, &mut stack) {
                return Some(stack.join(" -> "));
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

        if let Some(dependencies) = self.edges.get(node) {
            for dep in dependencies {
                if let Some(pos) = stack.iter().position(|x| x == dep) {
                    stack.push(dep.clone());
                    *stack = stack[pos..].to_vec();
                    return true;
                }

                if self.edges.contains_key(dep)
                    && !visited.contains(dep)
                    && self.dfs_cycle(dep, visited, stack)
                {
                    return true;
                }
            }
        }

        stack.pop();
        false
    }
}

/// Structural check of a proposed task list.
///
/// Cycles are not rejected here; they are logged and surface at runtime as
/// a deadlock which the transition checker routes to replanning.
pub fn validate_tasks(tasks: &[Task], satisfied: &HashSet<&str>) -> Result<(), GraphError> {
    let graph = TaskGraph::from_tasks(tasks)?;
    graph.validate_against(satisfied)?;
    if let Some(cycle) = graph.detect_cycle() {
        tracing::warn!(target: "taskpilot.graph", cycle = %cycle, "task list contains a dependency cycle");
    }
    Ok(())
}
