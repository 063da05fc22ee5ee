//! In-memory graph snapshot and derived metrics.
//!
//! Metrics are computed on demand from current graph state and never
//! persisted. Depth uses an explicit worklist with a memo map so shared
//! ancestors (diamond shapes) are computed once per call instead of once
//! per path.

use crate::types::TaskStatus;
use std::collections::HashMap;

/// A point-in-time view of the task DAG: statuses plus the edge set in
/// both directions.
#[derive(Debug, Default)]
pub struct GraphSnapshot {
    statuses: HashMap<String, TaskStatus>,
    parents: HashMap<String, Vec<String>>,
    children: HashMap<String, Vec<String>>,
}

impl GraphSnapshot {
    /// Build a snapshot from task statuses and parent→child edges.
    /// Edges referencing unknown tasks are ignored.
    pub fn new(
        statuses: impl IntoIterator<Item = (String, TaskStatus)>,
        edges: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let statuses: HashMap<String, TaskStatus> = statuses.into_iter().collect();
        let mut parents: HashMap<String, Vec<String>> = HashMap::new();
        let mut children: HashMap<String, Vec<String>> = HashMap::new();

        for (parent_id, child_id) in edges {
            if !statuses.contains_key(&parent_id) || !statuses.contains_key(&child_id) {
                continue;
            }
            children
                .entry(parent_id.clone())
                .or_default()
                .push(child_id.clone());
            parents.entry(child_id).or_default().push(parent_id);
        }

        Self {
            statuses,
            parents,
            children,
        }
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.statuses.contains_key(task_id)
    }

    pub fn parent_ids(&self, task_id: &str) -> &[String] {
        self.parents.get(task_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn child_ids(&self, task_id: &str) -> &[String] {
        self.children
            .get(task_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Hierarchy depth: 0 for a task with no parents, otherwise
    /// `1 + max(depth(parent))`. Well-defined because the cycle guard
    /// keeps the graph acyclic.
    pub fn depth(&self, task_id: &str) -> u32 {
        let mut memo = HashMap::new();
        self.depth_memo(task_id, &mut memo)
    }

    /// Depth with a caller-provided memo map, so repeated queries over
    /// one snapshot share work instead of re-walking shared ancestors.
    pub fn depth_memo(&self, task_id: &str, memo: &mut HashMap<String, u32>) -> u32 {
        let mut stack: Vec<String> = vec![task_id.to_string()];

        while let Some(current) = stack.last() {
            if memo.contains_key(current.as_str()) {
                stack.pop();
                continue;
            }

            let parents = self.parent_ids(current);
            let unresolved: Vec<String> = parents
                .iter()
                .filter(|p| !memo.contains_key(p.as_str()))
                .cloned()
                .collect();

            if unresolved.is_empty() {
                let depth = parents
                    .iter()
                    .map(|p| memo[p.as_str()] + 1)
                    .max()
                    .unwrap_or(0);
                memo.insert(current.clone(), depth);
                stack.pop();
            } else {
                stack.extend(unresolved);
            }
        }

        memo.get(task_id).copied().unwrap_or(0)
    }

    /// Completion percentage. A leaf is 100 iff integrated; otherwise
    /// `floor(100 * integrated_children / children)` over direct children
    /// only (grandchildren never count).
    pub fn progress(&self, task_id: &str) -> u8 {
        let children = self.child_ids(task_id);
        if children.is_empty() {
            return match self.statuses.get(task_id) {
                Some(TaskStatus::Integrated) => 100,
                _ => 0,
            };
        }

        let total = children.len() as u64;
        let completed = children
            .iter()
            .filter(|c| self.statuses.get(c.as_str()) == Some(&TaskStatus::Integrated))
            .count() as u64;

        (completed * 100 / total) as u8
    }

    /// Importance heuristic combining hierarchy depth and fan-out.
    /// The formula is fixed for compatibility with existing consumers.
    pub fn importance_weight(&self, task_id: &str) -> u32 {
        self.depth(task_id) * 10 + self.child_ids(task_id).len() as u32 * 2
    }
}
