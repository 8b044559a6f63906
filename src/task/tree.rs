use super::{RawTask, Task, TaskError, TaskType};
use serde_json::Map;

/// Index of a node inside a [`TaskList`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskNode {
    Leaf(Task),
    Group {
        action: String,
        children: Vec<NodeId>,
    },
}

/// Ordered task forest. Groups address their children by arena index, so the
/// structure has no owning cycles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskList {
    nodes: Vec<TaskNode>,
    roots: Vec<NodeId>,
}

impl TaskList {
    pub fn from_leaves(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut list = Self::default();
        for task in tasks {
            let id = list.push(TaskNode::Leaf(task));
            list.roots.push(id);
        }
        list
    }

    pub fn from_raw(raw: Vec<RawTask>) -> Result<Self, TaskError> {
        let mut list = Self::default();
        for task in raw {
            let id = list.insert_raw(task)?;
            list.roots.push(id);
        }
        Ok(list)
    }

    fn push(&mut self, node: TaskNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn insert_raw(&mut self, raw: RawTask) -> Result<NodeId, TaskError> {
        let is_group = match raw.task_type {
            Some(TaskType::Group) => true,
            None if !raw.subtasks.is_empty() => true,
            Some(task_type) if !raw.subtasks.is_empty() => {
                return Err(TaskError::LeafWithSubtasks {
                    action: raw.action,
                    task_type,
                })
            }
            _ => false,
        };

        if !is_group {
            let task_type = raw.task_type.ok_or_else(|| TaskError::MissingType {
                action: raw.action.clone(),
            })?;
            return Ok(self.push(TaskNode::Leaf(Task {
                action: raw.action,
                task_type,
                params: raw.params,
                config: raw.config,
            })));
        }

        let mut children = Vec::with_capacity(raw.subtasks.len());
        for child in raw.subtasks {
            children.push(self.insert_raw(child)?);
        }
        Ok(self.push(TaskNode::Group {
            action: raw.action,
            children,
        }))
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &TaskNode {
        &self.nodes[id.0]
    }

    /// Leaves in depth-first document order.
    pub fn leaves(&self) -> Vec<&Task> {
        let mut leaves = Vec::new();
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            match &self.nodes[id.0] {
                TaskNode::Leaf(task) => leaves.push(task),
                TaskNode::Group { children, .. } => {
                    stack.extend(children.iter().rev().copied());
                }
            }
        }
        leaves
    }

    pub fn to_leaves(&self) -> Vec<Task> {
        self.leaves().into_iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves().is_empty()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    pub fn any_leaf(&self, predicate: impl Fn(&Task) -> bool) -> bool {
        self.leaves().into_iter().any(predicate)
    }

    /// Keeps the leaves matching `keep`; groups left without leaves are dropped.
    pub fn retain_leaves(&self, keep: impl Fn(&Task) -> bool) -> Self {
        let mut filtered = Self::default();
        for root in &self.roots {
            if let Some(id) = self.copy_filtered(*root, &keep, &mut filtered) {
                filtered.roots.push(id);
            }
        }
        filtered
    }

    fn copy_filtered(
        &self,
        id: NodeId,
        keep: &impl Fn(&Task) -> bool,
        target: &mut TaskList,
    ) -> Option<NodeId> {
        match &self.nodes[id.0] {
            TaskNode::Leaf(task) => keep(task).then(|| target.push(TaskNode::Leaf(task.clone()))),
            TaskNode::Group { action, children } => {
                let kept: Vec<NodeId> = children
                    .iter()
                    .filter_map(|child| self.copy_filtered(*child, keep, target))
                    .collect();
                if kept.is_empty() {
                    return None;
                }
                Some(target.push(TaskNode::Group {
                    action: action.clone(),
                    children: kept,
                }))
            }
        }
    }

    pub fn to_raw(&self) -> Vec<RawTask> {
        self.roots.iter().map(|id| self.raw_node(*id)).collect()
    }

    fn raw_node(&self, id: NodeId) -> RawTask {
        match &self.nodes[id.0] {
            TaskNode::Leaf(task) => RawTask {
                action: task.action.clone(),
                task_type: Some(task.task_type),
                params: task.params.clone(),
                config: task.config.clone(),
                subtasks: Vec::new(),
            },
            TaskNode::Group { action, children } => RawTask {
                action: action.clone(),
                task_type: Some(TaskType::Group),
                params: Map::new(),
                config: Vec::new(),
                subtasks: children.iter().map(|child| self.raw_node(*child)).collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> Vec<RawTask> {
        serde_json::from_value(value).expect("raw tasks")
    }

    #[test]
    fn leaves_follow_document_order_through_groups() {
        let list = TaskList::from_raw(raw(json!([
            {"action": "first", "type": "execute"},
            {"action": "bundle", "type": "group", "subtasks": [
                {"action": "second", "type": "execute"},
                {"action": "inner", "type": "group", "subtasks": [
                    {"action": "third", "type": "execute"}
                ]}
            ]},
            {"action": "fourth", "type": "answer"}
        ])))
        .expect("task list");

        let actions: Vec<&str> = list.leaves().iter().map(|t| t.action.as_str()).collect();
        assert_eq!(actions, vec!["first", "second", "third", "fourth"]);
        assert_eq!(list.roots().len(), 3);
    }

    #[test]
    fn leaf_without_type_is_rejected() {
        let err = TaskList::from_raw(raw(json!([{"action": "mystery"}]))).expect_err("no type");
        assert_eq!(
            err,
            TaskError::MissingType {
                action: "mystery".to_string()
            }
        );
    }

    #[test]
    fn typed_leaf_with_subtasks_is_rejected() {
        let err = TaskList::from_raw(raw(json!([
            {"action": "odd", "type": "execute", "subtasks": [{"action": "x", "type": "execute"}]}
        ])))
        .expect_err("leaf with children");
        assert!(matches!(err, TaskError::LeafWithSubtasks { .. }));
    }

    #[test]
    fn retain_drops_emptied_groups() {
        let list = TaskList::from_raw(raw(json!([
            {"action": "noise", "type": "group", "subtasks": [
                {"action": "skip me", "type": "ignore"}
            ]},
            {"action": "keep", "type": "execute"}
        ])))
        .expect("task list");

        let filtered = list.retain_leaves(|task| !task.task_type.is_filtered());
        assert_eq!(filtered.roots().len(), 1);
        assert_eq!(filtered.leaf_count(), 1);
        assert_eq!(filtered.to_raw()[0].action, "keep");
    }
}
