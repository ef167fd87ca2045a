use super::{Marker, NodeKind, OutlineTree};
use crate::error::{TaskListError, TaskListResult};
use slotmap::SlotMap;
use std::collections::HashSet;

slotmap::new_key_type! {
    /// Handle into an [`ArenaTree`]. Keys of removed nodes never resolve again.
    pub struct NodeId;
}

#[derive(Clone, Debug)]
struct NodeData {
    kind: NodeKind,
    label: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    markers: HashSet<Marker>,
    draggable: bool,
    disabled: bool,
}

impl NodeData {
    fn new(kind: NodeKind, label: &str) -> Self {
        Self {
            kind,
            label: label.to_string(),
            parent: None,
            children: vec![],
            markers: HashSet::new(),
            draggable: false,
            disabled: false,
        }
    }
}

/// In-memory outline used headless and in tests.
///
/// Builder methods take the parent and append, so a fixture reads top-down like the
/// markup it stands for.
#[derive(Clone, Debug, Default)]
pub struct ArenaTree {
    nodes: SlotMap<NodeId, NodeData>,
}

impl ArenaTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// A detached grouping root.
    pub fn group(&mut self) -> NodeId {
        self.nodes.insert(NodeData::new(NodeKind::Group, ""))
    }

    /// A detached node outside any grouping root.
    pub fn fragment(&mut self) -> NodeId {
        self.nodes.insert(NodeData::new(NodeKind::Other, ""))
    }

    pub fn list(&mut self, parent: NodeId, ordered: bool) -> NodeId {
        self.append(parent, NodeData::new(NodeKind::List { ordered }, ""))
    }

    /// A list item without a checkbox.
    pub fn item(&mut self, parent: NodeId, label: &str) -> NodeId {
        self.append(parent, NodeData::new(NodeKind::Item, label))
    }

    /// A list item carrying a checkbox.
    pub fn task(&mut self, parent: NodeId, label: &str, checked: bool) -> NodeId {
        let item = self.item(parent, label);
        self.append(item, NodeData::new(NodeKind::Checkbox { checked }, ""));
        item
    }

    pub fn other(&mut self, parent: NodeId, label: &str) -> NodeId {
        self.append(parent, NodeData::new(NodeKind::Other, label))
    }

    fn append(&mut self, parent: NodeId, mut data: NodeData) -> NodeId {
        data.parent = Some(parent);
        let id = self.nodes.insert(data);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(id);
        }
        id
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn label(&self, node: NodeId) -> &str {
        self.nodes.get(node).map(|n| n.label.as_str()).unwrap_or("")
    }

    /// Labels of `list`'s direct items, in order.
    pub fn labels(&self, list: NodeId) -> Vec<&str> {
        self.nodes
            .get(list)
            .map(|n| n.children.iter().map(|c| self.label(*c)).collect())
            .unwrap_or_default()
    }

    pub fn set_checked(&mut self, checkbox: NodeId, checked: bool) {
        if let Some(n) = self.nodes.get_mut(checkbox) {
            if let NodeKind::Checkbox { .. } = n.kind {
                n.kind = NodeKind::Checkbox { checked };
            }
        }
    }

    pub fn is_checkbox_disabled(&self, checkbox: NodeId) -> bool {
        self.nodes.get(checkbox).is_some_and(|n| n.disabled)
    }

    /// Drops `node` and its whole subtree. Returns every removed key so callers can
    /// dispose their side-table entries.
    pub fn remove(&mut self, node: NodeId) -> Vec<NodeId> {
        if let Some(parent) = self.nodes.get(node).and_then(|n| n.parent) {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.retain(|c| *c != node);
            }
        }

        let mut removed = vec![];
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            if let Some(data) = self.nodes.remove(n) {
                stack.extend(data.children);
                removed.push(n);
            }
        }
        removed
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.nodes.get(n).and_then(|d| d.parent);
        }
        false
    }
}

impl OutlineTree for ArenaTree {
    type Node = NodeId;

    fn kind(&self, node: &NodeId) -> NodeKind {
        self.nodes
            .get(*node)
            .map(|n| n.kind)
            .unwrap_or(NodeKind::Other)
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes.get(*node).and_then(|n| n.parent)
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.nodes
            .get(*node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn insert_before(
        &mut self,
        parent: &NodeId,
        node: &NodeId,
        reference: Option<&NodeId>,
    ) -> TaskListResult<()> {
        let (parent, node) = (*parent, *node);
        if !self.contains(parent) || !self.contains(node) {
            return Err(TaskListError::StaleNode);
        }
        if self.is_ancestor_or_self(node, parent) {
            return Err(TaskListError::CyclicInsert);
        }
        if let Some(r) = reference {
            if *r == node {
                return Err(TaskListError::CyclicInsert);
            }
            if self.parent(r) != Some(parent) {
                return Err(TaskListError::ForeignReference);
            }
        }

        if let Some(old) = self.nodes[node].parent {
            if let Some(p) = self.nodes.get_mut(old) {
                p.children.retain(|c| *c != node);
            }
        }

        let kids = &mut self.nodes[parent].children;
        let at = reference
            .and_then(|r| kids.iter().position(|c| c == r))
            .unwrap_or(kids.len());
        kids.insert(at, node);
        self.nodes[node].parent = Some(parent);
        Ok(())
    }

    fn set_marker(&mut self, node: &NodeId, marker: Marker, on: bool) {
        if let Some(n) = self.nodes.get_mut(*node) {
            if on {
                n.markers.insert(marker);
            } else {
                n.markers.remove(&marker);
            }
        }
    }

    fn has_marker(&self, node: &NodeId, marker: Marker) -> bool {
        self.nodes
            .get(*node)
            .is_some_and(|n| n.markers.contains(&marker))
    }

    fn set_draggable(&mut self, node: &NodeId, draggable: bool) {
        if let Some(n) = self.nodes.get_mut(*node) {
            n.draggable = draggable;
        }
    }

    fn is_draggable(&self, node: &NodeId) -> bool {
        self.nodes.get(*node).is_some_and(|n| n.draggable)
    }

    fn attach_handle(&mut self, item: &NodeId) -> TaskListResult<NodeId> {
        if !self.contains(*item) {
            return Err(TaskListError::StaleNode);
        }
        let mut data = NodeData::new(NodeKind::Handle, "");
        data.parent = Some(*item);
        let handle = self.nodes.insert(data);
        self.nodes[*item].children.insert(0, handle);
        Ok(handle)
    }

    fn set_checkbox_disabled(&mut self, checkbox: &NodeId, disabled: bool) {
        if let Some(n) = self.nodes.get_mut(*checkbox) {
            n.disabled = disabled;
        }
    }
}
