pub mod arena;

use crate::error::TaskListResult;
use std::fmt::Debug;
use std::hash::Hash;

pub use arena::{ArenaTree, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// The `<task-lists>` boundary. List indices and drags never cross it.
    Group,
    List { ordered: bool },
    Item,
    Checkbox { checked: bool },
    /// Drag affordance prepended to draggable items.
    Handle,
    Other,
}

/// Visual state toggled on items. Rendering them is up to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Marker {
    /// The item a drag started from.
    Ghost,
    /// The dragged item once it has been spliced somewhere as an open slot.
    OpenSlot,
    Hovered,
    Enabled,
}

impl Marker {
    pub fn class_name(self) -> &'static str {
        match self {
            Marker::Ghost => "is-ghost",
            Marker::OpenSlot => "is-dragging",
            Marker::Hovered => "hovered",
            Marker::Enabled => "enabled",
        }
    }
}

/// The tree surface the reorder engine and the position model operate on.
///
/// Node handles compare by identity. Implementations only expose element structure;
/// every derived query (closest list, root task list, document order) lives in this
/// module so the browser tree and the in-memory tree answer them identically.
pub trait OutlineTree {
    type Node: Clone + Eq + Hash + Debug;

    fn kind(&self, node: &Self::Node) -> NodeKind;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Moves `node` under `parent`, right before `reference` (or last when `None`).
    fn insert_before(
        &mut self,
        parent: &Self::Node,
        node: &Self::Node,
        reference: Option<&Self::Node>,
    ) -> TaskListResult<()>;

    fn set_marker(&mut self, node: &Self::Node, marker: Marker, on: bool);

    fn has_marker(&self, node: &Self::Node, marker: Marker) -> bool;

    fn set_draggable(&mut self, node: &Self::Node, draggable: bool);

    fn is_draggable(&self, node: &Self::Node) -> bool;

    /// Prepends a drag handle to `item` and returns it.
    fn attach_handle(&mut self, item: &Self::Node) -> TaskListResult<Self::Node>;

    fn set_checkbox_disabled(&mut self, checkbox: &Self::Node, disabled: bool);
}

pub fn is_list<T: OutlineTree>(tree: &T, node: &T::Node) -> bool {
    matches!(tree.kind(node), NodeKind::List { .. })
}

pub fn is_item<T: OutlineTree>(tree: &T, node: &T::Node) -> bool {
    tree.kind(node) == NodeKind::Item
}

/// Inclusive ancestor search, like `Element.closest`.
pub fn closest<T: OutlineTree>(
    tree: &T,
    node: &T::Node,
    pred: impl Fn(&T::Node) -> bool,
) -> Option<T::Node> {
    let mut cur = Some(node.clone());
    while let Some(n) = cur {
        if pred(&n) {
            return Some(n);
        }
        cur = tree.parent(&n);
    }
    None
}

pub fn grouping_root<T: OutlineTree>(tree: &T, node: &T::Node) -> Option<T::Node> {
    closest(tree, node, |n| tree.kind(n) == NodeKind::Group)
}

/// Whether `node` is a grouping root (a container of lists).
pub fn is_root_container<T: OutlineTree>(tree: &T, node: &T::Node) -> bool {
    tree.kind(node) == NodeKind::Group
}

pub fn in_same_group<T: OutlineTree>(tree: &T, a: &T::Node, b: &T::Node) -> bool {
    match (grouping_root(tree, a), grouping_root(tree, b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

pub fn closest_item<T: OutlineTree>(tree: &T, node: &T::Node) -> Option<T::Node> {
    closest(tree, node, |n| is_item(tree, n))
}

/// The checkbox owned by `item`, searched without descending into nested lists.
pub fn checkbox_of<T: OutlineTree>(tree: &T, item: &T::Node) -> Option<T::Node> {
    let mut stack = tree.children(item);
    stack.reverse();
    while let Some(n) = stack.pop() {
        match tree.kind(&n) {
            NodeKind::Checkbox { .. } => return Some(n),
            NodeKind::List { .. } => {}
            _ => {
                let mut kids = tree.children(&n);
                kids.reverse();
                stack.extend(kids);
            }
        }
    }
    None
}

pub fn has_checkbox<T: OutlineTree>(tree: &T, item: &T::Node) -> bool {
    checkbox_of(tree, item).is_some()
}

/// A list carrying at least one checkbox item.
pub fn is_task_list<T: OutlineTree>(tree: &T, node: &T::Node) -> bool {
    is_list(tree, node)
        && tree
            .children(node)
            .iter()
            .any(|c| is_item(tree, c) && has_checkbox(tree, c))
}

/// The task list enclosing `node`, not counting `node` itself.
pub fn task_list<T: OutlineTree>(tree: &T, node: &T::Node) -> Option<T::Node> {
    let parent = tree.parent(node)?;
    closest(tree, &parent, |n| is_task_list(tree, n))
}

/// The outermost task list in `node`'s ancestor chain.
pub fn root_task_list<T: OutlineTree>(tree: &T, node: &T::Node) -> Option<T::Node> {
    let list = task_list(tree, node)?;
    Some(root_task_list(tree, &list).unwrap_or(list))
}

/// Is the task list `item` belongs to a root task list?
pub fn is_root_task_container<T: OutlineTree>(tree: &T, item: &T::Node) -> bool {
    match task_list(tree, item) {
        Some(list) => root_task_list(tree, item).as_ref() == Some(&list),
        None => false,
    }
}

/// The list whose flattened enumeration numbers `item`.
///
/// Task items use their root task list. Items outside any task list fall back to the
/// outermost list below the grouping root.
pub fn top_level_list<T: OutlineTree>(tree: &T, item: &T::Node) -> Option<T::Node> {
    if let Some(list) = root_task_list(tree, item) {
        return Some(list);
    }
    let mut outermost = None;
    let mut cur = tree.parent(item);
    while let Some(n) = cur {
        match tree.kind(&n) {
            NodeKind::Group => break,
            NodeKind::List { .. } => outermost = Some(n.clone()),
            _ => {}
        }
        cur = tree.parent(&n);
    }
    outermost
}

/// Every node under `node` in document order, `node` excluded.
pub fn descendants<T: OutlineTree>(tree: &T, node: &T::Node) -> Vec<T::Node> {
    let mut out = vec![];
    let mut stack = tree.children(node);
    stack.reverse();
    while let Some(n) = stack.pop() {
        let mut kids = tree.children(&n);
        kids.reverse();
        stack.extend(kids);
        out.push(n);
    }
    out
}

/// Every list under `root`, task list or not, in document order.
pub fn lists_in<T: OutlineTree>(tree: &T, root: &T::Node) -> Vec<T::Node> {
    descendants(tree, root)
        .into_iter()
        .filter(|n| is_list(tree, n))
        .collect()
}

/// Depth-first flattening of every item under `node`.
pub fn items_in<T: OutlineTree>(tree: &T, node: &T::Node) -> Vec<T::Node> {
    descendants(tree, node)
        .into_iter()
        .filter(|n| is_item(tree, n))
        .collect()
}

/// Number of items a child occupies in a flattened enumeration, itself included.
pub fn flattened_len<T: OutlineTree>(tree: &T, node: &T::Node) -> usize {
    let own = usize::from(is_item(tree, node));
    own + items_in(tree, node).len()
}

pub fn index_in_parent<T: OutlineTree>(tree: &T, node: &T::Node) -> Option<usize> {
    let parent = tree.parent(node)?;
    tree.children(&parent).iter().position(|c| c == node)
}

pub fn next_sibling<T: OutlineTree>(tree: &T, node: &T::Node) -> Option<T::Node> {
    let parent = tree.parent(node)?;
    let kids = tree.children(&parent);
    let idx = kids.iter().position(|c| c == node)?;
    kids.get(idx + 1).cloned()
}

/// Whether `first` comes before `second` among the same parent's children.
///
/// Walks backward from `second` through its previous siblings. Nodes in different
/// containers never compare as ordered.
pub fn precedes<T: OutlineTree>(tree: &T, first: &T::Node, second: &T::Node) -> bool {
    let (Some(pa), Some(pb)) = (tree.parent(first), tree.parent(second)) else {
        return false;
    };
    if pa != pb {
        return false;
    }
    let kids = tree.children(&pb);
    let Some(at) = kids.iter().position(|c| c == second) else {
        return false;
    };
    kids[..at].iter().rev().any(|c| c == first)
}

pub fn is_descendant_of<T: OutlineTree>(tree: &T, node: &T::Node, ancestor: &T::Node) -> bool {
    let mut cur = tree.parent(node);
    while let Some(n) = cur {
        if &n == ancestor {
            return true;
        }
        cur = tree.parent(&n);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ArenaTree;

    #[test]
    fn test_precedes_only_within_same_list() {
        let mut t = ArenaTree::new();
        let g = t.group();
        let l1 = t.list(g, false);
        let a = t.task(l1, "a", false);
        let b = t.task(l1, "b", false);
        let l2 = t.list(g, false);
        let c = t.task(l2, "c", false);

        assert!(precedes(&t, &a, &b));
        assert!(!precedes(&t, &b, &a));
        assert!(!precedes(&t, &a, &a));
        assert!(!precedes(&t, &a, &c));
        assert!(!precedes(&t, &c, &a));
    }

    #[test]
    fn test_root_task_list_skips_plain_lists() {
        let mut t = ArenaTree::new();
        let g = t.group();
        let ol = t.list(g, true);
        let nested = t.item(ol, "Nested");
        let tl = t.list(nested, false);
        let r2 = t.task(tl, "R2-D2", false);
        let inner = t.list(r2, false);
        let baymax = t.task(inner, "Baymax", false);

        assert!(!is_task_list(&t, &ol));
        assert!(is_task_list(&t, &tl));
        assert_eq!(root_task_list(&t, &baymax), Some(tl));
        assert_eq!(root_task_list(&t, &r2), Some(tl));
        assert!(is_root_task_container(&t, &r2));
        assert!(!is_root_task_container(&t, &baymax));
        assert!(!is_root_task_container(&t, &nested));
        assert_eq!(top_level_list(&t, &nested), Some(ol));
    }

    #[test]
    fn test_checkbox_lookup_does_not_enter_nested_lists() {
        let mut t = ArenaTree::new();
        let g = t.group();
        let l = t.list(g, false);
        let plain = t.item(l, "plain");
        let sub = t.list(plain, false);
        let _ = t.task(sub, "child", true);

        assert!(!has_checkbox(&t, &plain));
        assert!(!is_task_list(&t, &l));
        assert!(is_task_list(&t, &sub));
    }

    #[test]
    fn test_lists_in_document_order() {
        let mut t = ArenaTree::new();
        let g = t.group();
        let a = t.list(g, true);
        let a1 = t.item(a, "a1");
        let a1_sub = t.list(a1, false);
        let b = t.list(g, false);

        assert_eq!(lists_in(&t, &g), vec![a, a1_sub, b]);
        assert!(is_root_container(&t, &g));
        assert!(!is_root_container(&t, &a));
    }
}
