use crate::error::{TaskListError, TaskListResult};
use crate::models::MoveEvent;
use crate::sortable::SortEnd;
use crate::tree::{self, OutlineTree};
use std::collections::HashMap;

/// `[list index, item index]`, numbered the way the server-side Markdown renderer
/// numbers list occurrences.
pub type Position = [usize; 2];

/// Returns `item`'s position as a (list index, item index) tuple.
///
/// The list index counts every list in the grouping root, not just task lists. The item
/// index counts every item of the top-level list depth first, so nested items take the
/// slots right after their parent.
pub fn canonical_position<T: OutlineTree>(tree: &T, item: &T::Node) -> TaskListResult<Position> {
    if !tree::is_item(tree, item) {
        return Err(TaskListError::NotAnItem);
    }
    let list = tree::top_level_list(tree, item).ok_or(TaskListError::DetachedItem)?;
    let index = tree::items_in(tree, &list)
        .iter()
        .position(|n| n == item)
        .ok_or(TaskListError::ItemNotInList)?;
    Ok([list_index(tree, &list)?, index])
}

/// Index of `list` among every list in its grouping root, live order.
pub fn list_index<T: OutlineTree>(tree: &T, list: &T::Node) -> TaskListResult<usize> {
    let root = tree::grouping_root(tree, list).ok_or(TaskListError::MissingGroupingRoot)?;
    tree::lists_in(tree, &root)
        .iter()
        .position(|l| l == list)
        .ok_or(TaskListError::DetachedItem)
}

/// Flattened item index of the slot `slot` of `list`: the number of items enumerated
/// before whatever sits there. `slot == children.len()` addresses the end.
pub fn slot_offset<T: OutlineTree>(tree: &T, list: &T::Node, slot: usize) -> TaskListResult<usize> {
    let kids = tree.children(list);
    if slot > kids.len() {
        return Err(TaskListError::SlotOutOfRange { slot });
    }
    Ok(kids[..slot].iter().map(|c| tree::flattened_len(tree, c)).sum())
}

#[derive(Clone, Debug)]
struct ListSnapshot<N> {
    lists: Vec<N>,
    origin: N,
    /// Flattened offsets of every slot of `origin`, end slot included.
    origin_offsets: Vec<usize>,
}

/// Per grouping root list order captured at drag start.
///
/// The engine splices the dragged item around while the pointer moves, which shifts
/// live list order. Containers are resolved by identity against the order they had
/// when the drag began.
#[derive(Debug)]
pub struct ListSnapshots<N> {
    by_root: HashMap<N, ListSnapshot<N>>,
}

impl<N> Default for ListSnapshots<N> {
    fn default() -> Self {
        Self {
            by_root: HashMap::new(),
        }
    }
}

impl<N: Clone + Eq + std::hash::Hash> ListSnapshots<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_root.is_empty()
    }

    pub fn contains_root(&self, root: &N) -> bool {
        self.by_root.contains_key(root)
    }

    /// Captures every list of `origin`'s grouping root. Replaces an unconsumed snapshot
    /// left behind by a canceled drag.
    pub fn begin_snapshot<T>(&mut self, tree: &T, origin: &N) -> TaskListResult<()>
    where
        T: OutlineTree<Node = N>,
    {
        let root = tree::grouping_root(tree, origin).ok_or(TaskListError::MissingGroupingRoot)?;
        let lists = tree::lists_in(tree, &root);

        let mut origin_offsets = vec![0];
        let mut acc = 0;
        for child in tree.children(origin) {
            acc += tree::flattened_len(tree, &child);
            origin_offsets.push(acc);
        }

        tracing::debug!(lists = lists.len(), "task list snapshot taken");
        self.by_root.insert(
            root,
            ListSnapshot {
                lists,
                origin: origin.clone(),
                origin_offsets,
            },
        );
        Ok(())
    }

    /// Consumes the snapshot and maps both ends of a move to canonical positions.
    ///
    /// List indices come from the snapshot. The source item index comes from the origin
    /// list as it was at drag start; the destination item index is read from the live
    /// tree.
    pub fn resolve_move<T>(&mut self, tree: &T, end: &SortEnd<N>) -> TaskListResult<MoveEvent>
    where
        T: OutlineTree<Node = N>,
    {
        let root =
            tree::grouping_root(tree, &end.src.list).ok_or(TaskListError::MissingGroupingRoot)?;
        let snapshot = self
            .by_root
            .remove(&root)
            .ok_or(TaskListError::SnapshotMissing)?;

        let index_of = |list: &N| {
            snapshot
                .lists
                .iter()
                .position(|l| l == list)
                .ok_or(TaskListError::ListNotInSnapshot)
        };
        let src_list = index_of(&end.src.list)?;
        let dst_list = index_of(&end.dst.list)?;

        let src_item = if end.src.list == snapshot.origin {
            *snapshot
                .origin_offsets
                .get(end.src.index)
                .ok_or(TaskListError::SlotOutOfRange {
                    slot: end.src.index,
                })?
        } else {
            slot_offset(tree, &end.src.list, end.src.index)?
        };
        let dst_item = slot_offset(tree, &end.dst.list, end.dst.index)?;

        Ok(MoveEvent {
            src: [src_list, src_item],
            dst: [dst_list, dst_item],
        })
    }

    /// Drops the snapshot of `root` without resolving it.
    pub fn discard(&mut self, root: &N) {
        self.by_root.remove(root);
    }

    pub fn clear(&mut self) {
        self.by_root.clear();
    }
}
