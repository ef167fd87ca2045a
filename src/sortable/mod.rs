use crate::config::SortOptions;
use crate::error::{TaskListError, TaskListResult};
use crate::tree::{self, Marker, OutlineTree};
use std::collections::HashMap;
use std::rc::Rc;

/// A list and an ordinal inside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortPosition<N> {
    pub list: N,
    pub index: usize,
}

/// Where a finished drag took its item from and to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortEnd<N> {
    pub item: N,
    pub src: SortPosition<N>,
    pub dst: SortPosition<N>,
}

pub type SortStartHandler<T> =
    Rc<dyn Fn(&T, &<T as OutlineTree>::Node) -> TaskListResult<()>>;
pub type SortEndHandler<T> =
    Rc<dyn Fn(&T, &SortEnd<<T as OutlineTree>::Node>) -> TaskListResult<()>>;

struct SortHandlers<T: OutlineTree> {
    started: SortStartHandler<T>,
    finished: SortEndHandler<T>,
}

/// What the host should do with the platform event it forwarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragResponse {
    /// Not ours: no drag in progress, or a text selection drag.
    Ignored,
    /// A drag session began. Attach drag data so every browser starts the gesture.
    Started,
    /// Valid drop zone: prevent the default and advertise a `move` drop effect.
    Accepted,
    /// Target lives in another grouping root: stop propagation so no ancestor reacts.
    Rejected,
    /// The drop was consumed: prevent the default and stop propagation.
    Dropped,
}

#[derive(Clone, Debug)]
struct DragState<N> {
    did_drop: bool,
    dragging: N,
    dropzone: N,
    source_list: N,
    source_sibling: Option<N>,
    source_index: usize,
}

/// The drag coordinator. One instance owns the only drag session, and every draggable
/// item is wired through it.
pub struct Sortable<T: OutlineTree> {
    handlers: HashMap<T::Node, SortHandlers<T>>,
    state: Option<DragState<T::Node>>,
    options: SortOptions,
}

impl<T: OutlineTree> Default for Sortable<T> {
    fn default() -> Self {
        Self::new(SortOptions::default())
    }
}

impl<T: OutlineTree> Sortable<T> {
    pub fn new(options: SortOptions) -> Self {
        Self {
            handlers: HashMap::new(),
            state: None,
            options,
        }
    }

    pub fn options(&self) -> SortOptions {
        self.options
    }

    pub fn is_dragging(&self) -> bool {
        self.state.is_some()
    }

    /// The item being dragged, if any.
    pub fn dragging(&self) -> Option<&T::Node> {
        self.state.as_ref().map(|s| &s.dragging)
    }

    pub fn dropzone(&self) -> Option<&T::Node> {
        self.state.as_ref().map(|s| &s.dropzone)
    }

    pub fn attach(
        &mut self,
        item: T::Node,
        started: SortStartHandler<T>,
        finished: SortEndHandler<T>,
    ) {
        self.handlers
            .insert(item, SortHandlers { started, finished });
    }

    pub fn is_attached(&self, item: &T::Node) -> bool {
        self.handlers.contains_key(item)
    }

    /// Forgets `item`'s callbacks once the item is gone.
    pub fn detach(&mut self, item: &T::Node) {
        self.handlers.remove(item);
    }

    pub fn drag_start(
        &mut self,
        tree: &mut T,
        current_target: &T::Node,
        target: &T::Node,
    ) -> TaskListResult<DragResponse> {
        // Ignore selected text dragging within list items.
        if current_target != target {
            return Ok(DragResponse::Ignored);
        }
        if let Some(active) = &self.state {
            tracing::warn!(dragging = ?active.dragging, "drag start while a drag is active");
            return Ok(DragResponse::Ignored);
        }
        if tree::grouping_root(tree, target).is_none() {
            return Ok(DragResponse::Ignored);
        }

        let source_list = tree.parent(target).ok_or(TaskListError::DetachedItem)?;
        let source_index =
            tree::index_in_parent(tree, target).ok_or(TaskListError::DetachedItem)?;
        let source_sibling = tree::next_sibling(tree, target);

        tree.set_marker(target, Marker::Ghost, true);
        self.state = Some(DragState {
            did_drop: false,
            dragging: target.clone(),
            dropzone: target.clone(),
            source_list: source_list.clone(),
            source_sibling,
            source_index,
        });
        tracing::debug!(item = ?target, index = source_index, "drag started");

        if let Some(h) = self.handlers.get(target) {
            (h.started)(&*tree, &source_list)?;
        }
        Ok(DragResponse::Started)
    }

    pub fn drag_enter(
        &mut self,
        tree: &mut T,
        dropzone: &T::Node,
    ) -> TaskListResult<DragResponse> {
        let Some(state) = self.state.as_mut() else {
            return Ok(DragResponse::Ignored);
        };

        if !tree::in_same_group(tree, &state.dragging, dropzone) {
            return Ok(DragResponse::Rejected);
        }

        // Make sure we weren't already dragging over this item.
        if &state.dropzone == dropzone {
            return Ok(DragResponse::Accepted);
        }

        // Open an empty space in the list as a drop target.
        tree.set_marker(&state.dragging, Marker::OpenSlot, true);
        state.dropzone = dropzone.clone();

        if dropzone == &state.dragging || tree::is_descendant_of(tree, dropzone, &state.dragging) {
            return Ok(DragResponse::Accepted);
        }

        let parent = tree.parent(dropzone).ok_or(TaskListError::DetachedItem)?;
        if tree::precedes(tree, &state.dragging, dropzone) {
            tree.insert_before(&parent, &state.dragging, Some(dropzone))?;
        } else {
            let reference = match tree::next_sibling(tree, dropzone) {
                Some(n) if n == state.dragging => tree::next_sibling(tree, &state.dragging),
                other => other,
            };
            tree.insert_before(&parent, &state.dragging, reference.as_ref())?;
        }
        Ok(DragResponse::Accepted)
    }

    pub fn drag_over(&self, tree: &T, dropzone: &T::Node) -> DragResponse {
        match &self.state {
            None => DragResponse::Ignored,
            Some(state) if !tree::in_same_group(tree, &state.dragging, dropzone) => {
                DragResponse::Rejected
            }
            Some(_) => DragResponse::Accepted,
        }
    }

    pub fn drop(&mut self, tree: &mut T, dropzone: &T::Node) -> TaskListResult<DragResponse> {
        let Some(state) = self.state.as_mut() else {
            return Ok(DragResponse::Ignored);
        };
        if !tree::in_same_group(tree, &state.dragging, dropzone) {
            return Ok(DragResponse::Rejected);
        }

        // Tells drag_end the gesture ended on a valid drop target.
        state.did_drop = true;

        let current_list = tree
            .parent(&state.dragging)
            .ok_or(TaskListError::DetachedItem)?;
        let mut new_index =
            tree::index_in_parent(tree, &state.dragging).ok_or(TaskListError::DetachedItem)?;

        // Don't notify if the item ended up where it started.
        if state.source_index == new_index && state.source_list == current_list {
            tracing::debug!(item = ?state.dragging, "drop without a move");
            return Ok(DragResponse::Dropped);
        }

        if self.options.count_vacated_slot
            && state.source_list == current_list
            && state.source_index < new_index
        {
            new_index += 1;
        }

        let end = SortEnd {
            item: state.dragging.clone(),
            src: SortPosition {
                list: state.source_list.clone(),
                index: state.source_index,
            },
            dst: SortPosition {
                list: current_list,
                index: new_index,
            },
        };
        tracing::debug!(
            item = ?end.item,
            from = end.src.index,
            to = end.dst.index,
            "drag dropped"
        );

        if let Some(h) = self.handlers.get(&end.item) {
            (h.finished)(&*tree, &end)?;
        }
        Ok(DragResponse::Dropped)
    }

    /// Ends the session. Without a prior drop the item goes back where it started.
    pub fn drag_end(&mut self, tree: &mut T) -> TaskListResult<()> {
        let Some(state) = self.state.take() else {
            return Ok(());
        };

        tree.set_marker(&state.dragging, Marker::OpenSlot, false);
        tree.set_marker(&state.dragging, Marker::Ghost, false);

        if !state.did_drop {
            tracing::debug!(item = ?state.dragging, "drag canceled");
            tree.insert_before(
                &state.source_list,
                &state.dragging,
                state.source_sibling.as_ref(),
            )?;
        }
        Ok(())
    }
}
