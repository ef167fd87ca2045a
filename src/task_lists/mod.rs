use crate::config::{SortOptions, TaskListsConfig};
use crate::error::{TaskListError, TaskListResult};
use crate::models::{CheckEvent, MoveStartEvent, TaskListsEvent};
use crate::position::{canonical_position, ListSnapshots};
use crate::sortable::{DragResponse, SortEnd, SortEndHandler, SortStartHandler, Sortable};
use crate::tree::{self, Marker, NodeKind, OutlineTree};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

pub type Emitter = Rc<dyn Fn(TaskListsEvent)>;

/// The single drag coordinator plus the list snapshots it resolves moves against.
///
/// Every grouping root on a page shares one of these, which is what keeps a second drag
/// from starting while one is in flight.
pub struct DragCoordinator<T: OutlineTree> {
    sortable: Rc<RefCell<Sortable<T>>>,
    snapshots: Rc<RefCell<ListSnapshots<T::Node>>>,
}

impl<T: OutlineTree> Clone for DragCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            sortable: self.sortable.clone(),
            snapshots: self.snapshots.clone(),
        }
    }
}

impl<T: OutlineTree> DragCoordinator<T> {
    pub fn new(options: SortOptions) -> Self {
        Self {
            sortable: Rc::new(RefCell::new(Sortable::new(options))),
            snapshots: Rc::new(RefCell::new(ListSnapshots::new())),
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.sortable.borrow().is_dragging()
    }

    pub fn is_attached(&self, item: &T::Node) -> bool {
        self.sortable.borrow().is_attached(item)
    }

    pub fn has_snapshots(&self) -> bool {
        !self.snapshots.borrow().is_empty()
    }

    pub fn drag_start(
        &self,
        tree: &mut T,
        current_target: &T::Node,
        target: &T::Node,
    ) -> TaskListResult<DragResponse> {
        self.sortable
            .borrow_mut()
            .drag_start(tree, current_target, target)
    }

    pub fn drag_enter(&self, tree: &mut T, dropzone: &T::Node) -> TaskListResult<DragResponse> {
        self.sortable.borrow_mut().drag_enter(tree, dropzone)
    }

    pub fn drag_over(&self, tree: &T, dropzone: &T::Node) -> DragResponse {
        self.sortable.borrow().drag_over(tree, dropzone)
    }

    pub fn drop(&self, tree: &mut T, dropzone: &T::Node) -> TaskListResult<DragResponse> {
        self.sortable.borrow_mut().drop(tree, dropzone)
    }

    /// Ends the session and drops any snapshot a canceled or in-place drag left unused.
    pub fn drag_end(&self, tree: &mut T) -> TaskListResult<()> {
        let result = self.sortable.borrow_mut().drag_end(tree);
        self.snapshots.borrow_mut().clear();
        result
    }
}

/// A list item that just became draggable, with the handle that was prepended to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Initialized<N> {
    pub item: N,
    pub handle: N,
}

/// Glue between one grouping root and the drag coordinator: decides which items are
/// draggable, keeps hover and disabled state in sync and reports checkbox toggles.
pub struct TaskLists<T: OutlineTree> {
    root: T::Node,
    config: TaskListsConfig,
    coordinator: DragCoordinator<T>,
    initialized: HashSet<T::Node>,
    emitter: Emitter,
}

impl<T: OutlineTree + 'static> TaskLists<T> {
    pub fn new(
        root: T::Node,
        config: TaskListsConfig,
        coordinator: DragCoordinator<T>,
        emitter: Emitter,
    ) -> Self {
        Self {
            root,
            config,
            coordinator,
            initialized: HashSet::new(),
            emitter,
        }
    }

    pub fn root(&self) -> &T::Node {
        &self.root
    }

    pub fn config(&self) -> TaskListsConfig {
        self.config
    }

    pub fn coordinator(&self) -> &DragCoordinator<T> {
        &self.coordinator
    }

    pub fn is_initialized(&self, item: &T::Node) -> bool {
        self.initialized.contains(item)
    }

    /// Initializes every item of a root task list, then syncs disabled state.
    pub fn sync(&mut self, tree: &mut T) -> TaskListResult<Vec<Initialized<T::Node>>> {
        let mut fresh = vec![];
        for item in tree::items_in(tree, &self.root) {
            let in_task_list = tree
                .parent(&item)
                .is_some_and(|p| tree::is_task_list(tree, &p));
            if in_task_list && tree::is_root_task_container(tree, &item) {
                if let Some(init) = self.initialize_item(tree, &item)? {
                    fresh.push(init);
                }
            }
        }
        self.sync_disabled(tree);
        Ok(fresh)
    }

    /// Makes `item` draggable when it sits directly in a root task list holding more than
    /// one task. Only top-level lists are draggable; nested lists drag with their parent
    /// item. Runs at most once per item.
    pub fn initialize_item(
        &mut self,
        tree: &mut T,
        item: &T::Node,
    ) -> TaskListResult<Option<Initialized<T::Node>>> {
        if !self.initialized.insert(item.clone()) {
            return Ok(None);
        }

        if tree::grouping_root(tree, item).as_ref() != Some(&self.root) {
            return Ok(None);
        }

        let Some(list) = tree.parent(item) else {
            return Ok(None);
        };
        if tree::root_task_list(tree, item).as_ref() != Some(&list) {
            return Ok(None);
        }

        // Single item task lists are not draggable.
        let tasks = tree::items_in(tree, &list)
            .iter()
            .filter(|n| tree::has_checkbox(tree, n))
            .count();
        if tasks <= 1 {
            return Ok(None);
        }

        let handle = tree.attach_handle(item)?;
        let (started, finished) = self.sort_handlers(item);
        self.coordinator
            .sortable
            .borrow_mut()
            .attach(item.clone(), started, finished);

        tracing::debug!(item = ?item, "task list item initialized");
        Ok(Some(Initialized {
            item: item.clone(),
            handle,
        }))
    }

    fn sort_handlers(&self, item: &T::Node) -> (SortStartHandler<T>, SortEndHandler<T>) {
        let started: SortStartHandler<T> = {
            let snapshots = self.coordinator.snapshots.clone();
            let emitter = self.emitter.clone();
            let item = item.clone();
            Rc::new(move |tree: &T, list: &T::Node| {
                snapshots.borrow_mut().begin_snapshot(tree, list)?;
                let src = canonical_position(tree, &item)?;
                emitter(TaskListsEvent::MoveStart(MoveStartEvent { src }));
                Ok(())
            })
        };

        let finished: SortEndHandler<T> = {
            let snapshots = self.coordinator.snapshots.clone();
            let emitter = self.emitter.clone();
            Rc::new(move |tree: &T, end: &SortEnd<T::Node>| {
                let moved = snapshots.borrow_mut().resolve_move(tree, end)?;
                emitter(TaskListsEvent::Move(moved));
                Ok(())
            })
        };

        (started, finished)
    }

    /// Drops every side-table entry kept for `item`.
    pub fn forget(&mut self, item: &T::Node) {
        self.initialized.remove(item);
        self.coordinator.sortable.borrow_mut().detach(item);
    }

    /// Forgets every item this root initialized.
    pub fn release(&mut self) {
        let mut sortable = self.coordinator.sortable.borrow_mut();
        for item in self.initialized.drain() {
            sortable.detach(&item);
        }
    }

    pub fn sync_disabled(&self, tree: &mut T) {
        let enabled = !self.config.disabled;
        for node in tree::descendants(tree, &self.root) {
            match tree.kind(&node) {
                NodeKind::Item => tree.set_marker(&node, Marker::Enabled, enabled),
                NodeKind::Checkbox { .. } => tree.set_checkbox_disabled(&node, !enabled),
                _ => {}
            }
        }
    }

    pub fn set_disabled(&mut self, tree: &mut T, disabled: bool) {
        if self.config.disabled == disabled {
            return;
        }
        self.config.disabled = disabled;
        self.sync_disabled(tree);
    }

    pub fn set_sortable(&mut self, sortable: bool) {
        self.config.sortable = sortable;
    }

    // Drag operations don't remove :hover styles, so hover state is tracked by hand.
    pub fn item_pointer_enter(&self, tree: &mut T, item: &T::Node) {
        if self.config.interactive() {
            tree.set_marker(item, Marker::Hovered, true);
        }
    }

    pub fn item_pointer_leave(&self, tree: &mut T, item: &T::Node) {
        tree.set_marker(item, Marker::Hovered, false);
    }

    /// Enables item drag while its handle is hovered.
    pub fn handle_pointer_enter(&self, tree: &mut T, item: &T::Node) {
        if self.config.interactive() {
            tree.set_draggable(item, true);
        }
    }

    /// Disables item drag again so text selection works, unless a drag is in flight.
    pub fn handle_pointer_leave(&self, tree: &mut T, item: &T::Node) {
        if self.coordinator.is_dragging() {
            return;
        }
        tree.set_draggable(item, false);
    }

    /// Reports a checkbox toggle at the checkbox's canonical position.
    pub fn check_toggled(&self, tree: &T, checkbox: &T::Node) -> TaskListResult<CheckEvent> {
        let NodeKind::Checkbox { checked } = tree.kind(checkbox) else {
            return Err(TaskListError::NotACheckbox);
        };
        let item = tree::closest_item(tree, checkbox).ok_or(TaskListError::NotAnItem)?;
        let event = CheckEvent {
            position: canonical_position(tree, &item)?,
            checked,
        };
        (self.emitter)(TaskListsEvent::Check(event));
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MoveEvent;
    use crate::tree::{ArenaTree, NodeId};
    use pretty_assertions::assert_eq;

    struct Page {
        tree: ArenaTree,
        lists: TaskLists<ArenaTree>,
        events: Rc<RefCell<Vec<TaskListsEvent>>>,
        first: NodeId,
        hubot: NodeId,
        bender: NodeId,
        vision: NodeId,
        wall_e: NodeId,
        r2d2: NodeId,
        baymax: NodeId,
    }

    /// Three task lists: two flat ones and one nested under a plain ordered list.
    fn page() -> Page {
        let mut tree = ArenaTree::new();
        let g = tree.group();
        let first = tree.list(g, false);
        let hubot = tree.task(first, "Hubot", false);
        let bender = tree.task(first, "Bender", false);
        let vision = tree.task(first, "Vision", false);
        let second = tree.list(g, false);
        let _ = tree.task(second, "BB-8", false);
        let wall_e = tree.task(second, "WALL-E", false);
        let ol = tree.list(g, true);
        let nested = tree.item(ol, "Nested");
        let r2_list = tree.list(nested, false);
        let r2d2 = tree.task(r2_list, "R2-D2", false);
        let b_list = tree.list(r2d2, false);
        let baymax = tree.task(b_list, "Baymax", false);

        let events: Rc<RefCell<Vec<TaskListsEvent>>> = Rc::default();
        let sink = events.clone();
        let lists = TaskLists::new(
            g,
            TaskListsConfig::default(),
            DragCoordinator::new(SortOptions::default()),
            Rc::new(move |e| sink.borrow_mut().push(e)),
        );
        Page {
            tree,
            lists,
            events,
            first,
            hubot,
            bender,
            vision,
            wall_e,
            r2d2,
            baymax,
        }
    }

    #[test]
    fn test_sync_initializes_root_task_items_only() {
        let mut p = page();
        let fresh = p.lists.sync(&mut p.tree).expect("sync");
        let items: Vec<NodeId> = fresh.iter().map(|i| i.item).collect();

        assert_eq!(items.len(), 6);
        assert!(items.contains(&p.hubot));
        assert!(items.contains(&p.wall_e));
        // R2-D2's list holds R2-D2 and, flattened, Baymax: two tasks.
        assert!(items.contains(&p.r2d2));
        assert!(!items.contains(&p.baymax));
        for init in &fresh {
            assert_eq!(p.tree.kind(&init.handle), NodeKind::Handle);
            assert!(p.lists.coordinator().is_attached(&init.item));
        }
    }

    #[test]
    fn test_initialize_item_is_idempotent() {
        let mut p = page();
        assert!(p
            .lists
            .initialize_item(&mut p.tree, &p.hubot)
            .expect("init")
            .is_some());
        assert_eq!(p.lists.initialize_item(&mut p.tree, &p.hubot), Ok(None));
        let handles = p
            .tree
            .children(&p.hubot)
            .iter()
            .filter(|c| p.tree.kind(c) == NodeKind::Handle)
            .count();
        assert_eq!(handles, 1);
        assert!(p.lists.sync(&mut p.tree).expect("sync").iter().all(|i| i.item != p.hubot));
    }

    #[test]
    fn test_single_task_list_is_not_draggable() {
        let mut tree = ArenaTree::new();
        let g = tree.group();
        let l = tree.list(g, false);
        let only = tree.task(l, "only", false);
        let _ = tree.item(l, "plain");
        let mut lists = TaskLists::new(
            g,
            TaskListsConfig::default(),
            DragCoordinator::new(SortOptions::default()),
            Rc::new(|_: TaskListsEvent| {}),
        );

        assert_eq!(lists.initialize_item(&mut tree, &only), Ok(None));
        assert!(lists.is_initialized(&only));
        assert!(tree.children(&only).iter().all(|c| tree.kind(c) != NodeKind::Handle));
        assert!(!lists.coordinator().is_attached(&only));
    }

    #[test]
    fn test_item_of_other_group_is_skipped() {
        let mut p = page();
        let g2 = p.tree.group();
        let l2 = p.tree.list(g2, false);
        let x = p.tree.task(l2, "x", false);
        let _ = p.tree.task(l2, "y", false);

        assert_eq!(p.lists.initialize_item(&mut p.tree, &x), Ok(None));
    }

    #[test]
    fn test_check_toggled_reports_canonical_position() {
        let mut p = page();
        let checkbox = tree::checkbox_of(&p.tree, &p.wall_e).expect("checkbox");
        p.tree.set_checked(checkbox, true);

        let ev = p.lists.check_toggled(&p.tree, &checkbox).expect("check");
        assert_eq!(
            ev,
            CheckEvent {
                position: [1, 1],
                checked: true
            }
        );

        let baymax_box = tree::checkbox_of(&p.tree, &p.baymax).expect("checkbox");
        let ev = p.lists.check_toggled(&p.tree, &baymax_box).expect("check");
        assert_eq!(ev.position, [3, 1]);
        assert!(!ev.checked);
        assert_eq!(p.events.borrow().len(), 2);
    }

    #[test]
    fn test_check_toggled_rejects_other_nodes() {
        let p = page();
        assert_eq!(
            p.lists.check_toggled(&p.tree, &p.hubot),
            Err(TaskListError::NotACheckbox)
        );
    }

    #[test]
    fn test_drag_start_emits_move_start() {
        let mut p = page();
        p.lists.sync(&mut p.tree).expect("sync");
        let c = p.lists.coordinator().clone();

        c.drag_start(&mut p.tree, &p.bender, &p.bender).expect("start");
        assert_eq!(
            *p.events.borrow(),
            vec![TaskListsEvent::MoveStart(MoveStartEvent { src: [0, 1] })]
        );
        assert!(c.has_snapshots());
    }

    #[test]
    fn test_drop_emits_move_with_snapshot_positions() {
        let mut p = page();
        p.lists.sync(&mut p.tree).expect("sync");
        let c = p.lists.coordinator().clone();

        c.drag_start(&mut p.tree, &p.vision, &p.vision).expect("start");
        c.drag_enter(&mut p.tree, &p.hubot).expect("enter");
        c.drop(&mut p.tree, &p.hubot).expect("drop");
        c.drag_end(&mut p.tree).expect("end");

        assert_eq!(p.tree.labels(p.first), vec!["Hubot", "Vision", "Bender"]);
        let events = p.events.borrow();
        assert_eq!(
            events.last(),
            Some(&TaskListsEvent::Move(MoveEvent {
                src: [0, 2],
                dst: [0, 1]
            }))
        );
        assert!(!c.has_snapshots());
    }

    #[test]
    fn test_drop_in_place_emits_nothing_and_clears_snapshot() {
        let mut p = page();
        p.lists.sync(&mut p.tree).expect("sync");
        let c = p.lists.coordinator().clone();

        c.drag_start(&mut p.tree, &p.vision, &p.vision).expect("start");
        c.drop(&mut p.tree, &p.hubot).expect("drop");
        c.drag_end(&mut p.tree).expect("end");

        assert!(p
            .events
            .borrow()
            .iter()
            .all(|e| !matches!(e, TaskListsEvent::Move(_))));
        assert!(!c.has_snapshots());
    }

    #[test]
    fn test_cancel_restores_order_and_discards_snapshot() {
        let mut p = page();
        p.lists.sync(&mut p.tree).expect("sync");
        let c = p.lists.coordinator().clone();

        c.drag_start(&mut p.tree, &p.vision, &p.vision).expect("start");
        c.drag_enter(&mut p.tree, &p.hubot).expect("enter");
        assert!(c.has_snapshots());
        assert_eq!(p.tree.labels(p.first), vec!["Hubot", "Vision", "Bender"]);
        c.drag_end(&mut p.tree).expect("end");

        assert_eq!(p.tree.labels(p.first), vec!["Hubot", "Bender", "Vision"]);
        assert!(!c.has_snapshots());
        assert!(!c.is_dragging());
        assert!(p
            .events
            .borrow()
            .iter()
            .all(|e| !matches!(e, TaskListsEvent::Move(_))));
    }

    #[test]
    fn test_cross_list_move_reports_snapshot_list_and_flattened_index() {
        let mut tree = ArenaTree::new();
        let g = tree.group();
        let l0 = tree.list(g, false);
        let a = tree.task(l0, "a", false);
        let a_sub = tree.list(a, false);
        let _ = tree.task(a_sub, "a.1", false);
        let _ = tree.task(l0, "b", false);
        let l1 = tree.list(g, false);
        let _ = tree.task(l1, "c", false);
        let _ = tree.task(l1, "d", false);
        let l2 = tree.list(g, false);
        let x = tree.task(l2, "x", false);
        let _ = tree.task(l2, "y", false);

        let events: Rc<RefCell<Vec<TaskListsEvent>>> = Rc::default();
        let sink = events.clone();
        let mut lists = TaskLists::new(
            g,
            TaskListsConfig::default(),
            DragCoordinator::new(SortOptions::default()),
            Rc::new(move |e| sink.borrow_mut().push(e)),
        );
        lists.sync(&mut tree).expect("sync");
        let c = lists.coordinator().clone();

        c.drag_start(&mut tree, &a, &a).expect("start");
        c.drag_enter(&mut tree, &x).expect("enter");
        c.drop(&mut tree, &x).expect("drop");
        c.drag_end(&mut tree).expect("end");

        assert_eq!(tree.labels(l2), vec!["x", "a", "y"]);
        // Live order is now l0, l1, l2, a's sub-list.
        assert_eq!(crate::position::list_index(&tree, &l2), Ok(2));
        assert_eq!(
            *events.borrow(),
            vec![
                TaskListsEvent::MoveStart(MoveStartEvent { src: [0, 0] }),
                TaskListsEvent::Move(MoveEvent {
                    src: [0, 0],
                    dst: [3, 1]
                }),
            ]
        );
        assert!(!c.has_snapshots());
    }

    #[test]
    fn test_hover_requires_interactive_config() {
        let mut p = page();
        p.lists.item_pointer_enter(&mut p.tree, &p.hubot);
        assert!(p.tree.has_marker(&p.hubot, Marker::Hovered));
        p.lists.item_pointer_leave(&mut p.tree, &p.hubot);
        assert!(!p.tree.has_marker(&p.hubot, Marker::Hovered));

        p.lists.set_sortable(false);
        p.lists.item_pointer_enter(&mut p.tree, &p.hubot);
        p.lists.handle_pointer_enter(&mut p.tree, &p.hubot);
        assert!(!p.tree.has_marker(&p.hubot, Marker::Hovered));
        assert!(!p.tree.is_draggable(&p.hubot));
    }

    #[test]
    fn test_handle_leave_keeps_draggable_during_drag() {
        let mut p = page();
        p.lists.sync(&mut p.tree).expect("sync");
        p.lists.handle_pointer_enter(&mut p.tree, &p.hubot);
        assert!(p.tree.is_draggable(&p.hubot));

        let c = p.lists.coordinator().clone();
        c.drag_start(&mut p.tree, &p.hubot, &p.hubot).expect("start");
        p.lists.handle_pointer_leave(&mut p.tree, &p.hubot);
        assert!(p.tree.is_draggable(&p.hubot));

        c.drag_end(&mut p.tree).expect("end");
        p.lists.handle_pointer_leave(&mut p.tree, &p.hubot);
        assert!(!p.tree.is_draggable(&p.hubot));
    }

    #[test]
    fn test_set_disabled_syncs_markers_and_checkboxes() {
        let mut p = page();
        p.lists.sync(&mut p.tree).expect("sync");
        let checkbox = tree::checkbox_of(&p.tree, &p.hubot).expect("checkbox");
        assert!(p.tree.has_marker(&p.hubot, Marker::Enabled));
        assert!(!p.tree.is_checkbox_disabled(checkbox));

        p.lists.set_disabled(&mut p.tree, true);
        assert!(!p.tree.has_marker(&p.hubot, Marker::Enabled));
        assert!(p.tree.is_checkbox_disabled(checkbox));
        assert!(!p.lists.config().interactive());
    }

    #[test]
    fn test_forget_and_release_drop_side_tables() {
        let mut p = page();
        p.lists.sync(&mut p.tree).expect("sync");

        p.lists.forget(&p.hubot);
        assert!(!p.lists.is_initialized(&p.hubot));
        assert!(!p.lists.coordinator().is_attached(&p.hubot));

        p.lists.release();
        assert!(!p.lists.coordinator().is_attached(&p.bender));
        assert!(!p.lists.is_initialized(&p.bender));
    }
}
