use crate::config::{SortOptions, TaskListsConfig};
use crate::error::{TaskListError, TaskListResult};
use crate::models::TaskListsEvent;
use crate::sortable::DragResponse;
use crate::task_lists::{DragCoordinator, Initialized, TaskLists};
use crate::tree::{Marker, NodeKind, OutlineTree};
use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU32, Ordering};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

const GROUP_ATTR: &str = "data-task-lists";
const CHECKBOX_CLASS: &str = "task-list-item-checkbox";
const HANDLE_CLASS: &str = "handle";

const HANDLE_SVG: &str = r#"<svg class="drag-handle" aria-hidden="true" width="16" height="15" version="1.1" viewBox="0 0 16 15"><path d="M12,4V5H4V4h8ZM4,8h8V7H4V8Zm0,3h8V10H4v1Z"></path></svg>"#;

static NEXT_KEY: AtomicU32 = AtomicU32::new(1);

thread_local! {
    static KEYS: js_sys::WeakMap = js_sys::WeakMap::new();
}

/// An element plus a key bound to the element object, so the same element always hashes
/// the same no matter which JS wrapper handed it over. Clones of an element get their own.
#[derive(Clone, Debug)]
pub struct DomNode {
    key: u32,
    el: web_sys::Element,
}

impl DomNode {
    pub fn of(el: web_sys::Element) -> Self {
        let key = KEYS.with(|keys| {
            let obj: &js_sys::Object = el.unchecked_ref();
            match keys.get(obj).as_f64() {
                Some(key) => key as u32,
                None => {
                    let key = NEXT_KEY.fetch_add(1, Ordering::SeqCst);
                    keys.set(obj, &JsValue::from(key));
                    key
                }
            }
        });
        Self { key, el }
    }

    pub fn element(&self) -> &web_sys::Element {
        &self.el
    }
}

impl PartialEq for DomNode {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for DomNode {}

impl Hash for DomNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

fn is_group_element(el: &web_sys::Element) -> bool {
    el.tag_name() == "TASK-LISTS" || el.has_attribute(GROUP_ATTR)
}

/// The live document as an outline.
#[derive(Clone, Copy, Debug, Default)]
pub struct DomTree;

impl OutlineTree for DomTree {
    type Node = DomNode;

    fn kind(&self, node: &DomNode) -> NodeKind {
        let el = &node.el;
        if is_group_element(el) {
            return NodeKind::Group;
        }
        match el.tag_name().as_str() {
            "UL" => NodeKind::List { ordered: false },
            "OL" => NodeKind::List { ordered: true },
            "LI" => NodeKind::Item,
            "INPUT" if el.class_list().contains(CHECKBOX_CLASS) => NodeKind::Checkbox {
                checked: el
                    .dyn_ref::<web_sys::HtmlInputElement>()
                    .is_some_and(|i| i.checked()),
            },
            "SPAN" if el.class_list().contains(HANDLE_CLASS) => NodeKind::Handle,
            _ => NodeKind::Other,
        }
    }

    fn parent(&self, node: &DomNode) -> Option<DomNode> {
        node.el.parent_element().map(DomNode::of)
    }

    fn children(&self, node: &DomNode) -> Vec<DomNode> {
        let kids = node.el.children();
        (0..kids.length())
            .filter_map(|i| kids.item(i))
            .map(DomNode::of)
            .collect()
    }

    fn insert_before(
        &mut self,
        parent: &DomNode,
        node: &DomNode,
        reference: Option<&DomNode>,
    ) -> TaskListResult<()> {
        let reference = reference.map(|r| r.el.unchecked_ref::<web_sys::Node>());
        parent
            .el
            .insert_before(&node.el, reference)
            .map(|_| ())
            .map_err(TaskListError::dom)
    }

    fn set_marker(&mut self, node: &DomNode, marker: Marker, on: bool) {
        let _ = node
            .el
            .class_list()
            .toggle_with_force(marker.class_name(), on);
    }

    fn has_marker(&self, node: &DomNode, marker: Marker) -> bool {
        node.el.class_list().contains(marker.class_name())
    }

    fn set_draggable(&mut self, node: &DomNode, draggable: bool) {
        let value = if draggable { "true" } else { "false" };
        let _ = node.el.set_attribute("draggable", value);
    }

    fn is_draggable(&self, node: &DomNode) -> bool {
        node.el.get_attribute("draggable").as_deref() == Some("true")
    }

    fn attach_handle(&mut self, item: &DomNode) -> TaskListResult<DomNode> {
        let document = item
            .el
            .owner_document()
            .ok_or_else(|| TaskListError::Dom("item has no owner document".into()))?;
        let span = document
            .create_element("span")
            .map_err(TaskListError::dom)?;
        span.set_class_name(HANDLE_CLASS);
        span.set_inner_html(HANDLE_SVG);
        item.el
            .prepend_with_node_1(&span)
            .map_err(TaskListError::dom)?;
        Ok(DomNode::of(span))
    }

    fn set_checkbox_disabled(&mut self, checkbox: &DomNode, disabled: bool) {
        if let Some(input) = checkbox.el.dyn_ref::<web_sys::HtmlInputElement>() {
            input.set_disabled(disabled);
        }
    }
}

thread_local! {
    static COORDINATOR: DragCoordinator<DomTree> = DragCoordinator::new(SortOptions::from_window());
}

/// The page-wide drag coordinator every connected root shares.
pub fn coordinator() -> DragCoordinator<DomTree> {
    COORDINATOR.with(|c| c.clone())
}

/// An event listener removed from its target on drop.
struct Listener {
    target: web_sys::EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl Listener {
    fn new(
        target: &web_sys::EventTarget,
        event: &'static str,
        f: impl FnMut(web_sys::Event) + 'static,
    ) -> TaskListResult<Self> {
        let callback = Closure::<dyn FnMut(web_sys::Event)>::new(f);
        target
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .map_err(TaskListError::dom)?;
        Ok(Self {
            target: target.clone(),
            event,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}

struct Observer {
    observer: web_sys::MutationObserver,
    _callback: Closure<dyn FnMut(js_sys::Array, web_sys::MutationObserver)>,
}

impl Drop for Observer {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

pub type EventSink = Rc<dyn Fn(TaskListsEvent)>;

/// Queues events raised while the coordinator is borrowed and delivers them afterwards,
/// so listeners are free to call back into the host.
#[derive(Clone)]
struct Dispatcher {
    root: web_sys::Element,
    pending: Rc<RefCell<Vec<TaskListsEvent>>>,
    sink: Option<EventSink>,
}

impl Dispatcher {
    fn flush(&self) {
        let events: Vec<TaskListsEvent> = self.pending.borrow_mut().drain(..).collect();
        for event in events {
            if let Err(e) = self.dispatch(&event) {
                tracing::error!(error = %e, event = event.name(), "failed to dispatch task list event");
            }
            if let Some(sink) = &self.sink {
                sink(event);
            }
        }
    }

    fn dispatch(&self, event: &TaskListsEvent) -> TaskListResult<()> {
        let detail =
            js_sys::JSON::parse(&event.detail().to_string()).map_err(TaskListError::dom)?;
        let init = web_sys::CustomEventInit::new();
        init.set_bubbles(true);
        init.set_detail(&detail);
        let custom = web_sys::CustomEvent::new_with_event_init_dict(event.name(), &init)
            .map_err(TaskListError::dom)?;
        self.root
            .dispatch_event(&custom)
            .map(|_| ())
            .map_err(TaskListError::dom)
    }
}

/// Raises a contract violation as a JS exception. Callers release their borrows first.
fn raise(result: TaskListResult<()>, context: &str) {
    if let Err(e) = result {
        tracing::error!(error = %e, "{context}");
        wasm_bindgen::throw_str(&e.to_string());
    }
}

fn event_element(target: Option<web_sys::EventTarget>) -> Option<DomNode> {
    target
        .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
        .map(DomNode::of)
}

fn set_drop_effect(event: &web_sys::Event) {
    if let Some(dt) = event
        .dyn_ref::<web_sys::DragEvent>()
        .and_then(|e| e.data_transfer())
    {
        dt.set_drop_effect("move");
    }
}

fn apply_response(event: &web_sys::Event, response: DragResponse) {
    match response {
        DragResponse::Ignored => {}
        DragResponse::Started => {
            if let Some(dt) = event
                .dyn_ref::<web_sys::DragEvent>()
                .and_then(|e| e.data_transfer())
            {
                dt.set_effect_allowed("move");
                // Firefox refuses to start a drag without data.
                let _ = dt.set_data("text/plain", "");
            }
        }
        DragResponse::Accepted => {
            event.prevent_default();
            set_drop_effect(event);
        }
        DragResponse::Rejected => event.stop_propagation(),
        DragResponse::Dropped => {
            event.prevent_default();
            event.stop_propagation();
        }
    }
}

struct HostInner {
    root: DomNode,
    lists: TaskLists<DomTree>,
    dispatcher: Dispatcher,
    items: HashMap<DomNode, Vec<Listener>>,
}

impl HostInner {
    /// Disposes listeners of items that left the root.
    fn prune(&mut self) {
        let root = self.root.el.clone();
        let gone: Vec<DomNode> = self
            .items
            .keys()
            .filter(|item| !root.contains(Some(item.el.unchecked_ref())))
            .cloned()
            .collect();
        for item in gone {
            tracing::debug!(item = ?item, "task list item removed");
            self.items.remove(&item);
            self.lists.forget(&item);
        }
    }
}

/// Connects a grouping root element to the page-wide drag coordinator.
///
/// Dropping the host (or calling [`TaskListsHost::disconnect`]) removes every listener
/// and the mutation observer it installed.
pub struct TaskListsHost {
    inner: Rc<RefCell<HostInner>>,
    _observer: Observer,
    _listeners: Vec<Listener>,
}

impl TaskListsHost {
    pub fn connect(
        root: &web_sys::Element,
        config: TaskListsConfig,
        sink: Option<EventSink>,
    ) -> TaskListResult<Self> {
        let root_node = DomNode::of(root.clone());
        let dispatcher = Dispatcher {
            root: root.clone(),
            pending: Rc::default(),
            sink,
        };
        let pending = dispatcher.pending.clone();
        let lists = TaskLists::new(
            root_node.clone(),
            config,
            coordinator(),
            Rc::new(move |event| pending.borrow_mut().push(event)),
        );
        let inner = Rc::new(RefCell::new(HostInner {
            root: root_node,
            lists,
            dispatcher,
            items: HashMap::new(),
        }));

        let change = {
            let weak = Rc::downgrade(&inner);
            Listener::new(root, "change", move |event| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let Some(target) = event_element(event.target()) else {
                    return;
                };
                if !matches!(DomTree.kind(&target), NodeKind::Checkbox { .. }) {
                    return;
                }
                let (result, dispatcher) = {
                    let inner = inner.borrow();
                    (
                        inner.lists.check_toggled(&DomTree, &target).map(|_| ()),
                        inner.dispatcher.clone(),
                    )
                };
                dispatcher.flush();
                raise(result, "task list check failed");
            })?
        };

        let observer = {
            let weak = Rc::downgrade(&inner);
            let callback = Closure::<dyn FnMut(js_sys::Array, web_sys::MutationObserver)>::new(
                move |_records: js_sys::Array, _observer: web_sys::MutationObserver| {
                    if let Some(inner) = weak.upgrade() {
                        raise(sync(&inner), "task list sync failed");
                    }
                },
            );
            let observer = web_sys::MutationObserver::new(callback.as_ref().unchecked_ref())
                .map_err(TaskListError::dom)?;
            let init = web_sys::MutationObserverInit::new();
            init.set_child_list(true);
            init.set_subtree(true);
            observer
                .observe_with_options(root, &init)
                .map_err(TaskListError::dom)?;
            Observer {
                observer,
                _callback: callback,
            }
        };

        sync(&inner)?;
        tracing::debug!(root = ?inner.borrow().root, "task lists connected");

        Ok(Self {
            inner,
            _observer: observer,
            _listeners: vec![change],
        })
    }

    /// Initializes items added since the last sync and disposes removed ones.
    pub fn sync(&self) -> TaskListResult<()> {
        sync(&self.inner)
    }

    pub fn config(&self) -> TaskListsConfig {
        self.inner.borrow().lists.config()
    }

    pub fn set_disabled(&self, disabled: bool) {
        let mut inner = self.inner.borrow_mut();
        let root = inner.root.el.clone();
        let _ = if disabled {
            root.set_attribute("disabled", "")
        } else {
            root.remove_attribute("disabled")
        };
        inner.lists.set_disabled(&mut DomTree, disabled);
    }

    pub fn set_sortable(&self, sortable: bool) {
        let mut inner = self.inner.borrow_mut();
        let root = inner.root.el.clone();
        let _ = if sortable {
            root.set_attribute("sortable", "")
        } else {
            root.remove_attribute("sortable")
        };
        inner.lists.set_sortable(sortable);
    }

    pub fn disconnect(self) {
        drop(self);
    }
}

impl Drop for TaskListsHost {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.items.clear();
            inner.lists.release();
        }
    }
}

fn sync(inner: &Rc<RefCell<HostInner>>) -> TaskListResult<()> {
    let weak = Rc::downgrade(inner);
    let mut guard = inner.borrow_mut();
    guard.prune();
    let fresh = guard.lists.sync(&mut DomTree)?;
    for init in fresh {
        let listeners = item_listeners(&weak, &guard.dispatcher, &init)?;
        guard.items.insert(init.item, listeners);
    }
    Ok(())
}

fn item_listeners(
    host: &Weak<RefCell<HostInner>>,
    dispatcher: &Dispatcher,
    init: &Initialized<DomNode>,
) -> TaskListResult<Vec<Listener>> {
    let item: &web_sys::EventTarget = init.item.el.as_ref();
    let handle: &web_sys::EventTarget = init.handle.el.as_ref();
    let coordinator = coordinator();

    let drag = |name: &'static str,
                op: fn(&DragCoordinator<DomTree>, &web_sys::Event, &DomNode) -> TaskListResult<DragResponse>|
     -> TaskListResult<Listener> {
        let coordinator = coordinator.clone();
        let dispatcher = dispatcher.clone();
        Listener::new(item, name, move |event| {
            let Some(current) = event_element(event.current_target()) else {
                return;
            };
            let result = op(&coordinator, &event, &current);
            dispatcher.flush();
            match result {
                Ok(response) => apply_response(&event, response),
                Err(e) => raise(Err(e), "task list drag failed"),
            }
        })
    };

    let hover = |target: &web_sys::EventTarget,
                 name: &'static str,
                 op: fn(&TaskLists<DomTree>, &DomNode)|
     -> TaskListResult<Listener> {
        let host = host.clone();
        let item = init.item.clone();
        Listener::new(target, name, move |_event| {
            if let Some(inner) = host.upgrade() {
                op(&inner.borrow().lists, &item);
            }
        })
    };

    Ok(vec![
        drag("dragstart", |c, event, current| {
            match event_element(event.target()) {
                Some(target) => c.drag_start(&mut DomTree, current, &target),
                None => Ok(DragResponse::Ignored),
            }
        })?,
        drag("dragenter", |c, _, current| c.drag_enter(&mut DomTree, current))?,
        drag("dragover", |c, _, current| Ok(c.drag_over(&DomTree, current)))?,
        drag("drop", |c, _, current| c.drop(&mut DomTree, current))?,
        drag("dragend", |c, _, _| {
            c.drag_end(&mut DomTree).map(|_| DragResponse::Ignored)
        })?,
        hover(item, "mouseenter", |lists, item| {
            lists.item_pointer_enter(&mut DomTree, item)
        })?,
        hover(item, "mouseleave", |lists, item| {
            lists.item_pointer_leave(&mut DomTree, item)
        })?,
        hover(handle, "mouseenter", |lists, item| {
            lists.handle_pointer_enter(&mut DomTree, item)
        })?,
        hover(handle, "mouseleave", |lists, item| {
            lists.handle_pointer_leave(&mut DomTree, item)
        })?,
    ])
}
