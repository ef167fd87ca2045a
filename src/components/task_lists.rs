use leptos::html;
use leptos::prelude::*;
use std::rc::Rc;

use crate::config::TaskListsConfig;
use crate::dom::TaskListsHost;
use crate::models::{CheckEvent, MoveEvent, MoveStartEvent, TaskListsEvent};

/* ========================================================== */
/*                     ✨ FUNCTIONS ✨                        */
/* ========================================================== */

/// Wraps rendered Markdown task lists and makes them checkable and sortable.
///
/// The children are expected to be renderer output: `ul.contains-task-list` lists of
/// `li.task-list-item` items with `input.task-list-item-checkbox` checkboxes. Besides the
/// callbacks, every change is dispatched as a bubbling `task-lists-*` DOM event.
#[component]
pub fn TaskLists(
    children: Children,
    #[prop(into, optional)] class: String,
    /// Items can be reordered by dragging their handle.
    #[prop(default = true)]
    sortable: bool,
    #[prop(into, default = Signal::stored(false))] disabled: Signal<bool>,
    #[prop(optional)] on_check: Option<Callback<CheckEvent>>,
    #[prop(optional)] on_move_start: Option<Callback<MoveStartEvent>>,
    #[prop(optional)] on_move: Option<Callback<MoveEvent>>,
) -> impl IntoView {
    let root_ref: NodeRef<html::Div> = NodeRef::new();
    let host: StoredValue<Option<TaskListsHost>, LocalStorage> = StoredValue::new_local(None);

    Effect::new(move |_| {
        let disabled = disabled.get();
        let Some(root) = root_ref.get() else {
            return;
        };
        host.update_value(|slot| {
            if let Some(h) = slot {
                h.set_disabled(disabled);
                return;
            }
            let config = TaskListsConfig { sortable, disabled };
            let sink: Rc<dyn Fn(TaskListsEvent)> = Rc::new(move |event: TaskListsEvent| match event {
                TaskListsEvent::Check(e) => {
                    if let Some(cb) = on_check {
                        cb.run(e);
                    }
                }
                TaskListsEvent::MoveStart(e) => {
                    if let Some(cb) = on_move_start {
                        cb.run(e);
                    }
                }
                TaskListsEvent::Move(e) => {
                    if let Some(cb) = on_move {
                        cb.run(e);
                    }
                }
            });
            match TaskListsHost::connect(&root, config, Some(sink)) {
                Ok(h) => {
                    h.set_sortable(sortable);
                    *slot = Some(h);
                }
                Err(e) => tracing::error!(error = %e, "failed to connect task lists"),
            }
        });
    });

    on_cleanup(move || {
        host.update_value(|slot| {
            if let Some(h) = slot.take() {
                h.disconnect();
            }
        });
    });

    view! {
        <div
            node_ref=root_ref
            class=class
            data-task-lists=""
        >
            {children()}
        </div>
    }
    .attr("disabled", move || disabled.get().then_some(""))
}
