//! Checkable, drag-sortable Markdown task lists.
//!
//! The reorder engine ([`sortable`]) and the position model ([`position`]) work on any
//! [`tree::OutlineTree`]; [`dom`] binds them to the browser and [`components`] exposes a
//! Leptos component on top.

pub mod app;
pub mod components;
pub mod config;
pub mod dom;
pub mod error;
pub mod models;
pub mod position;
pub mod sortable;
pub mod task_lists;
pub mod tree;

pub use config::{SortOptions, TaskListsConfig};
pub use error::{TaskListError, TaskListResult};
pub use models::{CheckEvent, MoveEvent, MoveStartEvent, TaskListsEvent};
pub use position::{canonical_position, ListSnapshots, Position};
pub use sortable::{DragResponse, SortEnd, SortPosition, Sortable};
pub use task_lists::{DragCoordinator, TaskLists};

use crate::app::App;
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    mount_to_body(App);
}
