use serde::{Deserialize, Serialize};

/// Per grouping root settings, mirrored from the host element's attributes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskListsConfig {
    /// Items may be reordered by dragging their handle.
    #[serde(default)]
    pub sortable: bool,

    /// Checkboxes are read-only and drag affordances stay inert.
    #[serde(default)]
    pub disabled: bool,
}

impl Default for TaskListsConfig {
    fn default() -> Self {
        Self {
            sortable: true,
            disabled: false,
        }
    }
}

impl TaskListsConfig {
    /// Reads the boolean `sortable` and `disabled` attributes.
    pub fn from_element(el: &web_sys::Element) -> Self {
        Self {
            sortable: el.has_attribute("sortable"),
            disabled: el.has_attribute("disabled"),
        }
    }

    pub fn interactive(&self) -> bool {
        self.sortable && !self.disabled
    }
}

/// Drag coordinator options, shared by every grouping root on the page.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SortOptions {
    /// Report downward moves inside the origin list as the slot index before removal,
    /// i.e. one past the item's final index. Renderers that apply moves as "insert
    /// before the item currently at `dst`" need this; the default reports the final
    /// index.
    #[serde(default, rename = "countVacatedSlot")]
    pub count_vacated_slot: bool,
}

impl SortOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads `window.TASK_LISTS`, falling back to defaults.
    pub fn from_window() -> Self {
        if let Some(window) = web_sys::window() {
            if let Some(opts) = window.get("TASK_LISTS") {
                if !opts.is_undefined() && opts.is_object() {
                    if let Ok(v) = js_sys::Reflect::get(&opts, &"countVacatedSlot".into()) {
                        if let Some(count_vacated_slot) = v.as_bool() {
                            return Self { count_vacated_slot };
                        }
                    }
                }
            }
        }
        Self::default()
    }
}
