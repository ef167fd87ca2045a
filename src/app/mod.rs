use crate::components::TaskLists;
use crate::models::{CheckEvent, MoveEvent, MoveStartEvent};
use leptos::logging::log;
use leptos::prelude::*;

/// Renderer output the demo page starts from.
const SAMPLE: &str = r#"
<ul class="contains-task-list">
  <li class="task-list-item"><input type="checkbox" class="task-list-item-checkbox"> Hubot</li>
  <li class="task-list-item"><input type="checkbox" class="task-list-item-checkbox"> Bender</li>
  <li class="task-list-item"><input type="checkbox" class="task-list-item-checkbox" checked> Vision</li>
</ul>
<ul class="contains-task-list">
  <li class="task-list-item"><input type="checkbox" class="task-list-item-checkbox"> BB-8</li>
  <li class="task-list-item"><input type="checkbox" class="task-list-item-checkbox"> WALL-E</li>
</ul>
<ol>
  <li>
    Nested
    <ul class="contains-task-list">
      <li class="task-list-item">
        <input type="checkbox" class="task-list-item-checkbox"> R2-D2
        <ul class="contains-task-list">
          <li class="task-list-item"><input type="checkbox" class="task-list-item-checkbox"> Baymax</li>
        </ul>
      </li>
    </ul>
  </li>
</ol>
"#;

#[component]
pub fn App() -> impl IntoView {
    let disabled = RwSignal::new(false);
    let last_event = RwSignal::new(String::from("none"));

    let on_check = Callback::new(move |e: CheckEvent| {
        log!("check {:?} -> {}", e.position, e.checked);
        last_event.set(format!("check {:?} checked={}", e.position, e.checked));
    });
    let on_move_start = Callback::new(move |e: MoveStartEvent| {
        log!("move start {:?}", e.src);
    });
    let on_move = Callback::new(move |e: MoveEvent| {
        log!("move {:?} -> {:?}", e.src, e.dst);
        last_event.set(format!("move {:?} -> {:?}", e.src, e.dst));
    });

    view! {
        <main class="px-4 py-8 text-sm">
            <label class="flex gap-2 items-center mb-4">
                <input
                    type="checkbox"
                    prop:checked=move || disabled.get()
                    on:change=move |_| disabled.update(|d| *d = !*d)
                />
                "Read only"
            </label>
            <TaskLists disabled=disabled on_check=on_check on_move_start=on_move_start on_move=on_move>
                <div inner_html=SAMPLE></div>
            </TaskLists>
            <p class="mt-4 text-xs text-muted-foreground">"Last event: " {move || last_event.get()}</p>
        </main>
    }
}
