use crate::position::Position;
use serde::{Deserialize, Serialize};

pub const CHECK_EVENT: &str = "task-lists-check";
pub const MOVE_START_EVENT: &str = "task-lists-move-start";
pub const MOVE_EVENT: &str = "task-lists-move";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckEvent {
    pub position: Position,
    pub checked: bool,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveStartEvent {
    pub src: Position,
}

/// `src` and `dst` are `[list index, item index]` in the renderer's numbering.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveEvent {
    pub src: Position,
    pub dst: Position,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskListsEvent {
    Check(CheckEvent),
    MoveStart(MoveStartEvent),
    Move(MoveEvent),
}

impl TaskListsEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TaskListsEvent::Check(_) => CHECK_EVENT,
            TaskListsEvent::MoveStart(_) => MOVE_START_EVENT,
            TaskListsEvent::Move(_) => MOVE_EVENT,
        }
    }

    /// The JSON `detail` payload carried by the dispatched DOM event.
    pub fn detail(&self) -> serde_json::Value {
        let v = match self {
            TaskListsEvent::Check(e) => serde_json::to_value(e),
            TaskListsEvent::MoveStart(e) => serde_json::to_value(e),
            TaskListsEvent::Move(e) => serde_json::to_value(e),
        };
        v.unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_event_detail_contract() {
        let ev = TaskListsEvent::Move(MoveEvent {
            src: [0, 2],
            dst: [0, 0],
        });
        assert_eq!(ev.name(), "task-lists-move");
        assert_eq!(ev.detail(), serde_json::json!({"src": [0, 2], "dst": [0, 0]}));
    }

    #[test]
    fn test_check_event_detail_contract() {
        let ev = TaskListsEvent::Check(CheckEvent {
            position: [1, 1],
            checked: true,
        });
        assert_eq!(ev.name(), "task-lists-check");
        assert_eq!(
            ev.detail(),
            serde_json::json!({"position": [1, 1], "checked": true})
        );
    }
}
