/// Contract violations raised by the reorder engine and the position model.
///
/// Every variant means the host handed over a tree that does not have the shape the
/// task list markup promises. None of them is recoverable by retrying the gesture.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TaskListError {
    #[error("task-lists grouping root not found")]
    MissingGroupingRoot,

    #[error("list item has no parent list")]
    DetachedItem,

    #[error("node is not a list item")]
    NotAnItem,

    #[error("node is not a task list checkbox")]
    NotACheckbox,

    #[error("list item is not part of its top-level list")]
    ItemNotInList,

    #[error("list is not part of the drag snapshot")]
    ListNotInSnapshot,

    #[error("no list snapshot was taken for this grouping root")]
    SnapshotMissing,

    #[error("list slot {slot} is out of range")]
    SlotOutOfRange { slot: usize },

    #[error("cannot move a node inside its own subtree")]
    CyclicInsert,

    #[error("insertion reference is not a child of the target parent")]
    ForeignReference,

    #[error("node no longer exists")]
    StaleNode,

    #[error("dom operation failed: {0}")]
    Dom(String),
}

pub type TaskListResult<T> = Result<T, TaskListError>;

impl TaskListError {
    pub(crate) fn dom(e: impl std::fmt::Debug) -> Self {
        Self::Dom(format!("{e:?}"))
    }
}
