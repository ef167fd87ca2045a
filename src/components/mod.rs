pub mod task_lists;

pub use task_lists::TaskLists;
