use std::sync::Arc;

use dashmap::DashMap;

use crate::TaskState;

/// Process-wide task registry. Clones share the same underlying map, so
/// handlers and background jobs all see one view of the world.
#[derive(Clone, Default)]
pub struct TaskStore {
    tasks: Arc<DashMap<String, TaskState>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, task: TaskState) {
        self.tasks.insert(task.task_id.clone(), task);
    }

    /// Snapshot of a task's current state.
    pub fn get(&self, task_id: &str) -> Option<TaskState> {
        self.tasks.get(task_id).map(|task| task.clone())
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks.contains_key(task_id)
    }

    /// Mutate a task in place while holding its shard lock. Returns false
    /// when the task does not exist.
    pub fn update<F>(&self, task_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut TaskState),
    {
        match self.tasks.get_mut(task_id) {
            Some(mut task) => {
                f(&mut task);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, task_id: &str) -> Option<TaskState> {
        self.tasks.remove(task_id).map(|(_, task)| task)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaskPhase;

    #[test]
    fn insert_and_get_round_trip() {
        let store = TaskStore::new();
        store.insert(TaskState::new("t1"));
        let task = store.get("t1").unwrap();
        assert_eq!(task.task_id, "t1");
        assert_eq!(task.status, TaskPhase::Pending);
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn update_mutates_existing_only() {
        let store = TaskStore::new();
        store.insert(TaskState::new("t1"));
        assert!(store.update("t1", |task| {
            task.status = TaskPhase::Processing;
            task.progress = 10;
        }));
        assert!(!store.update("missing", |task| task.progress = 50));
        let task = store.get("t1").unwrap();
        assert_eq!(task.status, TaskPhase::Processing);
        assert_eq!(task.progress, 10);
    }

    #[test]
    fn clones_share_state() {
        let store = TaskStore::new();
        let view = store.clone();
        store.insert(TaskState::new("t1"));
        assert!(view.contains("t1"));
        view.remove("t1");
        assert!(store.is_empty());
    }

    #[test]
    fn remove_returns_final_state() {
        let store = TaskStore::new();
        store.insert(TaskState::new("t1"));
        store.update("t1", |task| task.scheduled_for_deletion = true);
        let task = store.remove("t1").unwrap();
        assert!(task.scheduled_for_deletion);
        assert!(store.remove("t1").is_none());
    }
}
