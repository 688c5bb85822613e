use crate::types::{Task, TaskId, TaskStatus};
use agora_core::{AgoraError, AgoraResult};
use chrono::Utc;
use std::collections::{HashMap, HashSet};

/// The hub's task table with a reverse dependency index.
///
/// Tasks are never removed. `dependents` maps a task id to the tasks that
/// list it as a dependency, so completing a task only re-checks its direct
/// dependents instead of scanning the whole table. A dependency id may refer
/// to a task that has not been inserted yet.
pub struct TaskTable {
    tasks: HashMap<TaskId, Task>,
    order: Vec<TaskId>,
    dependents: HashMap<TaskId, Vec<TaskId>>,
}

impl TaskTable {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            order: Vec::new(),
            dependents: HashMap::new(),
        }
    }

    /// Insert a new task. Ids must be unique.
    pub fn insert(&mut self, task: Task) -> AgoraResult<TaskId> {
        if self.tasks.contains_key(&task.id) {
            return Err(AgoraError::DuplicateTask(task.id));
        }
        let id = task.id.clone();
        for dep in &task.dependencies {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .push(id.clone());
        }
        self.order.push(id.clone());
        self.tasks.insert(id.clone(), task);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// First id in `batch` that is already stored or repeated within the batch.
    pub fn first_conflict(&self, batch: &[Task]) -> Option<TaskId> {
        let mut seen = HashSet::new();
        batch
            .iter()
            .find(|t| self.tasks.contains_key(&t.id) || !seen.insert(t.id.as_str()))
            .map(|t| t.id.clone())
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.tasks.get(id).is_some_and(Task::is_completed)
    }

    /// A task is ready when it is pending and every dependency is completed.
    pub fn is_ready(&self, id: &str) -> bool {
        self.tasks
            .get(id)
            .is_some_and(|t| t.is_ready(|dep| self.is_completed(dep)))
    }

    /// All ready tasks, in insertion order.
    pub fn all_ready(&self) -> Vec<TaskId> {
        self.order
            .iter()
            .filter(|id| self.is_ready(id))
            .cloned()
            .collect()
    }

    /// Direct dependents of `id` that are now ready.
    pub fn ready_dependents(&self, id: &str) -> Vec<TaskId> {
        self.dependents
            .get(id)
            .map(|deps| {
                deps.iter()
                    .filter(|d| self.is_ready(d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mark a pending task as in progress. Returns false if the task is not
    /// ready, which keeps the dependency invariant in one place.
    pub fn mark_in_progress(&mut self, id: &str) -> bool {
        if !self.is_ready(id) {
            return false;
        }
        if let Some(task) = self.tasks.get_mut(id) {
            task.status = TaskStatus::InProgress;
            true
        } else {
            false
        }
    }

    pub fn mark_completed(&mut self, id: &str, result: serde_json::Value) -> bool {
        if let Some(task) = self.tasks.get_mut(id) {
            task.status = TaskStatus::Completed;
            task.result = Some(result);
            task.completed_at = Some(Utc::now());
            true
        } else {
            false
        }
    }

    pub fn mark_blocked(&mut self, id: &str, reason: String) -> bool {
        if let Some(task) = self.tasks.get_mut(id) {
            task.status = TaskStatus::Blocked { reason };
            true
        } else {
            false
        }
    }

    /// List all tasks in insertion order.
    pub fn all_tasks(&self) -> Vec<&Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id)).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.count(|s| *s == TaskStatus::Pending)
    }

    pub fn in_progress_count(&self) -> usize {
        self.count(|s| *s == TaskStatus::InProgress)
    }

    pub fn completed_count(&self) -> usize {
        self.count(|s| *s == TaskStatus::Completed)
    }

    pub fn blocked_count(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Blocked { .. }))
    }

    pub fn total_count(&self) -> usize {
        self.tasks.len()
    }

    fn count<F: Fn(&TaskStatus) -> bool>(&self, f: F) -> usize {
        self.tasks.values().filter(|t| f(&t.status)).count()
    }

    /// Check if every task has completed.
    pub fn is_done(&self) -> bool {
        self.tasks.values().all(Task::is_completed)
    }

    /// Dependency ids that do not resolve to any task in the table.
    pub fn missing_dependencies(&self) -> Vec<(TaskId, TaskId)> {
        self.all_tasks()
            .into_iter()
            .flat_map(|t| {
                t.dependencies
                    .iter()
                    .filter(|d| !self.tasks.contains_key(*d))
                    .map(|d| (t.id.clone(), d.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Check for cycles in the dependency graph.
    /// Returns the id of a task on a cycle, if any.
    pub fn find_cycle(&self) -> Option<TaskId> {
        let mut visited = HashMap::new();
        self.order
            .iter()
            .find(|id| self.dfs_cycle(id, &mut visited))
            .cloned()
    }

    fn dfs_cycle(&self, id: &str, visited: &mut HashMap<TaskId, u8>) -> bool {
        match visited.get(id) {
            Some(1) => return true,  // back edge = cycle
            Some(2) => return false, // already processed
            _ => {}
        }
        visited.insert(id.to_string(), 1);
        if let Some(task) = self.tasks.get(id) {
            for dep in &task.dependencies {
                if self.dfs_cycle(dep, visited) {
                    return true;
                }
            }
        }
        visited.insert(id.to_string(), 2);
        false
    }
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn task(id: &str, deps: &[&str]) -> Task {
        Task::new("test", format!("Task {id}"), "a1")
            .with_id(id)
            .with_dependencies(deps.iter().copied())
    }

    #[test]
    fn test_empty_table() {
        let table = TaskTable::new();
        assert_eq!(table.total_count(), 0);
        assert!(table.is_done());
        assert!(table.all_ready().is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut table = TaskTable::new();
        table.insert(task("T1", &[])).unwrap();
        let err = table.insert(task("T1", &[])).unwrap_err();
        assert!(matches!(err, AgoraError::DuplicateTask(id) if id == "T1"));
    }

    #[test]
    fn test_dependency_chain() {
        let mut table = TaskTable::new();
        table.insert(task("spec", &[])).unwrap();
        table.insert(task("code", &["spec"])).unwrap();
        table.insert(task("test", &["code"])).unwrap();
        table.insert(task("review", &["code", "test"])).unwrap();

        assert_eq!(table.all_ready(), vec!["spec"]);
        assert!(!table.mark_in_progress("code"));

        assert!(table.mark_in_progress("spec"));
        table.mark_completed("spec", serde_json::Value::Null);
        assert_eq!(table.ready_dependents("spec"), vec!["code"]);

        table.mark_in_progress("code");
        table.mark_completed("code", serde_json::Value::Null);
        // review still waits on test
        assert_eq!(table.ready_dependents("code"), vec!["test"]);

        table.mark_in_progress("test");
        table.mark_completed("test", serde_json::Value::Null);
        assert_eq!(table.ready_dependents("test"), vec!["review"]);
    }

    #[test]
    fn test_fan_in_waits_for_all() {
        let mut table = TaskTable::new();
        for id in ["a", "b", "c"] {
            table.insert(task(id, &[])).unwrap();
        }
        table.insert(task("join", &["a", "b", "c"])).unwrap();

        for id in ["a", "b"] {
            table.mark_in_progress(id);
            table.mark_completed(id, serde_json::Value::Null);
            assert!(table.ready_dependents(id).is_empty());
        }
        table.mark_in_progress("c");
        table.mark_completed("c", serde_json::Value::Null);
        assert_eq!(table.ready_dependents("c"), vec!["join"]);
    }

    #[test]
    fn test_first_conflict() {
        let mut table = TaskTable::new();
        table.insert(task("T1", &[])).unwrap();
        let batch = vec![task("N1", &[]), task("T1", &[]), task("N1", &[])];
        assert_eq!(table.first_conflict(&batch), Some("T1".to_string()));
        let repeated = vec![task("N2", &[]), task("N2", &[])];
        assert_eq!(table.first_conflict(&repeated), Some("N2".to_string()));
        assert_eq!(table.first_conflict(&[task("N3", &[])]), None);
    }

    #[test]
    fn test_mark_blocked() {
        let mut table = TaskTable::new();
        table.insert(task("T1", &[])).unwrap();
        table.mark_blocked("T1", "worker crashed".into());
        assert!(table.get("T1").unwrap().is_blocked());
        assert_eq!(table.blocked_count(), 1);
        assert!(!table.is_done());
    }

    #[test]
    fn test_missing_dependencies() {
        let mut table = TaskTable::new();
        table.insert(task("T2", &["T1", "ghost"])).unwrap();
        table.insert(task("T1", &[])).unwrap();
        assert_eq!(
            table.missing_dependencies(),
            vec![("T2".to_string(), "ghost".to_string())]
        );
    }

    #[test]
    fn test_no_cycle() {
        let mut table = TaskTable::new();
        table.insert(task("A", &[])).unwrap();
        table.insert(task("B", &["A"])).unwrap();
        assert!(table.find_cycle().is_none());
    }

    #[test]
    fn test_cycle_detection() {
        let mut table = TaskTable::new();
        table.insert(task("A", &["B"])).unwrap();
        table.insert(task("B", &["A"])).unwrap();
        assert!(table.find_cycle().is_some());
    }
}
