use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl ListId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TaskId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,

    pub name: String,

    #[serde(default)]
    pub complete: bool,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Task {
    pub fn new(id: TaskId, name: String) -> Self {
        Self {
            id,
            name,
            complete: false,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: ListId,

    pub name: String,

    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TaskList {
    pub fn new(id: ListId, name: String) -> Self {
        Self {
            id,
            name,
            tasks: vec![],
            extra: BTreeMap::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.tasks.iter().filter(|task| !task.complete).count()
    }

    pub fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| &task.id == id)
    }
}

/// Names are accepted as typed; only empty or whitespace-only input is refused.
pub fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_payload_keeps_ids_and_unknown_fields() {
        let raw = r#"[{"id":"1612345678901","name":"Groceries","color":"green",
            "tasks":[{"id":"1612345679000","name":"Milk","complete":true,"note":"2%"}]}]"#;

        let lists: Vec<TaskList> = serde_json::from_str(raw).unwrap();
        assert_eq!(lists[0].id.as_str(), "1612345678901");
        assert_eq!(lists[0].extra["color"], "green");
        assert!(lists[0].tasks[0].complete);
        assert_eq!(lists[0].tasks[0].extra["note"], "2%");

        let again: Vec<TaskList> =
            serde_json::from_str(&serde_json::to_string(&lists).unwrap()).unwrap();
        assert_eq!(again, lists);
    }

    #[test]
    fn missing_complete_and_tasks_default() {
        let list: TaskList = serde_json::from_str(r#"{"id":"a","name":"Inbox"}"#).unwrap();
        assert!(list.tasks.is_empty());

        let task: Task = serde_json::from_str(r#"{"id":"t","name":"Call"}"#).unwrap();
        assert!(!task.complete);
    }

    #[test]
    fn remaining_counts_incomplete_only() {
        let mut list = TaskList::new("l".into(), "Chores".to_string());
        list.tasks.push(Task::new("a".into(), "Sweep".to_string()));
        list.tasks.push(Task::new("b".into(), "Mop".to_string()));
        list.tasks[0].complete = true;
        assert_eq!(list.remaining(), 1);
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(""));
        assert!(is_blank("  \t"));
        assert!(!is_blank(" x "));
    }
}
