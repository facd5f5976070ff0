//! In-memory task store
//!
//! The store is the single source of truth for keyword task state and the
//! result set of the latest successful crawl of each keyword. Every operation
//! runs inside one store-wide lock, so check-and-set on enqueue is atomic with
//! respect to the scheduler.

use crate::crawler::Record;
use crate::state::task_state::{Task, TaskStatus};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    /// Tasks in first-insertion order
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
    results: HashMap<String, Vec<Record>>,
}

impl Inner {
    fn task_mut(&mut self, keyword: &str) -> Option<&mut Task> {
        let position = *self.index.get(keyword)?;
        self.tasks.get_mut(position)
    }
}

/// Keywords partitioned by an enqueue call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueueOutcome {
    /// Keywords that are now pending
    pub created: Vec<String>,
    /// Keywords left untouched because they were already pending or running
    pub skipped: Vec<String>,
}

/// Mutex-guarded keyword task table plus result sets
#[derive(Default)]
pub struct TaskStore {
    inner: Mutex<Inner>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues keywords for crawling
    ///
    /// A keyword whose task is pending or running is skipped. Any other keyword
    /// gets a fresh pending task (or its terminal task is reset to pending).
    pub async fn add(&self, keywords: &[String], limit: usize) -> EnqueueOutcome {
        let mut outcome = EnqueueOutcome::default();
        let mut inner = self.inner.lock().await;

        for keyword in keywords {
            if let Some(task) = inner.task_mut(keyword) {
                if task.status.is_active() {
                    outcome.skipped.push(keyword.clone());
                    continue;
                }
                task.reset(limit);
            } else {
                let position = inner.tasks.len();
                inner.tasks.push(Task::new(keyword.clone(), limit));
                inner.index.insert(keyword.clone(), position);
            }
            outcome.created.push(keyword.clone());
        }

        outcome
    }

    /// Returns up to `max_count` pending tasks in insertion order without claiming them
    pub async fn take_pending(&self, max_count: usize) -> Vec<Task> {
        let inner = self.inner.lock().await;
        inner
            .tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Pending)
            .take(max_count)
            .cloned()
            .collect()
    }

    pub async fn mark_running(&self, keyword: &str) {
        self.transition(keyword, TaskStatus::Running, None).await;
    }

    /// Marks the task successful and stores (or replaces) its result set
    pub async fn mark_success(&self, keyword: &str, records: Vec<Record>) {
        let mut inner = self.inner.lock().await;
        match inner.task_mut(keyword) {
            Some(task) => {
                task.transition(TaskStatus::Success, None);
                inner.results.insert(keyword.to_string(), records);
            }
            None => tracing::debug!("mark_success for unknown keyword {}", keyword),
        }
    }

    pub async fn mark_failed(&self, keyword: &str, error: impl Into<String>) {
        self.transition(keyword, TaskStatus::Failed, Some(error.into()))
            .await;
    }

    async fn transition(&self, keyword: &str, status: TaskStatus, error: Option<String>) {
        let mut inner = self.inner.lock().await;
        match inner.task_mut(keyword) {
            Some(task) => task.transition(status, error),
            None => tracing::debug!("{} transition for unknown keyword {}", status, keyword),
        }
    }

    /// Returns the latest successful result set for a keyword
    pub async fn result_of(&self, keyword: &str) -> Option<Vec<Record>> {
        self.inner.lock().await.results.get(keyword).cloned()
    }

    /// Returns the task for a keyword
    pub async fn get(&self, keyword: &str) -> Option<Task> {
        let inner = self.inner.lock().await;
        let position = *inner.index.get(keyword)?;
        inner.tasks.get(position).cloned()
    }

    /// Returns all tasks in insertion order
    pub async fn snapshot(&self) -> Vec<Task> {
        self.inner.lock().await.tasks.clone()
    }
}
