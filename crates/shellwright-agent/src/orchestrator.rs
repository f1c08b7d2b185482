//! Concurrent fan-out over independent tasks.

use std::fmt::Display;
use std::future::Future;

use futures_util::future::join_all;

/// A unit of work with a caller-assigned identity.
#[derive(Debug, Clone)]
pub struct Task<T> {
    pub id: String,
    pub payload: T,
}

impl<T> Task<T> {
    pub fn new(id: impl Into<String>, payload: T) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub task_id: String,
    pub output: String,
    pub error: Option<String>,
}

impl TaskResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Run every task concurrently and wait for all of them.
///
/// Results come back in input order. A failing task fills only its own
/// slot; siblings are neither cancelled nor affected.
pub async fn run_parallel<T, F, Fut, E>(tasks: Vec<Task<T>>, execute: F) -> Vec<TaskResult>
where
    F: Fn(Task<T>) -> Fut,
    Fut: Future<Output = Result<String, E>>,
    E: Display,
{
    let runs = tasks.into_iter().map(|task| {
        let task_id = task.id.clone();
        let fut = execute(task);
        async move {
            match fut.await {
                Ok(output) => TaskResult {
                    task_id,
                    output,
                    error: None,
                },
                Err(e) => TaskResult {
                    task_id,
                    output: String::new(),
                    error: Some(e.to_string()),
                },
            }
        }
    });
    join_all(runs).await
}
