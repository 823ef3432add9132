//! Fan-out/fan-in over a set of independent tasks.
//!
//! Every task reports into one shared error collector with a fixed
//! capacity. Joining waits for all tasks, then turns whatever was collected
//! into a single failure. Beyond the capacity, errors are only counted.

use std::future::Future;
use tokio::task::JoinSet;

/// Why a task in the group did not produce a value.
#[derive(Debug)]
pub enum TaskFailure<E> {
    /// The task returned an error
    Failed(E),
    /// The task panicked or was aborted
    Panicked(String),
}

impl<E: std::fmt::Display> std::fmt::Display for TaskFailure<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskFailure::Failed(e) => write!(f, "{e}"),
            TaskFailure::Panicked(msg) => write!(f, "task panicked: {msg}"),
        }
    }
}

/// Combined failure of a group: the first collected errors plus a count.
#[derive(Debug)]
pub struct GroupError<T, E> {
    /// Outputs of the tasks that did succeed
    pub completed: Vec<T>,
    /// Collected failures, in completion order, at most the group capacity
    pub failures: Vec<TaskFailure<E>>,
    /// Number of tasks that failed
    pub total: usize,
    /// Number of tasks in the group
    pub tasks: usize,
}

impl<T, E: std::fmt::Display> std::fmt::Display for GroupError<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} of {} task(s) failed", self.total, self.tasks)?;
        if let Some(first) = self.failures.first() {
            write!(f, "; first: {first}")?;
        }
        Ok(())
    }
}

impl<T, E> std::error::Error for GroupError<T, E>
where
    T: std::fmt::Debug,
    E: std::fmt::Debug + std::fmt::Display,
{
}

/// A group of tasks joined together.
pub struct TaskGroup<T, E> {
    set: JoinSet<Result<T, E>>,
    max_errors: usize,
    spawned: usize,
}

impl<T, E> TaskGroup<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create a group that retains at most `max_errors` failures.
    pub fn new(max_errors: usize) -> Self {
        Self {
            set: JoinSet::new(),
            max_errors: max_errors.max(1),
            spawned: 0,
        }
    }

    /// Spawn an async task onto the runtime.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.spawned += 1;
        self.set.spawn(task);
    }

    /// Spawn a CPU-bound task on the blocking pool.
    pub fn spawn_blocking<F>(&mut self, task: F)
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        self.spawned += 1;
        self.set.spawn_blocking(task);
    }

    pub fn len(&self) -> usize {
        self.spawned
    }

    pub fn is_empty(&self) -> bool {
        self.spawned == 0
    }

    /// Wait for every task; succeed only if all of them did.
    ///
    /// Successful outputs are returned in completion order.
    pub async fn join(mut self) -> Result<Vec<T>, GroupError<T, E>> {
        let mut outputs = Vec::with_capacity(self.spawned);
        let mut failures = Vec::new();
        let mut total = 0usize;

        while let Some(joined) = self.set.join_next().await {
            let failure = match joined {
                Ok(Ok(output)) => {
                    outputs.push(output);
                    continue;
                }
                Ok(Err(e)) => TaskFailure::Failed(e),
                Err(join_error) => TaskFailure::Panicked(join_error.to_string()),
            };
            total += 1;
            if failures.len() < self.max_errors {
                failures.push(failure);
            }
        }

        if total == 0 {
            Ok(outputs)
        } else {
            Err(GroupError {
                completed: outputs,
                failures,
                total,
                tasks: self.spawned,
            })
        }
    }
}
