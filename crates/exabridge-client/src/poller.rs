//! Submit-then-wait protocol for asynchronous research tasks.
//!
//! The loop sleeps for a constant interval before every status read (including the first)
//! and stops at the first terminal status, when the deadline passes, or when the caller's
//! cancellation token fires. Provider task state is only ever read.

use exabridge_core::{
    CompletedTask, Error, PollOutcome, ResearchBackend, ResearchRequest, Result, TaskId,
    TaskSnapshot, TaskState, TaskStatus,
};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_POLL_DEADLINE: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub deadline: Duration,
    /// Consecutive transient status-read failures to tolerate before giving up.
    /// `0` fails on the first one.
    pub max_transient_failures: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_POLL_DEADLINE,
            max_transient_failures: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskPoller<B> {
    backend: B,
    policy: PollPolicy,
}

impl<B: ResearchBackend> TaskPoller<B> {
    pub fn new(backend: B, policy: PollPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub async fn submit(&self, req: &ResearchRequest) -> Result<TaskId> {
        self.backend.submit(req).await
    }

    /// A single status read, decoded exactly as one poll iteration would decode it.
    pub async fn check(&self, task_id: &TaskId) -> Result<TaskSnapshot> {
        self.backend.status(task_id).await
    }

    /// Polls until a terminal status, the deadline, or cancellation.
    ///
    /// Errors are reserved for transport failures (beyond the tolerated budget) and
    /// malformed completed results; `Failed`, `TimedOut` and `Canceled` are outcomes.
    pub async fn await_completion(
        &self,
        task_id: &TaskId,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome> {
        let started = Instant::now();
        let mut polls: u32 = 0;
        let mut consecutive_failures: u32 = 0;
        let mut last_status = TaskStatus::Pending;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(task_id = %task_id, polls, "research wait canceled");
                    return Ok(PollOutcome::Canceled { task_id: task_id.clone(), polls });
                }
                _ = tokio::time::sleep(self.policy.interval) => {}
            }

            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(task_id = %task_id, polls, "research wait canceled");
                    return Ok(PollOutcome::Canceled { task_id: task_id.clone(), polls });
                }
                r = self.backend.status(task_id) => r,
            };
            polls += 1;

            match read {
                Ok(snapshot) => {
                    consecutive_failures = 0;
                    let snapshot = match CompletedTask::from_snapshot(snapshot) {
                        Ok(task) => {
                            tracing::info!(task_id = %task_id, polls, "research task completed");
                            return Ok(PollOutcome::Completed(task));
                        }
                        Err(snapshot) => snapshot,
                    };
                    match snapshot.state {
                        TaskState::Failed(message) => {
                            tracing::info!(task_id = %task_id, polls, %message, "research task failed");
                            return Ok(PollOutcome::Failed {
                                task_id: snapshot.task_id,
                                message,
                            });
                        }
                        state => {
                            last_status = state.status();
                            tracing::debug!(task_id = %task_id, polls, status = %last_status, "research task not finished");
                        }
                    }
                }
                Err(e)
                    if e.is_transient()
                        && consecutive_failures < self.policy.max_transient_failures =>
                {
                    consecutive_failures += 1;
                    tracing::warn!(
                        task_id = %task_id,
                        polls,
                        consecutive_failures,
                        error = %e,
                        "research status read failed; tolerating"
                    );
                }
                Err(e) => return Err(e),
            }

            let elapsed = started.elapsed();
            if elapsed >= self.policy.deadline {
                tracing::info!(
                    task_id = %task_id,
                    polls,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "research wait deadline reached"
                );
                return Ok(PollOutcome::TimedOut {
                    task_id: task_id.clone(),
                    last_status,
                    elapsed,
                    polls,
                });
            }
        }
    }

    /// Submit followed by [`Self::await_completion`].
    ///
    /// The outer error means nothing was submitted. Once a task exists its id is always
    /// returned, next to the wait result, so a failed wait can still be resumed.
    /// The completed task's schema source and instructions come from the request.
    pub async fn submit_and_wait(
        &self,
        req: &ResearchRequest,
        cancel: &CancellationToken,
    ) -> Result<(TaskId, Result<PollOutcome>)> {
        let task_id = self.submit(req).await?;
        let waited = self
            .await_completion(&task_id, cancel)
            .await
            .map(|outcome| match outcome {
                PollOutcome::Completed(mut task) => {
                    task.schema_source = req.schema_source();
                    task.instructions = Some(req.query.trim().to_string());
                    PollOutcome::Completed(task)
                }
                other => other,
            });
        Ok((task_id, waited))
    }
}

/// Rejects policies that would spin or never poll.
pub fn validate_policy(policy: &PollPolicy) -> Result<()> {
    if policy.interval.is_zero() {
        return Err(Error::InvalidParams(
            "poll interval must be positive".to_string(),
        ));
    }
    if policy.deadline < policy.interval {
        return Err(Error::InvalidParams(format!(
            "poll deadline ({} ms) must be at least one poll interval ({} ms)",
            policy.deadline.as_millis(),
            policy.interval.as_millis()
        )));
    }
    Ok(())
}
