//! Event-driven waits for integration tests

use progressive_lookup::{Event, JobId};
use std::time::Duration;
use tokio::sync::broadcast::Receiver;

/// How a job run ended, as seen on the event channel
#[derive(Debug, PartialEq)]
pub enum WaitResult {
    /// Every task terminal
    Completed { loaded: usize, failed: usize },
    /// Run cancelled with tasks left pending
    Cancelled { pending: usize },
    /// Timeout waiting for the job
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Subscribe first, then start the job, then call this with the receiver
pub async fn wait_for_job_end(
    events: &mut Receiver<Event>,
    job_id: JobId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::JobCompleted {
                    job_id: id,
                    loaded,
                    failed,
                    ..
                }) if id == job_id => return WaitResult::Completed { loaded, failed },
                Ok(Event::JobCancelled { job_id: id, pending }) if id == job_id => {
                    return WaitResult::Cancelled { pending };
                }
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}
