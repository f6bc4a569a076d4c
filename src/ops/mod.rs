//! Asynchronous operation tracker
//!
//! Parks a handle for work that outlives a single request/response cycle.
//! The caller gets an opaque hex token immediately; a background task runs
//! the work and records the terminal status for later polling.

use crate::error::Result;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

// =============================================================================
// Status
// =============================================================================

/// Current state of a tracked operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpStatus {
    /// Work accepted, not finished
    Pending,
    /// Work finished; holds the result location
    Completed(String),
    /// Work failed; holds the error detail
    Failed(String),
}

impl OpStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OpStatus::Pending)
    }
}

// =============================================================================
// Tracker
// =============================================================================

/// Token → status map for in-flight and finished operations.
///
/// Each token's transition is observed atomically; the only legal transition
/// is pending → terminal, and terminal states are never overwritten. Records
/// have no expiry: they live until consumed by a poll or process exit.
#[derive(Default)]
pub struct OpTracker {
    ops: DashMap<String, OpStatus>,
}

impl OpTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Accept a unit of work and return its polling token immediately.
    ///
    /// On success the work yields the location a client should be redirected
    /// to; on error the detail is captured on the token, never surfaced to
    /// the caller that enqueued it (they already disconnected).
    pub fn enqueue<F>(self: &Arc<Self>, work: F) -> String
    where
        F: Future<Output = Result<String>> + Send + 'static,
    {
        let token = Uuid::new_v4().simple().to_string();
        self.ops.insert(token.clone(), OpStatus::Pending);
        debug!("Queued operation {}", token);

        let tracker = Arc::clone(self);
        let work_token = token.clone();
        tokio::spawn(async move {
            let status = match work.await {
                Ok(location) => OpStatus::Completed(location),
                Err(e) => OpStatus::Failed(e.to_string()),
            };
            tracker.finish(&work_token, status);
        });

        token
    }

    /// Record the terminal status for a pending operation.
    ///
    /// A token that is already terminal is left untouched.
    fn finish(&self, token: &str, status: OpStatus) {
        debug_assert!(status.is_terminal());
        if let Some(mut entry) = self.ops.get_mut(token) {
            if !entry.is_terminal() {
                *entry.value_mut() = status;
            }
        }
    }

    /// Non-blocking status read; `None` for unknown tokens
    pub fn status(&self, token: &str) -> Option<OpStatus> {
        self.ops.get(token).map(|entry| entry.value().clone())
    }

    /// Remove a record if (and only if) it reached a terminal state
    pub fn consume(&self, token: &str) {
        self.ops.remove_if(token, |_, status| status.is_terminal());
    }

    /// Number of operations still pending
    pub fn pending_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|entry| !entry.value().is_terminal())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use std::time::Duration;

    async fn wait_terminal(tracker: &OpTracker, token: &str) -> OpStatus {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match tracker.status(token) {
                    Some(status) if status.is_terminal() => return status,
                    _ => tokio::time::sleep(Duration::from_millis(5)).await,
                }
            }
        })
        .await
        .expect("operation never reached a terminal state")
    }

    #[tokio::test]
    async fn test_pending_immediately_after_enqueue() {
        let tracker = OpTracker::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let token = tracker.enqueue(async move {
            let _ = rx.await;
            Ok("/volumes/abcd".to_string())
        });

        assert_eq!(tracker.status(&token), Some(OpStatus::Pending));

        tx.send(()).unwrap();
        let status = wait_terminal(&tracker, &token).await;
        assert_eq!(status, OpStatus::Completed("/volumes/abcd".to_string()));

        // Terminal state never reverts to pending
        assert_eq!(tracker.status(&token), Some(status));
    }

    #[tokio::test]
    async fn test_failure_is_captured_on_token() {
        let tracker = OpTracker::new();
        let token = tracker.enqueue(async {
            Err(Error::AllocationFailed("no devices".into()))
        });

        let status = wait_terminal(&tracker, &token).await;
        assert_matches!(status, OpStatus::Failed(ref detail) if detail.contains("no devices"));
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let tracker = OpTracker::new();
        assert_eq!(tracker.status("deadbeef"), None);
    }

    #[tokio::test]
    async fn test_terminal_is_never_overwritten() {
        let tracker = OpTracker::new();
        let token = tracker.enqueue(async { Ok("/queue/done".to_string()) });
        let first = wait_terminal(&tracker, &token).await;

        tracker.finish(&token, OpStatus::Failed("late worker".into()));
        assert_eq!(tracker.status(&token), Some(first));
    }

    #[tokio::test]
    async fn test_consume_only_removes_terminal() {
        let tracker = OpTracker::new();
        let (_tx, rx) = tokio::sync::oneshot::channel::<()>();
        let pending = tracker.enqueue(async move {
            let _ = rx.await;
            Ok(String::new())
        });

        tracker.consume(&pending);
        assert_eq!(tracker.status(&pending), Some(OpStatus::Pending));

        let done = tracker.enqueue(async { Ok("/x".to_string()) });
        wait_terminal(&tracker, &done).await;
        tracker.consume(&done);
        assert_eq!(tracker.status(&done), None);
    }

    #[tokio::test]
    async fn test_concurrent_enqueue_distinct_tokens() {
        let tracker = OpTracker::new();

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let tracker = Arc::clone(&tracker);
                tokio::spawn(async move {
                    tracker.enqueue(async move { Ok(format!("/queue/{}", i)) })
                })
            })
            .collect();

        let mut tokens = std::collections::HashSet::new();
        for handle in handles {
            let token = handle.await.unwrap();
            assert_eq!(token.len(), 32);
            assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
            assert!(tokens.insert(token), "token collision");
        }

        for token in &tokens {
            wait_terminal(&tracker, token).await;
        }
        assert_eq!(tracker.pending_count(), 0);
    }
}
