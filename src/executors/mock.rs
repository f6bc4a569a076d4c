//! In-memory executor
//!
//! Deterministic stand-in for the remote transport: every command succeeds
//! with empty output, and the full command log is kept for inspection.

use super::Executor;
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Executor that records commands instead of running them
#[derive(Debug, Default)]
pub struct MockExecutor {
    log: Mutex<Vec<(String, String)>>,
    /// Commands containing this substring fail the batch
    fail_on: Option<String>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make any command containing `pattern` fail, for error-path tests
    pub fn failing_on(pattern: impl Into<String>) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            fail_on: Some(pattern.into()),
        }
    }

    /// (host, command) pairs seen so far, in execution order
    pub fn commands(&self) -> Vec<(String, String)> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(&self, host: &str, commands: &[String]) -> Result<Vec<String>> {
        let mut outputs = Vec::with_capacity(commands.len());
        for command in commands {
            if let Some(pattern) = &self.fail_on {
                if command.contains(pattern.as_str()) {
                    return Err(Error::ExecutionFailed {
                        host: host.to_string(),
                        reason: format!("mock failure for: {}", command),
                    });
                }
            }
            self.log.lock().push((host.to_string(), command.clone()));
            outputs.push(String::new());
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_commands_in_order() {
        let exec = MockExecutor::new();
        let cmds = vec!["vgcreate vg0 /dev/sdb".to_string(), "vgs".to_string()];

        let outputs = exec.execute("node1", &cmds).await.unwrap();
        assert_eq!(outputs.len(), 2);

        let log = exec.commands();
        assert_eq!(log[0], ("node1".to_string(), cmds[0].clone()));
        assert_eq!(log[1], ("node1".to_string(), cmds[1].clone()));
    }

    #[tokio::test]
    async fn test_failure_aborts_batch() {
        let exec = MockExecutor::failing_on("lvcreate");
        let cmds = vec!["vgs".to_string(), "lvcreate lv0".to_string()];

        let err = exec.execute("node1", &cmds).await.unwrap_err();
        assert!(matches!(err, Error::ExecutionFailed { .. }));
        // Only the command before the failure was run
        assert_eq!(exec.commands().len(), 1);
    }
}
