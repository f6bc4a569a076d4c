//! Remote execution backends
//!
//! An executor runs operational commands against a managed storage node and
//! returns structured output. The backend kind is resolved once at startup
//! from the configuration and is immutable for the process lifetime.

pub mod mock;
pub mod ssh;

pub use mock::MockExecutor;
pub use ssh::SshExecutor;

use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Port for running commands on a target host
#[async_trait]
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run `commands` in order on `host`, returning one output per command.
    ///
    /// The first failing command aborts the batch.
    async fn execute(&self, host: &str, commands: &[String]) -> Result<Vec<String>>;
}

pub type ExecutorRef = Arc<dyn Executor>;

/// Resolve the execution backend from the configured kind.
///
/// The kind set is closed: anything other than "mock", "ssh", or the empty
/// default is startup-fatal.
pub fn create(config: &Config) -> Result<ExecutorRef> {
    let executor: ExecutorRef = match config.executor.as_str() {
        "mock" => Arc::new(MockExecutor::new()),
        "ssh" | "" => Arc::new(SshExecutor::new(&config.ssh)),
        other => {
            return Err(Error::UnknownExecutor {
                kind: other.to_string(),
            })
        }
    };

    info!(
        "Loaded {} executor",
        if config.executor.is_empty() { "ssh" } else { &config.executor }
    );
    Ok(executor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock() {
        let config = Config {
            executor: "mock".into(),
            ..Default::default()
        };
        assert!(create(&config).is_ok());
    }

    #[test]
    fn test_create_ssh_default() {
        // Empty kind falls back to the ssh executor
        let config = Config::default();
        assert!(create(&config).is_ok());

        let config = Config {
            executor: "ssh".into(),
            ..Default::default()
        };
        assert!(create(&config).is_ok());
    }

    #[test]
    fn test_create_unknown_is_fatal() {
        let config = Config {
            executor: "telnet".into(),
            ..Default::default()
        };
        let err = create(&config).unwrap_err();
        assert!(matches!(err, Error::UnknownExecutor { ref kind } if kind == "telnet"));
        assert!(err.is_startup_fatal());
    }
}
