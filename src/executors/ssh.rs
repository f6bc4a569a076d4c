//! SSH executor
//!
//! Runs commands on storage nodes through the system ssh client. Credential
//! and reachability validation is the transport's concern; this executor only
//! shapes the invocation and surfaces failures.

use super::Executor;
use crate::config::SshConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Executor that shells out to ssh for each command
#[derive(Debug)]
pub struct SshExecutor {
    user: String,
    keyfile: String,
    port: u16,
    sudo: bool,
}

impl SshExecutor {
    pub fn new(config: &SshConfig) -> Self {
        Self {
            user: config.user.clone(),
            keyfile: config.keyfile.clone(),
            port: config.port,
            sudo: config.sudo,
        }
    }

    fn build_command(&self, host: &str, remote: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-o")
            .arg("BatchMode=yes")
            .arg("-p")
            .arg(self.port.to_string());
        if !self.keyfile.is_empty() {
            cmd.arg("-i").arg(&self.keyfile);
        }
        cmd.arg(format!("{}@{}", self.user, host));
        if self.sudo {
            cmd.arg(format!("sudo {}", remote));
        } else {
            cmd.arg(remote);
        }
        cmd
    }
}

#[async_trait]
impl Executor for SshExecutor {
    async fn execute(&self, host: &str, commands: &[String]) -> Result<Vec<String>> {
        let mut outputs = Vec::with_capacity(commands.len());

        for command in commands {
            debug!("ssh {}: {}", host, command);

            let output = self
                .build_command(host, command)
                .output()
                .await
                .map_err(|e| Error::ExecutionFailed {
                    host: host.to_string(),
                    reason: format!("unable to spawn ssh: {}", e),
                })?;

            if !output.status.success() {
                return Err(Error::ExecutionFailed {
                    host: host.to_string(),
                    reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }

            outputs.push(String::from_utf8_lossy(&output.stdout).to_string());
        }

        Ok(outputs)
    }
}
