//! Credential backend that shells out to `ocpasswd` and `occtl`.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use ocserv_config::CredentialsConfig;
use ocserv_core::{
    DEFAULT_ACTION_TIMEOUT_SECS, DEFAULT_OCCTL_BIN, DEFAULT_OCPASSWD_BIN, DEFAULT_PASSWD_FILE,
};
use tokio::process::Command;
use tracing::debug;

use crate::error::CtlError;
use crate::traits::CredentialStore;

/// Paths and limits for [`CommandCredentials`].
#[derive(Debug, Clone)]
pub struct CommandCredentialsConfig {
    /// `ocpasswd` executable.
    pub ocpasswd: String,
    /// Password file passed to `ocpasswd -c`.
    pub passwd_file: String,
    /// `occtl` executable.
    pub occtl: String,
    /// Per-invocation limit; the child is killed when it is exceeded.
    pub timeout: Duration,
}

impl Default for CommandCredentialsConfig {
    fn default() -> Self {
        Self {
            ocpasswd: DEFAULT_OCPASSWD_BIN.to_string(),
            passwd_file: DEFAULT_PASSWD_FILE.to_string(),
            occtl: DEFAULT_OCCTL_BIN.to_string(),
            timeout: Duration::from_secs(DEFAULT_ACTION_TIMEOUT_SECS),
        }
    }
}

impl CommandCredentialsConfig {
    /// Build from the `[credentials]` config section.
    pub fn from_config(config: &CredentialsConfig) -> Self {
        Self {
            ocpasswd: config.ocpasswd.clone(),
            passwd_file: config.passwd_file.clone(),
            occtl: config.occtl.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// [`CredentialStore`] backed by the ocserv command-line tools.
///
/// - lock: `ocpasswd -l -c <passwd_file> <username>`
/// - unlock: `ocpasswd -u -c <passwd_file> <username>`
/// - disconnect: `occtl disconnect user <username>`
#[derive(Debug, Clone, Default)]
pub struct CommandCredentials {
    config: CommandCredentialsConfig,
}

impl CommandCredentials {
    pub fn new(config: CommandCredentialsConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &CommandCredentialsConfig {
        &self.config
    }

    async fn ocpasswd(&self, flag: &str, username: &str) -> Result<String, CtlError> {
        run_command(
            &self.config.ocpasswd,
            &[flag, "-c", &self.config.passwd_file, username],
            self.config.timeout,
        )
        .await
    }
}

#[async_trait]
impl CredentialStore for CommandCredentials {
    async fn lock(&self, username: &str) -> Result<String, CtlError> {
        self.ocpasswd("-l", username).await
    }

    async fn unlock(&self, username: &str) -> Result<String, CtlError> {
        self.ocpasswd("-u", username).await
    }

    async fn disconnect_session(&self, username: &str) -> Result<String, CtlError> {
        run_command(
            &self.config.occtl,
            &["disconnect", "user", username],
            self.config.timeout,
        )
        .await
    }
}

/// Run `program args..` to completion within `limit`.
///
/// Returns trimmed combined stdout/stderr. The child is killed if the
/// future is dropped on timeout.
pub(crate) async fn run_command(
    program: &str,
    args: &[&str],
    limit: Duration,
) -> Result<String, CtlError> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CtlError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| CtlError::Spawn {
            program: program.to_string(),
            source,
        })?,
        Err(_) => {
            return Err(CtlError::Timeout {
                program: program.to_string(),
                secs: limit.as_secs(),
            });
        }
    };

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    let text = text.trim().to_string();

    if output.status.success() {
        debug!(program, ?args, "credential command succeeded");
        Ok(text)
    } else {
        Err(CtlError::Failed {
            program: program.to_string(),
            code: output.status.code(),
            output: text,
        })
    }
}
