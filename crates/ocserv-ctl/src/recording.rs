//! Credential backend that records calls instead of running tools.

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::CtlError;
use crate::traits::CredentialStore;

/// Credential action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Lock,
    Unlock,
    Disconnect,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct Inner {
    calls: Vec<(Action, String)>,
    failures: HashSet<(Action, String)>,
}

/// [`CredentialStore`] test double.
///
/// Every call is recorded, including the ones configured to fail.
#[derive(Debug, Default)]
pub struct RecordingCredentials {
    inner: Mutex<Inner>,
}

impl RecordingCredentials {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `action` fail for `username`.
    pub fn fail_on(&self, action: Action, username: impl Into<String>) {
        self.inner.lock().failures.insert((action, username.into()));
    }

    /// All recorded calls in call order.
    pub fn calls(&self) -> Vec<(Action, String)> {
        self.inner.lock().calls.clone()
    }

    /// Usernames `action` was invoked for, in call order.
    pub fn calls_for(&self, action: Action) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|(a, _)| *a == action)
            .map(|(_, u)| u.clone())
            .collect()
    }

    fn record(&self, action: Action, username: &str) -> Result<String, CtlError> {
        let mut inner = self.inner.lock();
        inner.calls.push((action, username.to_string()));
        if inner.failures.contains(&(action, username.to_string())) {
            return Err(CtlError::Failed {
                program: action.to_string(),
                code: Some(1),
                output: format!("{action} rejected for {username}"),
            });
        }
        Ok(String::new())
    }
}

#[async_trait]
impl CredentialStore for RecordingCredentials {
    async fn lock(&self, username: &str) -> Result<String, CtlError> {
        self.record(Action::Lock, username)
    }

    async fn unlock(&self, username: &str) -> Result<String, CtlError> {
        self.record(Action::Unlock, username)
    }

    async fn disconnect_session(&self, username: &str) -> Result<String, CtlError> {
        self.record(Action::Disconnect, username)
    }
}
