//! Credential-store capability trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CtlError;

/// Actions on the external credential store, keyed by username.
///
/// Every action returns the tool output on success. Callers treat failures
/// as non-fatal: state already committed to the traffic store stands.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Disable the account.
    async fn lock(&self, username: &str) -> Result<String, CtlError>;

    /// Re-enable the account.
    async fn unlock(&self, username: &str) -> Result<String, CtlError>;

    /// Terminate the user's live VPN session.
    async fn disconnect_session(&self, username: &str) -> Result<String, CtlError>;
}

#[async_trait]
impl<C: CredentialStore + ?Sized> CredentialStore for Arc<C> {
    #[inline]
    async fn lock(&self, username: &str) -> Result<String, CtlError> {
        (**self).lock(username).await
    }

    #[inline]
    async fn unlock(&self, username: &str) -> Result<String, CtlError> {
        (**self).unlock(username).await
    }

    #[inline]
    async fn disconnect_session(&self, username: &str) -> Result<String, CtlError> {
        (**self).disconnect_session(username).await
    }
}

#[async_trait]
impl<C: CredentialStore + ?Sized> CredentialStore for Box<C> {
    #[inline]
    async fn lock(&self, username: &str) -> Result<String, CtlError> {
        (**self).lock(username).await
    }

    #[inline]
    async fn unlock(&self, username: &str) -> Result<String, CtlError> {
        (**self).unlock(username).await
    }

    #[inline]
    async fn disconnect_session(&self, username: &str) -> Result<String, CtlError> {
        (**self).disconnect_session(username).await
    }
}
