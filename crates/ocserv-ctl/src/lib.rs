//! Credential-store actions for ocserv-quota.
//!
//! [`CredentialStore`] abstracts the three account actions the quota
//! pipeline needs. [`CommandCredentials`] runs the ocserv tools;
//! [`RecordingCredentials`] records calls for tests.

mod command;
mod error;
mod recording;
mod traits;

pub use command::{CommandCredentials, CommandCredentialsConfig};
pub use error::CtlError;
pub use recording::{Action, RecordingCredentials};
pub use traits::CredentialStore;
