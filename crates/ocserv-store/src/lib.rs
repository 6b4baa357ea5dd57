//! Traffic and user store for ocserv-quota.
//!
//! The [`UserStore`] trait is the single data-access seam shared by the
//! log-driven accounting engine and the scheduled sweeps.
//!
//! # Example
//!
//! ```
//! use ocserv_store::{MemoryStore, User, UserStore};
//!
//! # async fn example() -> Result<(), ocserv_store::StoreError> {
//! let store = MemoryStore::from_users([User::new(1, "alice")]);
//! let user = store.find_user("alice").await?;
//! assert!(user.is_some());
//! # Ok(())
//! # }
//! ```

mod error;
mod memory;
mod model;
pub mod sql;
mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use model::{CounterUpdate, TrafficSample, TrafficTotals, TrafficType, User};
pub use traits::UserStore;
