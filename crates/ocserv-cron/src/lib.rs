//! Crash-recoverable sweep scheduler for ocserv users.
//!
//! Two jobs run on wall-clock triggers: a daily expiry sweep that locks
//! users past their deadline, and a monthly reset on days 1 and 2 that
//! unlocks monthly-quota users. Last-run dates persist in a flat file so a
//! restart across a trigger time replays the missed run at startup.

mod batch;
pub mod cli;
mod error;
mod jobs;
mod recurrence;
mod scheduler;
mod state;

pub use batch::{BatchExecutor, BatchReport};
pub use cli::{CronArgs, build_scheduler, catch_up_once, run, run_with_shutdown};
pub use error::CronError;
pub use jobs::{ItemError, Job, SweepJobs};
pub use recurrence::Recurrence;
pub use scheduler::{CatchUpReport, JobPhase, Schedule, Scheduler};
pub use state::{NEVER, RunState, RunStateFile};
