//! Log-driven traffic accounting for ocserv.
//!
//! Raw ocserv log lines flow through [`extract`] into the
//! [`AccountingEngine`], which records a traffic sample per disconnect,
//! updates the user's counters and locks users whose quota is reached.
//!
//! ```
//! use ocserv_meter::{Extracted, extract};
//!
//! let line = "main[alice]:10.0.0.2 user disconnected (rx: 120, tx: 340)";
//! let Ok(Extracted::Disconnect(event)) = extract(line) else { panic!() };
//! assert_eq!((event.rx, event.tx), (120, 340));
//! ```

pub mod cli;
mod consumer;
mod engine;
mod error;
mod extract;
mod source;

pub use cli::{MeterArgs, run, run_with_shutdown};
pub use consumer::{MeterStats, consume};
pub use engine::{Accounted, AccountingEngine, month_window};
pub use error::MeterError;
pub use extract::{DisconnectEvent, Extracted, extract};
pub use source::{LogSource, pump_lines, spawn_source};
