//! Raw log line sources.

use std::borrow::Cow;
use std::process::Stdio;

use ocserv_config::MeterConfig;
use ocserv_core::ERROR_MALFORMED;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::MeterError;

/// Where raw ocserv log lines come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    Stdin,
    /// stdout of a follower command such as `journalctl -fu ocserv -o cat`.
    Command { program: String, args: Vec<String> },
}

impl LogSource {
    /// Build from the `[meter]` config section.
    pub fn from_config(config: &MeterConfig) -> Result<Self, MeterError> {
        match config.source.as_str() {
            "stdin" => Ok(Self::Stdin),
            "command" => {
                let (program, args) = config.command.split_first().ok_or_else(|| {
                    MeterError::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "meter.command is empty",
                    ))
                })?;
                Ok(Self::Command {
                    program: program.clone(),
                    args: args.to_vec(),
                })
            }
            other => Err(MeterError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("unknown meter source: {other}"),
            ))),
        }
    }
}

/// Spawn a task pushing lines from `source` into a bounded channel.
///
/// The task ends at end of input, when the receiver is dropped, or on
/// shutdown.
pub fn spawn_source(
    source: LogSource,
    capacity: usize,
    shutdown: CancellationToken,
) -> (mpsc::Receiver<String>, JoinHandle<Result<(), MeterError>>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(async move {
        match source {
            LogSource::Stdin => {
                info!("reading log lines from stdin");
                pump_lines(BufReader::new(tokio::io::stdin()), tx, shutdown).await
            }
            LogSource::Command { program, args } => {
                run_follower(&program, &args, tx, shutdown).await
            }
        }
    });
    (rx, handle)
}

async fn run_follower(
    program: &str,
    args: &[String],
    tx: mpsc::Sender<String>,
    shutdown: CancellationToken,
) -> Result<(), MeterError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()?;
    info!(program, ?args, "following log command");

    let Some(stdout) = child.stdout.take() else {
        return Err(MeterError::Io(std::io::Error::other(
            "follower stdout unavailable",
        )));
    };
    let result = pump_lines(BufReader::new(stdout), tx, shutdown).await;

    if child.id().is_some() {
        // still running: we stopped reading on shutdown or channel close
        let _ = child.start_kill();
    }
    match child.wait().await {
        Ok(status) => debug!(program, %status, "log command exited"),
        Err(e) => warn!(program, error = %e, "failed to reap log command"),
    }
    result
}

/// Forward lines from `reader` to `tx`.
///
/// Lines are split on `\n` with a trailing `\r` removed. Bytes that are not
/// valid UTF-8 are replaced so one garbled line never stops the feed.
pub async fn pump_lines<R>(
    mut reader: R,
    tx: mpsc::Sender<String>,
    shutdown: CancellationToken,
) -> Result<(), MeterError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        let read = tokio::select! {
            biased;

            _ = shutdown.cancelled() => return Ok(()),
            read = reader.read_until(b'\n', &mut buf) => read?,
        };
        if read == 0 {
            debug!("log source reached end of input");
            return Ok(());
        }

        let line = decode_line(&buf);
        if tx.send(line).await.is_err() {
            debug!("line receiver closed");
            return Ok(());
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    match String::from_utf8_lossy(raw) {
        Cow::Borrowed(line) => line.to_owned(),
        Cow::Owned(line) => {
            warn!(kind = ERROR_MALFORMED, line = %line, "log line is not valid UTF-8");
            line
        }
    }
}
