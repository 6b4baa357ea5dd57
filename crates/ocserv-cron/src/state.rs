//! Persisted last-run dates for the sweep jobs.
//!
//! The file holds two lines, `daily_last_run=<YYYY-MM-DD|0>` and
//! `monthly_last_run=<YYYY-MM-DD|0>`, where `0` means never. Writes are
//! atomic (tmp + rename) and serialized by one mutex.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use ocserv_core::{ERROR_STATE, MONTHLY_RESET_DAYS};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::CronError;
use crate::jobs::Job;

const DATE_FORMAT: &str = "%Y-%m-%d";
const NEVER_TOKEN: &str = "0";
const DAILY_KEY: &str = "daily_last_run";
const MONTHLY_KEY: &str = "monthly_last_run";

/// Sentinel for a job that never ran.
pub const NEVER: NaiveDate = NaiveDate::MIN;

/// Last successful run date of each job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunState {
    pub daily_last_run: NaiveDate,
    pub monthly_last_run: NaiveDate,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            daily_last_run: NEVER,
            monthly_last_run: NEVER,
        }
    }
}

fn parse_date(key: &str, value: &str) -> NaiveDate {
    let value = value.trim();
    if value == NEVER_TOKEN || value.is_empty() {
        return NEVER;
    }
    match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => date,
        Err(e) => {
            warn!(key, value, kind = ERROR_STATE, error = %e, "unparseable run date, treating as never");
            NEVER
        }
    }
}

fn format_date(date: NaiveDate) -> String {
    if date == NEVER {
        NEVER_TOKEN.to_string()
    } else {
        date.format(DATE_FORMAT).to_string()
    }
}

impl RunState {
    /// Parse the file contents. Unknown lines are ignored.
    pub fn parse(text: &str) -> Self {
        let mut state = Self::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim() {
                DAILY_KEY => state.daily_last_run = parse_date(DAILY_KEY, value),
                MONTHLY_KEY => state.monthly_last_run = parse_date(MONTHLY_KEY, value),
                _ => {}
            }
        }
        state
    }

    pub fn render(&self) -> String {
        format!(
            "{DAILY_KEY}={}\n{MONTHLY_KEY}={}\n",
            format_date(self.daily_last_run),
            format_date(self.monthly_last_run)
        )
    }

    pub fn last_run(&self, job: Job) -> NaiveDate {
        match job {
            Job::Daily => self.daily_last_run,
            Job::Monthly => self.monthly_last_run,
        }
    }

    /// Record a run on `today`; never moves a date backwards.
    pub fn stamp(&mut self, job: Job, today: NaiveDate) {
        let slot = match job {
            Job::Daily => &mut self.daily_last_run,
            Job::Monthly => &mut self.monthly_last_run,
        };
        *slot = (*slot).max(today);
    }

    /// Whether a catch-up run of `job` is owed on `today`.
    pub fn is_due(&self, job: Job, today: NaiveDate) -> bool {
        match job {
            Job::Daily => self.daily_last_run < today,
            Job::Monthly => {
                let last = self.monthly_last_run;
                let ran_this_month = last != NEVER
                    && last.year() == today.year()
                    && last.month() == today.month();
                !ran_this_month && MONTHLY_RESET_DAYS.contains(&today.day())
            }
        }
    }
}

/// Mutex-guarded run-state file.
#[derive(Debug)]
pub struct RunStateFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl RunStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state, creating the file with `0`/`0` if absent.
    pub async fn load(&self) -> Result<RunState, CronError> {
        let _guard = self.lock.lock().await;
        self.load_locked().await
    }

    /// Stamp `job` as run on `today` and persist.
    pub async fn stamp(&self, job: Job, today: NaiveDate) -> Result<RunState, CronError> {
        let _guard = self.lock.lock().await;
        let mut state = self.load_locked().await?;
        state.stamp(job, today);
        self.write_locked(&state).await?;
        debug!(job = %job, date = %today, "run state stamped");
        Ok(state)
    }

    async fn load_locked(&self) -> Result<RunState, CronError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(RunState::parse(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let state = RunState::default();
                self.write_locked(&state).await?;
                debug!(path = %self.path.display(), "created run state file");
                Ok(state)
            }
            Err(e) => Err(CronError::StateFile(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn write_locked(&self, state: &RunState) -> Result<(), CronError> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| CronError::StateFile(format!("failed to create state dir: {e}")))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, state.render().as_bytes())
            .await
            .map_err(|e| CronError::StateFile(format!("failed to write tmp state: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| CronError::StateFile(format!("failed to rename state file: {e}")))?;
        Ok(())
    }
}
