//! Timer loop and startup catch-up for the sweep jobs.

use std::collections::HashMap;

use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use ocserv_config::{ConfigError, SchedulerConfig};
use ocserv_core::{ERROR_STATE, ERROR_STORE, MONTHLY_RESET_DAYS};
use ocserv_ctl::CredentialStore;
use ocserv_store::UserStore;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::batch::BatchReport;
use crate::error::CronError;
use crate::jobs::{Job, SweepJobs};
use crate::recurrence::Recurrence;
use crate::state::RunStateFile;

/// Trigger rules for both jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub daily: Recurrence,
    pub monthly: Recurrence,
}

impl Schedule {
    pub fn new(daily_at: NaiveTime, monthly_at: NaiveTime) -> Self {
        Self {
            daily: Recurrence::daily(daily_at),
            monthly: Recurrence::month_days(MONTHLY_RESET_DAYS, monthly_at),
        }
    }

    /// Build from the `[scheduler]` config section.
    pub fn from_config(config: &SchedulerConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.daily_time()?, config.monthly_time()?))
    }

    pub fn rule(&self, job: Job) -> &Recurrence {
        match job {
            Job::Daily => &self.daily,
            Job::Monthly => &self.monthly,
        }
    }

    /// Earliest next firing after `after` and every job firing at it.
    pub fn next_fire<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<(DateTime<Tz>, Vec<Job>)> {
        let mut next: Option<(DateTime<Tz>, Vec<Job>)> = None;
        for job in [Job::Daily, Job::Monthly] {
            let Some(at) = self.rule(job).next_after(after) else {
                continue;
            };
            let earlier = next.as_ref().is_none_or(|(best, _)| at < *best);
            if earlier {
                next = Some((at, vec![job]));
            } else if let Some((best, jobs)) = &mut next
                && at == *best
            {
                jobs.push(job);
            }
        }
        next
    }
}

/// Lifecycle of one job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JobPhase {
    #[default]
    Idle,
    Due,
    Running,
}

/// Jobs executed by one catch-up check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatchUpReport {
    pub daily: Option<BatchReport>,
    pub monthly: Option<BatchReport>,
    /// Jobs that were due but whose selection failed.
    pub failed: Vec<Job>,
}

impl CatchUpReport {
    /// Number of job bodies that ran.
    pub fn runs(&self) -> usize {
        usize::from(self.daily.is_some()) + usize::from(self.monthly.is_some())
    }
}

/// Owns the sweep jobs, their triggers and the run-state file.
pub struct Scheduler<S, C> {
    jobs: SweepJobs<S, C>,
    state: RunStateFile,
    schedule: Schedule,
    phases: Mutex<HashMap<Job, JobPhase>>,
}

impl<S, C> Scheduler<S, C>
where
    S: UserStore + 'static,
    C: CredentialStore + 'static,
{
    pub fn new(jobs: SweepJobs<S, C>, state: RunStateFile, schedule: Schedule) -> Self {
        Self {
            jobs,
            state,
            schedule,
            phases: Mutex::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn state_file(&self) -> &RunStateFile {
        &self.state
    }

    pub fn phase(&self, job: Job) -> JobPhase {
        self.phases.lock().get(&job).copied().unwrap_or_default()
    }

    fn set_phase(&self, job: Job, phase: JobPhase) {
        self.phases.lock().insert(job, phase);
    }

    /// Run `job` now and stamp it on success.
    ///
    /// The run date is the UTC date of `now`. A failed selection leaves the
    /// state untouched so the next check retries.
    pub async fn run_job(&self, job: Job, now: DateTime<Utc>) -> Result<BatchReport, CronError> {
        self.set_phase(job, JobPhase::Running);
        let result = self.jobs.run(job, now).await;
        self.set_phase(job, JobPhase::Idle);

        let report = result?;
        self.state.stamp(job, now.date_naive()).await?;
        Ok(report)
    }

    /// Run every job that missed its trigger while the process was down.
    pub async fn catch_up(&self) -> Result<CatchUpReport, CronError> {
        self.catch_up_at(Utc::now()).await
    }

    /// [`catch_up`](Self::catch_up) as of `now`.
    ///
    /// Selection failures are logged and recorded in the report; state
    /// file failures are returned.
    pub async fn catch_up_at(&self, now: DateTime<Utc>) -> Result<CatchUpReport, CronError> {
        let today = now.date_naive();
        let mut report = CatchUpReport::default();

        for job in [Job::Daily, Job::Monthly] {
            let state = self.state.load().await?;
            let last_run = state.last_run(job);
            if !state.is_due(job, today) {
                debug!(job = %job, %last_run, "no catch-up needed");
                continue;
            }

            info!(job = %job, %last_run, "running missed job");
            self.set_phase(job, JobPhase::Due);
            match self.run_job(job, now).await {
                Ok(batch) => match job {
                    Job::Daily => report.daily = Some(batch),
                    Job::Monthly => report.monthly = Some(batch),
                },
                Err(CronError::Store(e)) => {
                    error!(job = %job, kind = ERROR_STORE, error = %e, "catch-up run failed");
                    report.failed.push(job);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Catch up, then fire jobs on their triggers until `shutdown`.
    ///
    /// Shutdown is observed only while waiting; a running job always
    /// completes first.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), CronError> {
        self.catch_up().await?;

        let mut cursor = Local::now();
        loop {
            let now = Local::now().max(cursor);
            let Some((at, due)) = self.schedule.next_fire(&now) else {
                info!("no future triggers, scheduler stopping");
                return Ok(());
            };
            let wait = (at - Local::now()).to_std().unwrap_or_default();
            debug!(next = %at, jobs = ?due, wait_secs = wait.as_secs(), "waiting for trigger");

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("scheduler shutting down");
                    return Ok(());
                }

                _ = tokio::time::sleep(wait) => {}
            }
            cursor = at;

            for job in due {
                self.set_phase(job, JobPhase::Due);
                match self.run_job(job, Utc::now()).await {
                    Ok(_) => {}
                    Err(CronError::StateFile(e)) => {
                        error!(job = %job, kind = ERROR_STATE, error = %e, "failed to stamp run state");
                    }
                    Err(e) => {
                        error!(job = %job, kind = ERROR_STORE, error = %e, "scheduled run failed");
                    }
                }
            }
        }
    }
}
