//! Wall-clock recurrence rules for the sweep triggers.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone};

/// Longest search horizon; any valid day of month recurs well within it.
const MAX_SEARCH_DAYS: u32 = 400;
/// Longest DST gap we roll forward over.
const MAX_GAP_MINUTES: i64 = 180;

/// When a job fires, in local wall-clock terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    /// Every day at `at`.
    Daily { at: NaiveTime },
    /// On each listed day of month at `at`. Days a month lacks are skipped.
    MonthDays { days: Vec<u32>, at: NaiveTime },
}

impl Recurrence {
    pub fn daily(at: NaiveTime) -> Self {
        Self::Daily { at }
    }

    pub fn month_days(days: impl Into<Vec<u32>>, at: NaiveTime) -> Self {
        Self::MonthDays {
            days: days.into(),
            at,
        }
    }

    fn at(&self) -> NaiveTime {
        match self {
            Self::Daily { at } | Self::MonthDays { at, .. } => *at,
        }
    }

    fn matches_day(&self, day: u32) -> bool {
        match self {
            Self::Daily { .. } => true,
            Self::MonthDays { days, .. } => days.contains(&day),
        }
    }

    /// First firing instant strictly after `after`, in `after`'s zone.
    ///
    /// A time that falls in a DST gap rolls forward to the first valid
    /// minute; an ambiguous time takes the earlier mapping. `None` if the
    /// rule never fires.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = after.timezone();
        let mut date = after.date_naive();
        for _ in 0..MAX_SEARCH_DAYS {
            if self.matches_day(date.day())
                && let Some(candidate) = resolve_local(&tz, date.and_time(self.at()))
                && candidate > *after
            {
                return Some(candidate);
            }
            date = date.succ_opt()?;
        }
        None
    }
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => (1..=MAX_GAP_MINUTES)
            .find_map(|m| tz.from_local_datetime(&(naive + Duration::minutes(m))).earliest()),
    }
}
