use chrono::{DateTime, Duration, Local, TimeZone, Utc};

use crate::models::{WaitlistEntry, WaitlistStats};

fn week() -> Duration {
    Duration::days(7)
}

impl WaitlistStats {
    /// `today` starts at local midnight of `now`, `this_week` covers the trailing 7×24 hours.
    pub fn compute<Tz: TimeZone>(entries: &[WaitlistEntry], now: DateTime<Tz>) -> Self {
        let now_utc = now.with_timezone(&Utc);
        let week_ago = now_utc - week();
        let start_of_day = start_of_day(&now).unwrap_or(now_utc - Duration::days(1));

        entries.iter().fold(Self::default(), |mut stats, entry| {
            stats.total += 1;
            if entry.timestamp >= start_of_day {
                stats.today += 1;
            }
            if entry.timestamp >= week_ago {
                stats.this_week += 1;
            }
            stats
        })
    }

    pub fn now(entries: &[WaitlistEntry]) -> Self {
        Self::compute(entries, Local::now())
    }
}

/// First existing local hour of the day. Midnight can be skipped by a DST jump.
fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
    let date = now.date_naive();

    (0..24).find_map(|hour| {
        date.and_hms_opt(hour, 0, 0)?
            .and_local_timezone(now.timezone())
            .earliest()
            .map(|start| start.with_timezone(&Utc))
    })
}
