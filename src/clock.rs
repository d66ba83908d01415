//! Wall-clock helpers for the configured monitoring time zone.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Zone used when the configured identifier cannot be resolved.
pub const FALLBACK_TIME_ZONE: Tz = chrono_tz::Asia::Kolkata;

/// Resolve an IANA zone identifier, falling back to [`FALLBACK_TIME_ZONE`].
pub fn resolve_time_zone(id: &str) -> Tz {
    match id.trim().parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            warn!(
                "Unknown time zone '{id}', falling back to {}",
                FALLBACK_TIME_ZONE.name()
            );
            FALLBACK_TIME_ZONE
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ZonedClock {
    tz: Tz,
}

impl ZonedClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn now(&self) -> DateTime<Tz> {
        self.to_zone(Utc::now())
    }

    pub fn to_zone(&self, utc: DateTime<Utc>) -> DateTime<Tz> {
        utc.with_timezone(&self.tz)
    }

    /// Today's date (in zone) combined with `time`.
    pub fn today_at(&self, time: NaiveTime) -> DateTime<Tz> {
        self.at(self.now().date_naive(), time)
    }

    /// Combine a zone-local date and time.
    ///
    /// Ambiguous local times resolve to the earlier instant; times that fall
    /// into a DST gap are pushed forward by an hour.
    pub fn at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
        let local = date.and_time(time);
        match self.tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => self
                .tz
                .from_local_datetime(&(local + chrono::Duration::hours(1)))
                .earliest()
                .unwrap_or_else(|| self.tz.from_utc_datetime(&local)),
        }
    }
}
