use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimestampMs(pub i64);

impl TimestampMs {
    pub fn plus_secs(self, secs: u64) -> Self {
        let delta = i64::try_from(secs.saturating_mul(1_000)).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(delta))
    }

    pub fn secs_until(self, later: TimestampMs) -> u64 {
        u64::try_from((later.0 - self.0).max(0) / 1_000).unwrap_or(0)
    }

    pub fn to_datetime(self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.0)
            .unwrap_or_else(|| DateTime::<Utc>::from(std::time::UNIX_EPOCH))
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> TimestampMs;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimestampMs {
        TimestampMs(Utc::now().timestamp_millis())
    }
}
