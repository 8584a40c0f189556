use chrono::{DateTime, NaiveDateTime, Utc};

/// Source of the wall-clock instant stamped into artifact names.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// UTC time of the host. Local time repeats an hour when daylight saving
/// ends, which would give two cycles the same artifact name.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    fn stamp(at: DateTime<Utc>) -> NaiveDateTime {
        at.naive_utc()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Self::stamp(Utc::now())
    }
}
