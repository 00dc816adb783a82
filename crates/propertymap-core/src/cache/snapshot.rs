use chrono::{DateTime, Duration, Utc};

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;

/// Cached data together with the time it was fetched.
#[derive(Debug, Clone)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.cached_at
    }

    /// Age rounded to the nearest whole unit, e.g. "5m ago", "2h ago", "3d ago".
    /// A timestamp in the future reads as "just now".
    pub fn age_display(&self) -> String {
        let rounded = |minutes: i64, unit: i64| (minutes + unit / 2) / unit;

        match self.age().num_minutes() {
            m if m < 1 => "just now".to_string(),
            m if m < MINUTES_PER_HOUR => format!("{}m ago", m),
            m if m < MINUTES_PER_DAY => format!("{}h ago", rounded(m, MINUTES_PER_HOUR)),
            m => format!("{}d ago", rounded(m, MINUTES_PER_DAY)),
        }
    }
}
