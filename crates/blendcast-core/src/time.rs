//! Time primitives for the sampling pipeline
//!
//! Persisted artifacts are named by wall-clock time, so the pipeline
//! carries timestamps as seconds since the Unix epoch.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall-clock sample time, seconds since Unix epoch
#[derive(Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct SampleTime(f64);

impl SampleTime {
    pub const EPOCH: SampleTime = SampleTime(0.0);

    /// Current wall-clock time. A clock before the epoch reads as the epoch.
    pub fn now() -> Self {
        let since = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        SampleTime(since.as_secs_f64())
    }

    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        SampleTime(secs)
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        (self.0 * 1000.0) as i64
    }

    /// Rendering used in artifact file names (microsecond precision)
    pub fn file_stem(self) -> String {
        format!("{:.6}", self.0)
    }
}

impl std::ops::Add<Duration> for SampleTime {
    type Output = SampleTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        SampleTime(self.0 + rhs.as_secs_f64())
    }
}

impl fmt::Debug for SampleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t({:.6}s)", self.0)
    }
}

impl fmt::Display for SampleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem_precision() {
        let t = SampleTime::from_secs_f64(1_671_000_000.25);
        assert_eq!(t.file_stem(), "1671000000.250000");
    }

    #[test]
    fn test_now_after_epoch() {
        assert!(SampleTime::now() > SampleTime::EPOCH);
    }

    #[test]
    fn test_add_duration() {
        let t = SampleTime::from_secs_f64(10.0) + Duration::from_millis(500);
        assert_eq!(t.as_millis(), 10_500);
    }
}
