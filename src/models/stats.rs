//! Window statistics model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};

use crate::error::InvalidWindowError;

/// Trailing window sizes accepted by the stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowSize {
    OneMinute,
    FiveMinutes,
    OneHour,
    OneDay,
}

impl WindowSize {
    pub const ALL: [WindowSize; 4] = [
        WindowSize::OneMinute,
        WindowSize::FiveMinutes,
        WindowSize::OneHour,
        WindowSize::OneDay,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WindowSize::OneMinute => "1m",
            WindowSize::FiveMinutes => "5m",
            WindowSize::OneHour => "1h",
            WindowSize::OneDay => "24h",
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            WindowSize::OneMinute => Duration::seconds(60),
            WindowSize::FiveMinutes => Duration::seconds(300),
            WindowSize::OneHour => Duration::seconds(3600),
            WindowSize::OneDay => Duration::seconds(86400),
        }
    }
}

impl FromStr for WindowSize {
    type Err = InvalidWindowError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        WindowSize::ALL
            .into_iter()
            .find(|w| w.as_str() == token)
            .ok_or_else(|| InvalidWindowError(token.to_string()))
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for WindowSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Raw aggregate the store computes over `timestamp >= since`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowSummary {
    pub total: i64,
    pub anomalies: i64,
    /// Sum of non-null scores.
    pub score_sum: f64,
}

/// Derived statistics for one trailing window. Computed on demand, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct WindowStat {
    #[serde(rename = "window")]
    pub window_size: WindowSize,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub total_events: i64,
    pub anomaly_count: i64,
    pub anomaly_rate: f64,
    pub avg_score: f64,
}

impl WindowStat {
    pub fn from_summary(
        window_size: WindowSize,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        summary: WindowSummary,
    ) -> Self {
        let denom = summary.total.max(1) as f64;
        Self {
            window_size,
            window_start,
            window_end,
            total_events: summary.total,
            anomaly_count: summary.anomalies,
            anomaly_rate: summary.anomalies as f64 / denom,
            // Divides by all events, scored or not.
            avg_score: summary.score_sum / denom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_tokens() {
        assert_eq!("1m".parse::<WindowSize>().unwrap().duration(), Duration::seconds(60));
        assert_eq!("5m".parse::<WindowSize>().unwrap(), WindowSize::FiveMinutes);
        assert_eq!("1h".parse::<WindowSize>().unwrap().duration(), Duration::seconds(3600));
        assert_eq!("24h".parse::<WindowSize>().unwrap().duration(), Duration::seconds(86400));

        let err = "7d".parse::<WindowSize>().unwrap_err();
        assert_eq!(err.0, "7d");
        assert!("".parse::<WindowSize>().is_err());
        assert!("5M".parse::<WindowSize>().is_err());
    }

    #[test]
    fn test_empty_summary_yields_zeros() {
        let now = Utc::now();
        let stat = WindowStat::from_summary(
            WindowSize::FiveMinutes,
            now - WindowSize::FiveMinutes.duration(),
            now,
            WindowSummary::default(),
        );
        assert_eq!(stat.total_events, 0);
        assert_eq!(stat.anomaly_count, 0);
        assert_eq!(stat.anomaly_rate, 0.0);
        assert_eq!(stat.avg_score, 0.0);
    }

    #[test]
    fn test_avg_score_divides_by_total_events() {
        let now = Utc::now();
        let stat = WindowStat::from_summary(
            WindowSize::OneMinute,
            now,
            now,
            WindowSummary { total: 4, anomalies: 1, score_sum: 2.0 },
        );
        assert_eq!(stat.anomaly_rate, 0.25);
        assert_eq!(stat.avg_score, 0.5);
    }
}
