//! Time discretisation for station×time cells.

use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Deterministic, total map from a timestamp to a bucket key.
pub trait TimeBucketer {
    fn bucket(&self, ts: &NaiveDateTime) -> String;
}

impl<F> TimeBucketer for F
where
    F: Fn(&NaiveDateTime) -> String,
{
    fn bucket(&self, ts: &NaiveDateTime) -> String {
        self(ts)
    }
}

/// Built-in bucketing granularities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    /// Calendar date, `2024-05-01`.
    #[default]
    Date,
    /// Calendar month, `2024-05`.
    Month,
    /// Hour of day, `07`.
    Hour,
    /// Day of week, `Mon`.
    Weekday,
    /// Day of week crossed with hour of day, `Mon-07`.
    WeekdayHour,
    /// `weekday` or `weekend`.
    DayType,
    /// Single bucket; collapses the time dimension.
    All,
}

/// Bucket key used when the time dimension is collapsed.
pub const ALL_BUCKET: &str = "all";

impl TimeBucketer for Granularity {
    fn bucket(&self, ts: &NaiveDateTime) -> String {
        match self {
            Self::Date => ts.format("%Y-%m-%d").to_string(),
            Self::Month => ts.format("%Y-%m").to_string(),
            Self::Hour => format!("{:02}", ts.hour()),
            Self::Weekday => ts.weekday().to_string(),
            Self::WeekdayHour => format!("{}-{:02}", ts.weekday(), ts.hour()),
            Self::DayType => {
                if matches!(ts.weekday(), Weekday::Sat | Weekday::Sun) {
                    "weekend".to_string()
                } else {
                    "weekday".to_string()
                }
            }
            Self::All => ALL_BUCKET.to_string(),
        }
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s.trim(), true)
    }
}
