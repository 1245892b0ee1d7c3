use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Time window over which views are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PopularityPeriod {
    Day,
    Week,
    Month,
    Year,
    AllTime,
}

impl PopularityPeriod {
    pub const ALL: [PopularityPeriod; 5] = [
        PopularityPeriod::Day,
        PopularityPeriod::Week,
        PopularityPeriod::Month,
        PopularityPeriod::Year,
        PopularityPeriod::AllTime,
    ];

    /// Window length in days, `None` for all-time.
    pub fn window_days(&self) -> Option<i64> {
        match self {
            PopularityPeriod::Day => Some(1),
            PopularityPeriod::Week => Some(7),
            PopularityPeriod::Month => Some(30),
            PopularityPeriod::Year => Some(365),
            PopularityPeriod::AllTime => None,
        }
    }

    /// Inclusive `(from, to)` unix-second bounds ending at `now`.
    pub fn window_at(&self, now: i64) -> Option<(i64, i64)> {
        self.window_days()
            .map(|days| (now.saturating_sub(days * SECONDS_PER_DAY), now))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PopularityPeriod::Day => "day",
            PopularityPeriod::Week => "week",
            PopularityPeriod::Month => "month",
            PopularityPeriod::Year => "year",
            PopularityPeriod::AllTime => "allTime",
        }
    }
}

impl fmt::Display for PopularityPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PopularityPeriod {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PopularityPeriod::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                CatalogError::validation(format!(
                    "Unknown period '{}', expected one of day, week, month, year, allTime",
                    s
                ))
            })
    }
}
