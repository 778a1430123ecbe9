//! Reduction of the provider's 3-hour forecast to one sample per day.

use chrono::{NaiveTime, Timelike};

use crate::model::ForecastEntry;

/// Keep only samples taken at exactly 12:00:00 local time, in their original order.
pub fn daily_noon(samples: Vec<ForecastEntry>) -> Vec<ForecastEntry> {
    samples.into_iter().filter(|s| is_noon(s.timestamp.time())).collect()
}

fn is_noon(time: NaiveTime) -> bool {
    time.hour() == 12 && time.minute() == 0 && time.second() == 0 && time.nanosecond() == 0
}
