use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A trimmed, non-empty place name as sent to the weather provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlaceQuery(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("place name must not be empty")]
pub struct EmptyPlace;

impl PlaceQuery {
    /// Trim `input` and wrap it, rejecting empty or whitespace-only input.
    pub fn parse(input: &str) -> Result<Self, EmptyPlace> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EmptyPlace);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PlaceQuery {
    type Error = EmptyPlace;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PlaceQuery> for String {
    fn from(value: PlaceQuery) -> Self {
        value.0
    }
}

/// Current conditions for a place. This is also the persisted snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub location_name: String,
    pub condition: String,
    pub temperature_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
}

impl CurrentConditions {
    /// Temperature rounded for display; the stored value keeps its precision.
    pub fn rounded_temperature(&self) -> i64 {
        self.temperature_c.round() as i64
    }
}

/// One forecast sample, in the provider's local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub timestamp: NaiveDateTime,
    pub temperature_c: f64,
    pub condition: String,
}

impl ForecastEntry {
    pub fn rounded_temperature(&self) -> i64 {
        self.temperature_c.round() as i64
    }

    /// Short day label, e.g. "15 Oct".
    pub fn day_label(&self) -> String {
        self.timestamp.format("%-d %b").to_string()
    }
}

/// Observable outcome of a search.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Found {
        conditions: CurrentConditions,
        forecast: Vec<ForecastEntry>,
    },
    NotFound,
    Pending,
}

impl QueryResult {
    pub fn is_found(&self) -> bool {
        matches!(self, QueryResult::Found { .. })
    }
}

/// The whole observable state of a search session.
///
/// `result == None` is the untouched placeholder shown before any search (and
/// after the input is cleared).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub result: Option<QueryResult>,
    pub has_searched: bool,
    pub(crate) generation: u64,
}

impl ViewState {
    pub fn is_untouched(&self) -> bool {
        self.result.is_none()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.result, Some(QueryResult::Pending))
    }
}
