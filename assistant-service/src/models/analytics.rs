//! Analytics query shapes and the parameter-bound query spec.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whitelisted analytics query shapes. The set is closed: anything the
/// guard cannot map onto one of these is rejected, never improvised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    OnTimeAirlines,
    AverageDelay,
    DayOfWeekDelays,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::OnTimeAirlines => "on_time_airlines",
            QueryType::AverageDelay => "average_delay",
            QueryType::DayOfWeekDelays => "day_of_week_delays",
        }
    }
}

/// Typed value bound as a query parameter. Never interpolated into SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Str(String),
    Int(i64),
}

/// A parameter-bound analytics query ready for the warehouse executor.
///
/// `filters` is keyed by warehouse column name; `validated` is set only
/// after both the deterministic schema check and the LLM verdict passed.
/// Executors refuse specs where it is false.
#[derive(Debug, Clone)]
pub struct AnalyticsQuerySpec {
    pub query_type: QueryType,
    pub filters: BTreeMap<String, FilterValue>,
    pub limit: i64,
    pub validated: bool,
}
