//! Intent classification and query normalization types.

use serde::Deserialize;

/// Classified purpose of a user query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    FlightStatus,
    FlightAnalytics,
    Unknown,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::FlightStatus => "flight_status",
            IntentKind::FlightAnalytics => "flight_analytics",
            IntentKind::Unknown => "unknown",
        }
    }
}

/// Which routing stage produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceSource {
    Rule,
    Llm,
}

/// Slot values extracted from a single query. Deserializable so the LLM
/// classifier can return them as structured JSON.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Slots {
    pub flight_number: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub airline: Option<String>,
    pub year: Option<i64>,
    pub limit: Option<i64>,
}

impl Slots {
    pub fn is_empty(&self) -> bool {
        self.flight_number.is_none()
            && self.origin.is_none()
            && self.destination.is_none()
            && self.airline.is_none()
            && self.year.is_none()
            && self.limit.is_none()
    }
}

/// Outcome of intent classification. Immutable once produced; consumed by
/// the normalizer.
#[derive(Debug, Clone)]
pub struct RoutedIntent {
    pub kind: IntentKind,
    pub confidence_source: ConfidenceSource,
    pub raw_query: String,
    pub slots: Slots,
}

/// Fully resolved query after merging extracted slots with session memory.
///
/// `used_memory` records whether any slot was filled from prior context.
/// By the time a NormalizedQuery reaches a handler its slot set is
/// guaranteed sufficient for `kind`.
#[derive(Debug, Clone)]
pub struct NormalizedQuery {
    pub kind: IntentKind,
    pub raw_query: String,
    pub slots: Slots,
    pub used_memory: bool,
    /// Remembered analytics shape, for elliptical follow-ups that name no
    /// query type of their own ("what about to ATL?").
    pub query_type_hint: Option<crate::models::analytics::QueryType>,
}
