//! Hybrid rule/LLM intent classification.
//!
//! A fixed, ordered rule table runs first; the first match wins and skips
//! the LLM entirely, which keeps the common cases cheap and fast. Only
//! queries no rule recognizes reach the LLM classifier. Raw query text is
//! deliberately never logged here.

use crate::models::{ConfidenceSource, IntentKind, RoutedIntent, Session, Slots};
use crate::services::providers::{GenerationParams, TextProvider};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;

static FLIGHT_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z]{2}\d{1,4})\b").expect("valid flight number pattern"));

static ROUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:from\s+)?([A-Za-z]{3})\s+to\s+([A-Za-z]{3})\b")
        .expect("valid route pattern")
});

static DESTINATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bto\s+([A-Za-z]{3})\b").expect("valid destination pattern"));

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("valid year pattern"));

static LIMIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\btop\s+(\d{1,2})\b").expect("valid limit pattern"));

const ANALYTICS_KEYWORDS: &[&str] = &[
    "on-time",
    "on time",
    "delay",
    "delayed",
    "average",
    "best",
    "worst",
    "airline",
    "statistic",
    "historical",
    "performance",
    "reliable",
    "show me",
];

type RuleMatcher = fn(&str, Option<&Session>) -> Option<Slots>;

/// One entry of the routing rule table.
struct IntentRule {
    name: &'static str,
    kind: IntentKind,
    matches: RuleMatcher,
}

/// The rule table, in priority order. First match wins.
static RULES: &[IntentRule] = &[
    IntentRule {
        name: "flight_number",
        kind: IntentKind::FlightStatus,
        matches: match_flight_number,
    },
    IntentRule {
        name: "route_with_analytics_keyword",
        kind: IntentKind::FlightAnalytics,
        matches: match_route_analytics,
    },
    IntentRule {
        name: "analytics_keyword_with_remembered_route",
        kind: IntentKind::FlightAnalytics,
        matches: match_keyword_followup,
    },
    IntentRule {
        name: "route_followup_after_analytics",
        kind: IntentKind::FlightAnalytics,
        matches: match_route_followup,
    },
];

fn has_analytics_keyword(query: &str) -> bool {
    let lower = query.to_lowercase();
    ANALYTICS_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Route/year/limit slots present in the query text itself.
fn common_slots(query: &str) -> Slots {
    let mut slots = Slots::default();
    if let Some(caps) = ROUTE_RE.captures(query) {
        slots.origin = Some(caps[1].to_uppercase());
        slots.destination = Some(caps[2].to_uppercase());
    } else if let Some(caps) = DESTINATION_RE.captures(query) {
        slots.destination = Some(caps[1].to_uppercase());
    }
    if let Some(caps) = YEAR_RE.captures(query) {
        slots.year = caps[1].parse().ok();
    }
    if let Some(caps) = LIMIT_RE.captures(query) {
        slots.limit = caps[1].parse().ok();
    }
    slots
}

fn match_flight_number(query: &str, _session: Option<&Session>) -> Option<Slots> {
    let caps = FLIGHT_NUMBER_RE.captures(query)?;
    Some(Slots {
        flight_number: Some(caps[1].to_uppercase()),
        ..Slots::default()
    })
}

fn match_route_analytics(query: &str, _session: Option<&Session>) -> Option<Slots> {
    if !has_analytics_keyword(query) {
        return None;
    }
    let slots = common_slots(query);
    if slots.origin.is_some() && slots.destination.is_some() {
        Some(slots)
    } else {
        None
    }
}

fn match_keyword_followup(query: &str, session: Option<&Session>) -> Option<Slots> {
    if !has_analytics_keyword(query) {
        return None;
    }
    if session.is_some_and(|s| s.has_route()) {
        Some(common_slots(query))
    } else {
        None
    }
}

/// A bare route or destination after an analytics exchange is an elliptical
/// follow-up ("SFO to ATL", "what about to ATL?").
fn match_route_followup(query: &str, session: Option<&Session>) -> Option<Slots> {
    if !session.is_some_and(|s| s.last_query_type.is_some()) {
        return None;
    }
    let slots = common_slots(query);
    if slots.origin.is_some() || slots.destination.is_some() {
        Some(slots)
    } else {
        None
    }
}

/// Structured response expected from the LLM classifier.
#[derive(Deserialize)]
struct LlmClassification {
    kind: String,
    #[serde(default)]
    slots: Slots,
}

const CLASSIFY_SCHEMA: &str = r#"{"type":"object","properties":{"kind":{"type":"string","enum":["flight_status","flight_analytics","unknown"]},"slots":{"type":"object","properties":{"flight_number":{"type":"string"},"origin":{"type":"string"},"destination":{"type":"string"},"airline":{"type":"string"},"year":{"type":"integer"},"limit":{"type":"integer"}}}},"required":["kind"]}"#;

pub struct IntentRouter {
    llm: Arc<dyn TextProvider>,
}

impl IntentRouter {
    pub fn new(llm: Arc<dyn TextProvider>) -> Self {
        Self { llm }
    }

    /// Classify a query: rule table first, LLM fallback. Malformed or
    /// unclassifiable LLM output degrades to `Unknown` instead of failing
    /// the request.
    pub async fn classify(&self, raw_query: &str, session: Option<&Session>) -> RoutedIntent {
        for rule in RULES {
            if let Some(slots) = (rule.matches)(raw_query, session) {
                tracing::debug!(rule = rule.name, "intent matched by rule");
                return RoutedIntent {
                    kind: rule.kind,
                    confidence_source: ConfidenceSource::Rule,
                    raw_query: raw_query.to_string(),
                    slots,
                };
            }
        }
        self.classify_with_llm(raw_query, session).await
    }

    async fn classify_with_llm(&self, raw_query: &str, session: Option<&Session>) -> RoutedIntent {
        let prompt = build_classification_prompt(raw_query, session);
        let params = GenerationParams {
            temperature: Some(0.0),
            max_tokens: Some(256),
            output_schema: Some(CLASSIFY_SCHEMA.to_string()),
        };

        let kind_and_slots = match self.llm.generate(&prompt, &params).await {
            Ok(response) => response
                .text
                .as_deref()
                .and_then(|text| serde_json::from_str::<LlmClassification>(text).ok())
                .map(|c| (parse_kind(&c.kind), c.slots)),
            Err(e) => {
                tracing::warn!(error = %e, "LLM classification failed");
                None
            }
        };

        let (kind, slots) = kind_and_slots.unwrap_or((IntentKind::Unknown, Slots::default()));
        RoutedIntent {
            kind,
            confidence_source: ConfidenceSource::Llm,
            raw_query: raw_query.to_string(),
            slots,
        }
    }
}

fn parse_kind(kind: &str) -> IntentKind {
    match kind {
        "flight_status" => IntentKind::FlightStatus,
        "flight_analytics" => IntentKind::FlightAnalytics,
        _ => IntentKind::Unknown,
    }
}

fn build_classification_prompt(raw_query: &str, session: Option<&Session>) -> String {
    let mut context = String::new();
    if let Some(session) = session {
        if let Some(origin) = &session.last_origin {
            context.push_str(&format!("Remembered origin: {}\n", origin));
        }
        if let Some(destination) = &session.last_destination {
            context.push_str(&format!("Remembered destination: {}\n", destination));
        }
        if let Some(airline) = &session.last_airline {
            context.push_str(&format!("Remembered airline: {}\n", airline));
        }
    }
    if context.is_empty() {
        context.push_str("No remembered context.\n");
    }

    format!(
        "Classify this air travel query as flight_status (live status of a specific \
         flight), flight_analytics (historical performance statistics), or unknown.\n\
         Extract any slots present in the query: flight_number, origin, destination, \
         airline, year, limit.\n\n\
         Conversation context:\n{}\nQuery: {}\n\n\
         Respond with JSON only: {{\"kind\": ..., \"slots\": {{...}}}}",
        context, raw_query
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryType;
    use crate::services::providers::mock::MockTextProvider;

    fn router_with(mock: Arc<MockTextProvider>) -> IntentRouter {
        IntentRouter::new(mock)
    }

    #[tokio::test]
    async fn flight_number_classifies_without_llm() {
        let mock = Arc::new(MockTextProvider::new());
        let router = router_with(mock.clone());

        let intent = router.classify("What's the status of AA123?", None).await;

        assert_eq!(intent.kind, IntentKind::FlightStatus);
        assert_eq!(intent.confidence_source, ConfidenceSource::Rule);
        assert_eq!(intent.slots.flight_number.as_deref(), Some("AA123"));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn flight_number_rule_is_case_insensitive() {
        let mock = Arc::new(MockTextProvider::new());
        let router = router_with(mock.clone());

        let intent = router.classify("is ba9 on time today", None).await;

        assert_eq!(intent.kind, IntentKind::FlightStatus);
        assert_eq!(intent.slots.flight_number.as_deref(), Some("BA9"));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn route_plus_keyword_classifies_as_analytics() {
        let mock = Arc::new(MockTextProvider::new());
        let router = router_with(mock.clone());

        let intent = router
            .classify(
                "Show me the most on-time airlines from SFO to JFK in 2023",
                None,
            )
            .await;

        assert_eq!(intent.kind, IntentKind::FlightAnalytics);
        assert_eq!(intent.confidence_source, ConfidenceSource::Rule);
        assert_eq!(intent.slots.origin.as_deref(), Some("SFO"));
        assert_eq!(intent.slots.destination.as_deref(), Some("JFK"));
        assert_eq!(intent.slots.year, Some(2023));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn bare_route_after_analytics_is_a_followup() {
        let mock = Arc::new(MockTextProvider::new());
        let router = router_with(mock.clone());
        let session = Session {
            last_origin: Some("SFO".to_string()),
            last_destination: Some("JFK".to_string()),
            last_query_type: Some(QueryType::OnTimeAirlines),
            ..Session::default()
        };

        let intent = router.classify("SFO to ATL", Some(&session)).await;

        assert_eq!(intent.kind, IntentKind::FlightAnalytics);
        assert_eq!(intent.slots.origin.as_deref(), Some("SFO"));
        assert_eq!(intent.slots.destination.as_deref(), Some("ATL"));
        assert_eq!(mock.calls(), 0);

        let intent = router.classify("what about to ATL?", Some(&session)).await;
        assert_eq!(intent.kind, IntentKind::FlightAnalytics);
        assert_eq!(intent.slots.origin, None);
        assert_eq!(intent.slots.destination.as_deref(), Some("ATL"));
    }

    #[tokio::test]
    async fn unmatched_query_falls_back_to_llm() {
        let mock = Arc::new(MockTextProvider::with_responses(vec![Ok(
            r#"{"kind":"flight_analytics","slots":{"origin":"LAX","destination":"SEA"}}"#
                .to_string(),
        )]));
        let router = router_with(mock.clone());

        let intent = router
            .classify("how do carriers compare between los angeles and seattle", None)
            .await;

        assert_eq!(intent.kind, IntentKind::FlightAnalytics);
        assert_eq!(intent.confidence_source, ConfidenceSource::Llm);
        assert_eq!(intent.slots.origin.as_deref(), Some("LAX"));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn malformed_llm_output_degrades_to_unknown() {
        let mock = Arc::new(MockTextProvider::with_responses(vec![
            Ok("not json at all".to_string()),
            Ok(r#"{"kind":"book_a_hotel","slots":{}}"#.to_string()),
        ]));
        let router = router_with(mock.clone());

        let intent = router.classify("tell me something", None).await;
        assert_eq!(intent.kind, IntentKind::Unknown);

        let intent = router.classify("tell me something", None).await;
        assert_eq!(intent.kind, IntentKind::Unknown);
        assert_eq!(intent.confidence_source, ConfidenceSource::Llm);
    }

    #[tokio::test]
    async fn llm_failure_degrades_to_unknown() {
        let mock = Arc::new(MockTextProvider::failing());
        let router = router_with(mock.clone());

        let intent = router.classify("tell me something", None).await;

        assert_eq!(intent.kind, IntentKind::Unknown);
        assert_eq!(mock.calls(), 1);
    }
}
