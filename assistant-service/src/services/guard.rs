//! Analytics query construction and validation.
//!
//! Two gates stand between a normalized query and the warehouse: the shape
//! check (the query must map onto a whitelisted query type) and schema
//! validation. The schema check runs deterministically first (every filter
//! column must exist in the hard-coded schema); only then is the LLM
//! validator consulted. The LLM's verdict is advisory-but-mandatory: a
//! negative or malformed verdict rejects the query outright, but a positive
//! one never bypasses the deterministic check.

use crate::models::{AnalyticsQuerySpec, FilterValue, NormalizedQuery, QueryType, Slots};
use crate::services::providers::{GenerationParams, TextProvider};
use crate::services::{AssistantError, schema};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 50;

const PRICE_KEYWORDS: &[&str] = &["price", "fare", "cost", "cheap", "expensive", "ticket"];

/// Structured verdict expected from the LLM validator.
#[derive(Deserialize)]
struct SchemaVerdict {
    valid: bool,
    #[serde(default)]
    reason: Option<String>,
}

const VERDICT_SCHEMA: &str = r#"{"type":"object","properties":{"valid":{"type":"boolean"},"reason":{"type":"string"}},"required":["valid"]}"#;

pub struct AnalyticsQueryGuard {
    llm: Arc<dyn TextProvider>,
}

impl AnalyticsQueryGuard {
    pub fn new(llm: Arc<dyn TextProvider>) -> Self {
        Self { llm }
    }

    pub async fn build_and_validate(
        &self,
        query: &NormalizedQuery,
    ) -> Result<AnalyticsQuerySpec, AssistantError> {
        let query_type =
            infer_query_type(query).ok_or(AssistantError::UnsupportedQuery)?;

        let filters = build_filters(&query.slots);
        validate_filters(&filters)?;

        let verdict = self.llm_verdict(query_type, &filters).await?;
        if !verdict.valid {
            return Err(AssistantError::SchemaMismatch(
                verdict
                    .reason
                    .unwrap_or_else(|| "validator rejected the query".to_string()),
            ));
        }

        let limit = query
            .slots
            .limit
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);

        Ok(AnalyticsQuerySpec {
            query_type,
            filters,
            limit,
            validated: true,
        })
    }

    async fn llm_verdict(
        &self,
        query_type: QueryType,
        filters: &BTreeMap<String, FilterValue>,
    ) -> Result<SchemaVerdict, AssistantError> {
        let filter_list = filters
            .iter()
            .map(|(column, value)| {
                let rendered = match value {
                    FilterValue::Str(s) => s.clone(),
                    FilterValue::Int(i) => i.to_string(),
                };
                format!("{} = {}", column, rendered)
            })
            .collect::<Vec<_>>()
            .join(", ");

        let prompt = format!(
            "A candidate analytics query against the warehouse:\n\
             query type: {}\nbound filters: {}\n\n{}\n\
             Does the candidate reference only columns that exist in the schema, \
             with values of the right type? Respond with JSON only: \
             {{\"valid\": true|false, \"reason\": \"...\"}}",
            query_type.as_str(),
            filter_list,
            schema::schema_prompt(),
        );

        let params = GenerationParams {
            temperature: Some(0.0),
            max_tokens: Some(256),
            output_schema: Some(VERDICT_SCHEMA.to_string()),
        };

        let response = self.llm.generate(&prompt, &params).await?;
        response
            .text
            .as_deref()
            .and_then(|text| serde_json::from_str::<SchemaVerdict>(text).ok())
            .ok_or_else(|| {
                AssistantError::SchemaMismatch(
                    "schema validator returned a malformed verdict".to_string(),
                )
            })
    }
}

/// Map a normalized query onto a whitelisted shape. Price questions are
/// unsupported outright (the schema has no fare data); a query naming no
/// shape of its own falls back to the session's remembered one.
fn infer_query_type(query: &NormalizedQuery) -> Option<QueryType> {
    let lower = query.raw_query.to_lowercase();

    if PRICE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return None;
    }

    let keyword_match = if lower.contains("on time")
        || lower.contains("on-time")
        || lower.contains("reliable")
        || lower.contains("best airline")
        || lower.contains("most punctual")
    {
        Some(QueryType::OnTimeAirlines)
    } else if lower.contains("day of week")
        || lower.contains("which day")
        || lower.contains("best day")
        || lower.contains("worst day")
    {
        Some(QueryType::DayOfWeekDelays)
    } else if lower.contains("average delay")
        || lower.contains("avg delay")
        || lower.contains("typical delay")
        || lower.contains("how delayed")
        || lower.contains("how late")
        || lower.contains("delay")
    {
        Some(QueryType::AverageDelay)
    } else {
        None
    };

    keyword_match.or(query.query_type_hint)
}

/// Filters for the route-scoped templates, keyed by warehouse column name.
fn build_filters(slots: &Slots) -> BTreeMap<String, FilterValue> {
    let mut filters = BTreeMap::new();
    if let Some(origin) = &slots.origin {
        filters.insert(
            "origin".to_string(),
            FilterValue::Str(origin.to_uppercase()),
        );
    }
    if let Some(destination) = &slots.destination {
        filters.insert(
            "dest".to_string(),
            FilterValue::Str(destination.to_uppercase()),
        );
    }
    if let Some(year) = slots.year {
        filters.insert("year".to_string(), FilterValue::Int(year));
    }
    filters
}

/// Deterministic schema gate: every filter must name a whitelisted column.
fn validate_filters(filters: &BTreeMap<String, FilterValue>) -> Result<(), AssistantError> {
    for column in filters.keys() {
        if !schema::is_column(column) {
            return Err(AssistantError::SchemaMismatch(format!(
                "unknown column: {}",
                column
            )));
        }
    }
    Ok(())
}
