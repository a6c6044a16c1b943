//! Natural-language summarization with a deterministic fallback.
//!
//! The raw renderings double as the LLM prompt payload and the fallback
//! output: if summarization fails or comes back empty, the caller still
//! gets every fact, just untouched by the LLM.

use crate::models::{IntentKind, QueryType, StatusRecord};
use crate::services::providers::{GenerationParams, TextProvider};
use crate::services::schema;
use crate::services::warehouse::AnalyticsRow;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const MAX_RENDERED_ROWS: usize = 5;

pub struct ResponseSummarizer {
    llm: Arc<dyn TextProvider>,
}

impl ResponseSummarizer {
    pub fn new(llm: Arc<dyn TextProvider>) -> Self {
        Self { llm }
    }

    /// Summarize a raw rendering for the user. Never fails: provider errors
    /// and empty output degrade to the rendering itself.
    pub async fn summarize(&self, kind: IntentKind, raw: &str) -> String {
        let prompt = match kind {
            IntentKind::FlightStatus => format!(
                "Summarize the following flight status for a traveler in 2-3 sentences, \
                 focusing on what matters most. Keep the flight number, route, and \
                 status in the summary:\n{}",
                raw
            ),
            _ => format!(
                "Summarize these flight analytics results in 2-3 sentences for a \
                 traveler deciding which flight to book:\n{}",
                raw
            ),
        };

        let params = GenerationParams {
            temperature: Some(0.3),
            max_tokens: Some(256),
            output_schema: None,
        };

        match self.llm.generate(&prompt, &params).await {
            Ok(response) => match response.text {
                Some(text) if !text.trim().is_empty() => text.trim().to_string(),
                _ => {
                    tracing::warn!("summarizer returned empty output, using raw rendering");
                    raw.to_string()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "summarization failed, using raw rendering");
                raw.to_string()
            }
        }
    }
}

/// Detailed, human-readable status report for a flight.
pub fn render_status(record: &StatusRecord) -> String {
    let airline = record.airline.as_deref().unwrap_or("Unknown Airline");
    let dep = &record.departure;
    let arr = &record.arrival;

    let dep_name = dep.airport.as_deref().unwrap_or("Unknown Departure Airport");
    let arr_name = arr.airport.as_deref().unwrap_or("Unknown Arrival Airport");
    let dep_code = dep.iata.as_deref().unwrap_or("N/A");
    let arr_code = arr.iata.as_deref().unwrap_or("N/A");

    let delay_line = match dep.delay_minutes {
        Some(delay) if delay > 0 => format!("Departure Delay: {} min", delay),
        _ => "On time".to_string(),
    };

    let lines = [
        format!(
            "Flight Status Report for {} ({})",
            record.flight_number, airline
        ),
        format!("Status: {}", record.status),
        format!("Route: {} ({}) -> {} ({})", dep_name, dep_code, arr_name, arr_code),
        format!(
            "Scheduled Departure: {} | Actual Departure: {}",
            format_time(dep.scheduled),
            format_time(dep.actual)
        ),
        format!(
            "Scheduled Arrival: {} | Estimated Arrival: {}",
            format_time(arr.scheduled),
            format_time(arr.estimated)
        ),
        format!(
            "Terminal: {} | Gate: {}",
            dep.terminal.as_deref().unwrap_or("N/A"),
            dep.gate.as_deref().unwrap_or("N/A")
        ),
        delay_line,
    ];
    lines.join("\n")
}

/// Analytics rows as a readable table, in the query shape's display order.
pub fn render_rows(query_type: QueryType, rows: &[AnalyticsRow]) -> String {
    if rows.is_empty() {
        return "No results found".to_string();
    }

    let columns = schema::display_columns(query_type);
    let mut out = columns.join(" | ");
    out.push('\n');
    out.push_str(&"-".repeat(50));
    out.push('\n');

    for row in rows.iter().take(MAX_RENDERED_ROWS) {
        let rendered: Vec<String> = columns
            .iter()
            .map(|column| render_cell(row.get(*column)))
            .collect();
        out.push_str(&rendered.join(" | "));
        out.push('\n');
    }

    if rows.len() > MAX_RENDERED_ROWS {
        out.push_str(&format!(
            "\nShowing {} of {} records",
            MAX_RENDERED_ROWS,
            rows.len()
        ));
    }

    out
}

fn render_cell(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => {
            if let Some(f) = n.as_f64().filter(|f| f.fract() != 0.0) {
                format!("{:.1}", f)
            } else {
                n.to_string()
            }
        }
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn format_time(value: Option<DateTime<Utc>>) -> String {
    match value {
        Some(dt) => dt.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlightStatus, StatusEndpoint};
    use crate::services::providers::mock::MockTextProvider;
    use std::collections::HashMap;

    fn on_time_record() -> StatusRecord {
        StatusRecord {
            flight_number: "AA123".to_string(),
            airline: Some("American Airlines".to_string()),
            status: FlightStatus::OnTime,
            departure: StatusEndpoint {
                airport: Some("San Francisco International".to_string()),
                iata: Some("SFO".to_string()),
                terminal: Some("2".to_string()),
                gate: Some("D11".to_string()),
                ..StatusEndpoint::default()
            },
            arrival: StatusEndpoint {
                airport: Some("John F. Kennedy International".to_string()),
                iata: Some("JFK".to_string()),
                ..StatusEndpoint::default()
            },
        }
    }

    #[tokio::test]
    async fn fallback_keeps_flight_number_route_and_status() {
        let summarizer = ResponseSummarizer::new(Arc::new(MockTextProvider::failing()));
        let raw = render_status(&on_time_record());

        let output = summarizer.summarize(IntentKind::FlightStatus, &raw).await;

        assert!(output.contains("AA123"));
        assert!(output.contains("SFO"));
        assert!(output.contains("JFK"));
        assert!(output.contains("On Time"));
    }

    #[tokio::test]
    async fn empty_llm_output_falls_back_to_raw() {
        let summarizer = ResponseSummarizer::new(Arc::new(MockTextProvider::with_responses(
            vec![Ok("   ".to_string())],
        )));

        let output = summarizer.summarize(IntentKind::FlightStatus, "raw facts").await;
        assert_eq!(output, "raw facts");
    }

    #[tokio::test]
    async fn successful_summary_is_used_verbatim() {
        let summarizer = ResponseSummarizer::new(Arc::new(MockTextProvider::with_responses(
            vec![Ok("AA123 is on time from SFO to JFK.".to_string())],
        )));

        let output = summarizer.summarize(IntentKind::FlightStatus, "raw facts").await;
        assert_eq!(output, "AA123 is on time from SFO to JFK.");
    }

    #[test]
    fn status_render_reports_delay_minutes() {
        let mut record = on_time_record();
        record.status = FlightStatus::Delayed;
        record.departure.delay_minutes = Some(42);

        let raw = render_status(&record);
        assert!(raw.contains("Status: Delayed"));
        assert!(raw.contains("Departure Delay: 42 min"));
    }

    #[test]
    fn row_render_lists_display_columns_and_truncates() {
        let row = |carrier: &str| {
            HashMap::from([
                ("carrier".to_string(), serde_json::Value::from(carrier)),
                (
                    "airline_name".to_string(),
                    serde_json::Value::from(format!("{} Airlines", carrier)),
                ),
                ("total_flights".to_string(), serde_json::Value::from(100)),
                (
                    "on_time_percentage".to_string(),
                    serde_json::Value::from(88.5),
                ),
                (
                    "avg_overall_delay".to_string(),
                    serde_json::Value::from(6.0),
                ),
            ])
        };

        let rows: Vec<AnalyticsRow> = ["DL", "AA", "UA", "B6", "WN", "AS", "NK"]
            .iter()
            .map(|c| row(c))
            .collect();

        let out = render_rows(QueryType::OnTimeAirlines, &rows);
        assert!(out.starts_with("carrier | airline_name"));
        assert!(out.contains("DL | DL Airlines | 100 | 88.5 | 6.0"));
        assert!(out.contains("Showing 5 of 7 records"));
        assert!(!out.contains("NK"));
    }
}
