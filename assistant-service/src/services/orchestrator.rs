//! Top-level per-request coordination.
//!
//! One query in, exactly one envelope out. The request walks
//! route -> normalize -> (status | analytics) -> summarize; any failure
//! short-circuits into an error envelope and no partial result escapes.
//! Session memory is written exactly once per successful request, after the
//! handler result is known and before summarization, so memory reflects the
//! resolved slots even when summarization degrades to the fallback.

use crate::dtos::{ResponseCode, ResponseEnvelope};
use crate::models::{IntentKind, NormalizedQuery};
use crate::services::providers::TextProvider;
use crate::services::status::StatusProvider;
use crate::services::summarizer::{render_rows, render_status};
use crate::services::warehouse::WarehouseExecutor;
use crate::services::{
    AnalyticsQueryGuard, AssistantError, IntentRouter, ResponseSummarizer, SessionStore,
    normalizer,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Upper bounds for the collaborator calls, in seconds.
#[derive(Debug, Clone)]
pub struct TimeoutSettings {
    pub status_secs: u64,
    pub warehouse_secs: u64,
}

pub struct DialogueOrchestrator {
    router: IntentRouter,
    guard: AnalyticsQueryGuard,
    summarizer: ResponseSummarizer,
    sessions: Arc<SessionStore>,
    status: Arc<dyn StatusProvider>,
    warehouse: Arc<dyn WarehouseExecutor>,
    timeouts: TimeoutSettings,
}

impl DialogueOrchestrator {
    pub fn new(
        llm: Arc<dyn TextProvider>,
        status: Arc<dyn StatusProvider>,
        warehouse: Arc<dyn WarehouseExecutor>,
        sessions: Arc<SessionStore>,
        timeouts: TimeoutSettings,
    ) -> Self {
        Self {
            router: IntentRouter::new(llm.clone()),
            guard: AnalyticsQueryGuard::new(llm.clone()),
            summarizer: ResponseSummarizer::new(llm),
            sessions,
            status,
            warehouse,
            timeouts,
        }
    }

    /// Single entry point: one envelope out for every query in.
    pub async fn handle(&self, session_id: &str, raw_query: &str) -> ResponseEnvelope {
        match self.run(session_id, raw_query).await {
            Ok(envelope) => envelope,
            Err(err) => envelope_for_error(err),
        }
    }

    async fn run(
        &self,
        session_id: &str,
        raw_query: &str,
    ) -> Result<ResponseEnvelope, AssistantError> {
        let session = self.sessions.get(session_id);
        let intent = self.router.classify(raw_query, session.as_ref()).await;
        if intent.kind == IntentKind::Unknown {
            return Err(AssistantError::UnknownIntent);
        }

        let normalized = normalizer::normalize(&intent, session.as_ref())?;

        match normalized.kind {
            IntentKind::FlightStatus => self.handle_status(session_id, &normalized).await,
            IntentKind::FlightAnalytics => self.handle_analytics(session_id, &normalized).await,
            IntentKind::Unknown => Err(AssistantError::UnknownIntent),
        }
    }

    async fn handle_status(
        &self,
        session_id: &str,
        query: &NormalizedQuery,
    ) -> Result<ResponseEnvelope, AssistantError> {
        let flight_number = query
            .slots
            .flight_number
            .as_deref()
            .ok_or(AssistantError::MissingInfo {
                missing: vec!["flight_number"],
            })?;

        let record = timeout(
            Duration::from_secs(self.timeouts.status_secs),
            self.status.fetch_status(flight_number, None),
        )
        .await
        .map_err(|_| AssistantError::Timeout)??
        .ok_or_else(|| AssistantError::NotFound {
            message: format!("No such flight exists for: {}.", flight_number),
            suggestion: "Double-check the flight number or try a different airline/date.",
        })?;

        self.sessions.update(session_id, query, None);

        let raw = render_status(&record);
        let data = self
            .summarizer
            .summarize(IntentKind::FlightStatus, &raw)
            .await;

        Ok(ResponseEnvelope::success(
            "Flight status retrieved successfully.",
            data,
        ))
    }

    async fn handle_analytics(
        &self,
        session_id: &str,
        query: &NormalizedQuery,
    ) -> Result<ResponseEnvelope, AssistantError> {
        let spec = self.guard.build_and_validate(query).await?;

        let rows = timeout(
            Duration::from_secs(self.timeouts.warehouse_secs),
            self.warehouse.execute(&spec),
        )
        .await
        .map_err(|_| AssistantError::Timeout)??;

        if rows.is_empty() {
            return Err(AssistantError::NotFound {
                message: "No matching records found.".to_string(),
                suggestion: "Try a different route or time period.",
            });
        }

        self.sessions
            .update(session_id, query, Some(spec.query_type));

        let raw = render_rows(spec.query_type, &rows);
        let data = self
            .summarizer
            .summarize(IntentKind::FlightAnalytics, &raw)
            .await;

        let mut envelope =
            ResponseEnvelope::success("Analytics summary generated.", data);
        envelope.query_type = Some(spec.query_type.as_str().to_string());
        Ok(envelope)
    }
}

/// The sole conversion point from typed errors to envelopes. Suggestions
/// are written for the user, details stay sanitized.
fn envelope_for_error(err: AssistantError) -> ResponseEnvelope {
    match err {
        AssistantError::MissingInfo { missing } => ResponseEnvelope::error(
            ResponseCode::MissingInfo,
            "More information is needed to answer that.",
            None,
            format!("Try specifying {}.", missing.join(" and ")),
        ),
        AssistantError::UnsupportedQuery => ResponseEnvelope::error(
            ResponseCode::UnsupportedQuery,
            "That analytics question isn't supported.",
            None,
            "Ask about on-time performance, average delays, or day-of-week delays for a route.",
        ),
        AssistantError::SchemaMismatch(reason) => ResponseEnvelope::error(
            ResponseCode::SchemaMismatch,
            "The analytics query failed validation.",
            Some(reason),
            "Please rephrase your analytics question.",
        ),
        AssistantError::NotFound {
            message,
            suggestion,
        } => ResponseEnvelope::error(ResponseCode::NotFound, message, None, suggestion),
        AssistantError::Timeout => ResponseEnvelope::error(
            ResponseCode::Timeout,
            "An upstream service is currently slow.",
            None,
            "Please try again in a moment.",
        ),
        AssistantError::Upstream(detail) => ResponseEnvelope::error(
            ResponseCode::UpstreamError,
            "An upstream service returned an error.",
            Some(detail),
            "Please try again later.",
        ),
        AssistantError::UnknownIntent => ResponseEnvelope::error(
            ResponseCode::UnknownIntent,
            "I couldn't work out what you're asking.",
            None,
            "Ask about a flight like AA123, or analytics such as \
             'most on-time airlines from SFO to JFK'.",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::mock::MockTextProvider;
    use crate::services::status::MockStatusProvider;
    use crate::services::warehouse::MockWarehouseExecutor;

    fn orchestrator(
        llm: Arc<MockTextProvider>,
        status: Arc<MockStatusProvider>,
        warehouse: Arc<MockWarehouseExecutor>,
    ) -> DialogueOrchestrator {
        DialogueOrchestrator::new(
            llm,
            status,
            warehouse,
            Arc::new(SessionStore::new()),
            TimeoutSettings {
                status_secs: 2,
                warehouse_secs: 2,
            },
        )
    }

    #[tokio::test]
    async fn status_not_found_produces_not_found_envelope() {
        let orchestrator = orchestrator(
            Arc::new(MockTextProvider::new()),
            Arc::new(MockStatusProvider::not_found()),
            Arc::new(MockWarehouseExecutor::with_default_rows()),
        );

        let envelope = orchestrator.handle("s1", "Where is ZZ999?").await;

        assert_eq!(envelope.code, ResponseCode::NotFound);
        assert!(envelope.message.contains("ZZ999"));
        assert!(envelope.data.is_none());
        assert!(envelope.suggestion.is_some());
    }

    #[tokio::test]
    async fn unknown_intent_produces_unknown_intent_envelope() {
        // Echoed mock output is not valid classification JSON, so the LLM
        // stage degrades to Unknown.
        let orchestrator = orchestrator(
            Arc::new(MockTextProvider::new()),
            Arc::new(MockStatusProvider::with_default_record()),
            Arc::new(MockWarehouseExecutor::with_default_rows()),
        );

        let envelope = orchestrator.handle("s1", "what is the meaning of life").await;

        assert_eq!(envelope.code, ResponseCode::UnknownIntent);
        assert!(envelope.suggestion.is_some());
    }

    #[tokio::test]
    async fn empty_analytics_rows_produce_not_found() {
        let llm = Arc::new(MockTextProvider::with_responses(vec![Ok(
            r#"{"valid":true}"#.to_string(),
        )]));
        let orchestrator = orchestrator(
            llm,
            Arc::new(MockStatusProvider::with_default_record()),
            Arc::new(MockWarehouseExecutor::with_rows(Vec::new())),
        );

        let envelope = orchestrator
            .handle("s1", "most on-time airlines from SFO to JFK")
            .await;

        assert_eq!(envelope.code, ResponseCode::NotFound);
    }
}
