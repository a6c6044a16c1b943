//! Wire shapes for the chat endpoint.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body of `POST /chat`.
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 2000))]
    pub query: String,
}

/// Outcome code carried in every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    Success,
    MissingInfo,
    UnsupportedQuery,
    SchemaMismatch,
    NotFound,
    Timeout,
    UpstreamError,
    UnknownIntent,
}

/// The single structured response shape returned for every request,
/// success or failure. Serialized verbatim as the `/chat` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub code: ResponseCode,
    pub message: String,
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,
}

impl ResponseEnvelope {
    pub fn success(message: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            code: ResponseCode::Success,
            message: message.into(),
            data: Some(data.into()),
            details: None,
            suggestion: None,
            query_type: None,
        }
    }

    pub fn error(
        code: ResponseCode,
        message: impl Into<String>,
        details: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
            details,
            suggestion: Some(suggestion.into()),
            query_type: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_screaming_snake() {
        let v = serde_json::to_value(ResponseCode::MissingInfo).unwrap();
        assert_eq!(v, "MISSING_INFO");
        let v = serde_json::to_value(ResponseCode::Success).unwrap();
        assert_eq!(v, "SUCCESS");
    }

    #[test]
    fn envelope_serializes_null_data_and_skips_absent_optionals() {
        let envelope = ResponseEnvelope::error(
            ResponseCode::UnknownIntent,
            "I couldn't work out what you're asking.",
            None,
            "Ask about a flight like AA123.",
        );

        let v = serde_json::to_value(&envelope).unwrap();
        assert!(v.get("data").unwrap().is_null());
        assert!(v.get("details").is_none());
        assert_eq!(v["suggestion"], "Ask about a flight like AA123.");
    }

    #[test]
    fn chat_request_rejects_empty_query() {
        let req = ChatRequest {
            query: String::new(),
        };
        assert!(req.validate().is_err());
    }
}
