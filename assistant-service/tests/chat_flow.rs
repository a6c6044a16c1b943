//! End-to-end conversational flows over HTTP with mock collaborators.

mod common;

use assistant_service::dtos::{ResponseCode, ResponseEnvelope};
use assistant_service::handlers::SESSION_HEADER;
use common::TestApp;
use reqwest::Client;

async fn post_chat(
    client: &Client,
    app: &TestApp,
    query: &str,
    session_id: Option<&str>,
) -> (ResponseEnvelope, String) {
    let mut request = client
        .post(&format!("{}/chat", app.address))
        .json(&serde_json::json!({ "query": query }));
    if let Some(session_id) = session_id {
        request = request.header(SESSION_HEADER, session_id);
    }

    let response = request.send().await.expect("Failed to execute request");
    assert!(response.status().is_success());

    let echoed_session = response
        .headers()
        .get(SESSION_HEADER)
        .expect("missing session header")
        .to_str()
        .expect("invalid session header")
        .to_string();

    let envelope = response.json().await.expect("Failed to parse envelope");
    (envelope, echoed_session)
}

#[tokio::test]
async fn status_query_returns_success_with_flight_facts() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let (envelope, session) =
        post_chat(&client, &app, "What's the status of AA123?", None).await;

    assert_eq!(envelope.code, ResponseCode::Success);
    let data = envelope.data.expect("expected data");
    assert!(data.contains("AA123"));
    assert!(data.contains("On Time"));
    assert!(!session.is_empty());
}

#[tokio::test]
async fn analytics_query_returns_ranked_airlines() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let (envelope, _) = post_chat(
        &client,
        &app,
        "Show me the most on-time airlines from SFO to JFK in 2023",
        None,
    )
    .await;

    assert_eq!(envelope.code, ResponseCode::Success);
    assert_eq!(envelope.query_type.as_deref(), Some("on_time_airlines"));
    let data = envelope.data.expect("expected data");
    assert!(data.contains("Delta Air Lines"));
    assert!(data.contains("on_time_percentage"));
}

#[tokio::test]
async fn followup_reuses_remembered_route() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let (envelope, _) = post_chat(
        &client,
        &app,
        "Show me the most on-time airlines from SFO to JFK",
        Some("followup-session"),
    )
    .await;
    assert_eq!(envelope.code, ResponseCode::Success);

    // Elliptical follow-up: only the destination changes; origin and query
    // shape come from session memory.
    let (envelope, session) = post_chat(
        &client,
        &app,
        "what about to ATL?",
        Some("followup-session"),
    )
    .await;

    assert_eq!(envelope.code, ResponseCode::Success);
    assert_eq!(envelope.query_type.as_deref(), Some("on_time_airlines"));
    assert_eq!(session, "followup-session");
}

#[tokio::test]
async fn unclassifiable_query_reports_unknown_intent() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let (envelope, _) =
        post_chat(&client, &app, "tell me a story about pirates", None).await;

    assert_eq!(envelope.code, ResponseCode::UnknownIntent);
    assert!(envelope.data.is_none());
    assert!(envelope.suggestion.is_some());
}
