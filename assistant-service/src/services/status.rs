//! Flight status collaborator.
//!
//! The core consumes the `StatusProvider` trait; the production
//! implementation talks to the AviationStack REST API.

use crate::models::{FlightStatus, StatusEndpoint, StatusRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Request timed out")]
    Timeout,

    #[error("Status API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Real-time flight status lookups.
#[async_trait]
pub trait StatusProvider: Send + Sync {
    /// Fetch the latest status record for a flight number. `Ok(None)` means
    /// the provider knows no such flight.
    async fn fetch_status(
        &self,
        flight_number: &str,
        date: Option<&str>,
    ) -> Result<Option<StatusRecord>, StatusError>;
}

/// AviationStack provider configuration.
#[derive(Debug, Clone)]
pub struct StatusApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

/// AviationStack-backed status provider.
pub struct AviationStackProvider {
    config: StatusApiConfig,
    client: Client,
}

impl AviationStackProvider {
    pub fn new(config: StatusApiConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }
}

#[async_trait]
impl StatusProvider for AviationStackProvider {
    async fn fetch_status(
        &self,
        flight_number: &str,
        date: Option<&str>,
    ) -> Result<Option<StatusRecord>, StatusError> {
        let mut request = self.client.get(&self.config.base_url).query(&[
            ("access_key", self.config.api_key.as_str()),
            ("flight_iata", flight_number),
        ]);
        if let Some(date) = date {
            request = request.query(&[("flight_date", date)]);
        }

        tracing::debug!(flight = flight_number, "Fetching flight status");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                StatusError::Timeout
            } else {
                StatusError::Network(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(StatusError::Api(format!(
                "AviationStack error {}",
                response.status()
            )));
        }

        let body: FlightsResponse = response
            .json()
            .await
            .map_err(|e| StatusError::Api(format!("Failed to parse response: {}", e)))?;

        Ok(body
            .data
            .into_iter()
            .next()
            .map(|flight| flight.into_record(flight_number)))
    }
}

#[derive(Deserialize)]
struct FlightsResponse {
    #[serde(default)]
    data: Vec<ApiFlight>,
}

#[derive(Deserialize, Default)]
struct ApiFlight {
    flight_status: Option<String>,
    airline: Option<ApiAirline>,
    flight: Option<ApiFlightIdent>,
    departure: Option<ApiEndpoint>,
    arrival: Option<ApiEndpoint>,
}

#[derive(Deserialize)]
struct ApiAirline {
    name: Option<String>,
}

#[derive(Deserialize)]
struct ApiFlightIdent {
    iata: Option<String>,
}

#[derive(Deserialize, Default)]
struct ApiEndpoint {
    airport: Option<String>,
    iata: Option<String>,
    terminal: Option<String>,
    gate: Option<String>,
    scheduled: Option<String>,
    actual: Option<String>,
    estimated: Option<String>,
    delay: Option<i64>,
}

impl ApiFlight {
    fn into_record(self, requested_number: &str) -> StatusRecord {
        let departure = self.departure.unwrap_or_default();
        let status = map_status(self.flight_status.as_deref(), departure.delay);

        StatusRecord {
            flight_number: self
                .flight
                .and_then(|f| f.iata)
                .unwrap_or_else(|| requested_number.to_uppercase()),
            airline: self.airline.and_then(|a| a.name),
            status,
            departure: departure.into_endpoint(),
            arrival: self.arrival.unwrap_or_default().into_endpoint(),
        }
    }
}

impl ApiEndpoint {
    fn into_endpoint(self) -> StatusEndpoint {
        StatusEndpoint {
            airport: self.airport,
            iata: self.iata,
            terminal: self.terminal,
            gate: self.gate,
            scheduled: parse_time(self.scheduled.as_deref()),
            actual: parse_time(self.actual.as_deref()),
            estimated: parse_time(self.estimated.as_deref()),
            delay_minutes: self.delay,
        }
    }
}

fn parse_time(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// A scheduled flight with a departure delay reads as delayed even though
/// the API still reports it as "scheduled".
fn map_status(raw: Option<&str>, departure_delay: Option<i64>) -> FlightStatus {
    match raw {
        Some("scheduled") => {
            if departure_delay.unwrap_or(0) > 0 {
                FlightStatus::Delayed
            } else {
                FlightStatus::OnTime
            }
        }
        Some("active") => FlightStatus::EnRoute,
        Some("landed") => FlightStatus::Landed,
        Some("cancelled") => FlightStatus::Cancelled,
        Some("diverted") => FlightStatus::Diverted,
        Some("incident") => FlightStatus::Incident,
        _ => FlightStatus::Unknown,
    }
}

enum MockStatusBehavior {
    DefaultRecord,
    Fixed(StatusRecord),
    NotFound,
}

/// Mock status provider for tests and local development.
pub struct MockStatusProvider {
    behavior: Mutex<MockStatusBehavior>,
}

impl MockStatusProvider {
    /// Provider that answers every lookup with an on-time record for the
    /// requested flight number.
    pub fn with_default_record() -> Self {
        Self {
            behavior: Mutex::new(MockStatusBehavior::DefaultRecord),
        }
    }

    /// Provider that always returns the given record.
    pub fn with_record(record: StatusRecord) -> Self {
        Self {
            behavior: Mutex::new(MockStatusBehavior::Fixed(record)),
        }
    }

    /// Provider that knows no flights.
    pub fn not_found() -> Self {
        Self {
            behavior: Mutex::new(MockStatusBehavior::NotFound),
        }
    }

    fn default_record(flight_number: &str) -> StatusRecord {
        StatusRecord {
            flight_number: flight_number.to_uppercase(),
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
}

#[async_trait]
impl StatusProvider for MockStatusProvider {
    async fn fetch_status(
        &self,
        flight_number: &str,
        _date: Option<&str>,
    ) -> Result<Option<StatusRecord>, StatusError> {
        let behavior = self.behavior.lock().expect("mock status behavior poisoned");
        Ok(match &*behavior {
            MockStatusBehavior::DefaultRecord => Some(Self::default_record(flight_number)),
            MockStatusBehavior::Fixed(record) => Some(record.clone()),
            MockStatusBehavior::NotFound => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduled_with_delay_maps_to_delayed() {
        assert_eq!(map_status(Some("scheduled"), Some(25)), FlightStatus::Delayed);
        assert_eq!(map_status(Some("scheduled"), None), FlightStatus::OnTime);
        assert_eq!(map_status(Some("landed"), Some(5)), FlightStatus::Landed);
        assert_eq!(map_status(None, None), FlightStatus::Unknown);
    }

    #[test]
    fn record_falls_back_to_requested_flight_number() {
        let flight = ApiFlight {
            flight_status: Some("scheduled".to_string()),
            ..ApiFlight::default()
        };
        let record = flight.into_record("aa123");
        assert_eq!(record.flight_number, "AA123");
    }
}
