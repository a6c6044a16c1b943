//! Live flight status records as returned by the status provider.

use chrono::{DateTime, Utc};
use std::fmt;

/// Operational status of a flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightStatus {
    OnTime,
    Delayed,
    EnRoute,
    Landed,
    Cancelled,
    Diverted,
    Incident,
    Unknown,
}

impl FlightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::OnTime => "On Time",
            FlightStatus::Delayed => "Delayed",
            FlightStatus::EnRoute => "En Route",
            FlightStatus::Landed => "Landed",
            FlightStatus::Cancelled => "Cancelled",
            FlightStatus::Diverted => "Diverted",
            FlightStatus::Incident => "Incident",
            FlightStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One endpoint of a flight's route.
#[derive(Debug, Clone, Default)]
pub struct StatusEndpoint {
    pub airport: Option<String>,
    pub iata: Option<String>,
    pub terminal: Option<String>,
    pub gate: Option<String>,
    pub scheduled: Option<DateTime<Utc>>,
    pub actual: Option<DateTime<Utc>>,
    pub estimated: Option<DateTime<Utc>>,
    pub delay_minutes: Option<i64>,
}

/// A single live status record.
#[derive(Debug, Clone)]
pub struct StatusRecord {
    pub flight_number: String,
    pub airline: Option<String>,
    pub status: FlightStatus,
    pub departure: StatusEndpoint,
    pub arrival: StatusEndpoint,
}
