//! Query normalization: merging extracted slots with session memory.
//!
//! A slot present in the intent always overrides the remembered value;
//! a slot the query left out is filled from the session when available.
//! Insufficient slot sets are rejected here, naming what is missing;
//! they are never silently defaulted.

use crate::models::{IntentKind, NormalizedQuery, RoutedIntent, Session};
use crate::services::AssistantError;

pub fn normalize(
    intent: &RoutedIntent,
    session: Option<&Session>,
) -> Result<NormalizedQuery, AssistantError> {
    if intent.kind == IntentKind::Unknown {
        return Err(AssistantError::UnknownIntent);
    }

    let mut slots = intent.slots.clone();
    let mut used_memory = false;
    let mut query_type_hint = None;

    if let Some(session) = session {
        if slots.origin.is_none() {
            if let Some(origin) = &session.last_origin {
                slots.origin = Some(origin.clone());
                used_memory = true;
            }
        }
        if slots.destination.is_none() {
            if let Some(destination) = &session.last_destination {
                slots.destination = Some(destination.clone());
                used_memory = true;
            }
        }
        if slots.airline.is_none() {
            if let Some(airline) = &session.last_airline {
                slots.airline = Some(airline.clone());
                used_memory = true;
            }
        }
        query_type_hint = session.last_query_type;
    }

    let missing: Vec<&'static str> = match intent.kind {
        IntentKind::FlightStatus => {
            let mut missing = Vec::new();
            if slots.flight_number.is_none() {
                missing.push("flight_number");
            }
            missing
        }
        IntentKind::FlightAnalytics => {
            let mut missing = Vec::new();
            if slots.origin.is_none() {
                missing.push("origin");
            }
            if slots.destination.is_none() {
                missing.push("destination");
            }
            missing
        }
        IntentKind::Unknown => Vec::new(),
    };

    if !missing.is_empty() {
        return Err(AssistantError::MissingInfo { missing });
    }

    Ok(NormalizedQuery {
        kind: intent.kind,
        raw_query: intent.raw_query.clone(),
        slots,
        used_memory,
        query_type_hint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfidenceSource, QueryType, Slots};

    fn intent(kind: IntentKind, slots: Slots) -> RoutedIntent {
        RoutedIntent {
            kind,
            confidence_source: ConfidenceSource::Rule,
            raw_query: "test".to_string(),
            slots,
        }
    }

    fn remembered_route() -> Session {
        Session {
            last_origin: Some("SFO".to_string()),
            last_destination: Some("JFK".to_string()),
            last_airline: Some("Delta Air Lines".to_string()),
            last_query_type: Some(QueryType::OnTimeAirlines),
            ..Session::default()
        }
    }

    #[test]
    fn new_slots_override_memory_and_memory_fills_gaps() {
        // Prior analytics query remembered SFO -> JFK; "SFO to ATL" then
        // re-specifies both ends, overriding the destination.
        let session = remembered_route();
        let normalized = normalize(
            &intent(
                IntentKind::FlightAnalytics,
                Slots {
                    origin: Some("SFO".to_string()),
                    destination: Some("ATL".to_string()),
                    ..Slots::default()
                },
            ),
            Some(&session),
        )
        .unwrap();

        assert_eq!(normalized.slots.origin.as_deref(), Some("SFO"));
        assert_eq!(normalized.slots.destination.as_deref(), Some("ATL"));
        // Airline was not re-specified and comes from memory.
        assert_eq!(normalized.slots.airline.as_deref(), Some("Delta Air Lines"));
        assert!(normalized.used_memory);
        assert_eq!(normalized.query_type_hint, Some(QueryType::OnTimeAirlines));
    }

    #[test]
    fn destination_only_followup_fills_origin_from_memory() {
        let session = remembered_route();
        let normalized = normalize(
            &intent(
                IntentKind::FlightAnalytics,
                Slots {
                    destination: Some("ATL".to_string()),
                    ..Slots::default()
                },
            ),
            Some(&session),
        )
        .unwrap();

        assert_eq!(normalized.slots.origin.as_deref(), Some("SFO"));
        assert_eq!(normalized.slots.destination.as_deref(), Some("ATL"));
        assert!(normalized.used_memory);
    }

    #[test]
    fn analytics_without_route_or_memory_is_missing_info() {
        let err = normalize(
            &intent(IntentKind::FlightAnalytics, Slots::default()),
            None,
        )
        .unwrap_err();

        match err {
            AssistantError::MissingInfo { missing } => {
                assert_eq!(missing, vec!["origin", "destination"]);
            }
            other => panic!("expected MissingInfo, got {:?}", other),
        }
    }

    #[test]
    fn status_without_flight_number_is_missing_info() {
        let err = normalize(&intent(IntentKind::FlightStatus, Slots::default()), None)
            .unwrap_err();

        match err {
            AssistantError::MissingInfo { missing } => {
                assert_eq!(missing, vec!["flight_number"]);
            }
            other => panic!("expected MissingInfo, got {:?}", other),
        }
    }

    #[test]
    fn unknown_intent_is_rejected() {
        let err = normalize(&intent(IntentKind::Unknown, Slots::default()), None).unwrap_err();
        assert!(matches!(err, AssistantError::UnknownIntent));
    }

    #[test]
    fn fresh_session_uses_no_memory() {
        let normalized = normalize(
            &intent(
                IntentKind::FlightStatus,
                Slots {
                    flight_number: Some("AA123".to_string()),
                    ..Slots::default()
                },
            ),
            None,
        )
        .unwrap();

        assert!(!normalized.used_memory);
        assert_eq!(normalized.query_type_hint, None);
    }
}
