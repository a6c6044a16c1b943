//! In-memory session store.
//!
//! Process-lifetime only; eviction is the transport layer's concern.
//! Same-key updates are serialized through the map's entry locking, so
//! rapid-fire messages on one session cannot lose writes; cross-session
//! access needs no coordination.

use crate::models::{NormalizedQuery, QueryType, Session};
use chrono::Utc;
use dashmap::DashMap;

#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.get(session_id).map(|entry| entry.value().clone())
    }

    /// Record the resolved slots of a completed request. Overwrites only
    /// the slots present in `query`; slots not re-specified keep their
    /// remembered values.
    pub fn update(
        &self,
        session_id: &str,
        query: &NormalizedQuery,
        query_type: Option<QueryType>,
    ) {
        let mut entry = self.sessions.entry(session_id.to_string()).or_default();

        if let Some(origin) = &query.slots.origin {
            entry.last_origin = Some(origin.clone());
        }
        if let Some(destination) = &query.slots.destination {
            entry.last_destination = Some(destination.clone());
        }
        if let Some(airline) = &query.slots.airline {
            entry.last_airline = Some(airline.clone());
        }
        if let Some(query_type) = query_type {
            entry.last_query_type = Some(query_type);
        }
        entry.updated_at = Utc::now();
    }
}
