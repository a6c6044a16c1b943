//! Per-session conversational memory.

use crate::models::analytics::QueryType;
use chrono::{DateTime, Utc};

/// Remembered context for one transport session.
///
/// Every field is independently optional: absence means "no prior context",
/// never a sentinel value. Lifecycle is tied to the transport layer's
/// session concept; the core only reads and writes entries through the
/// session store.
#[derive(Debug, Clone)]
pub struct Session {
    pub last_origin: Option<String>,
    pub last_destination: Option<String>,
    pub last_airline: Option<String>,
    pub last_query_type: Option<QueryType>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            last_origin: None,
            last_destination: None,
            last_airline: None,
            last_query_type: None,
            updated_at: Utc::now(),
        }
    }
}

impl Session {
    /// True when the session remembers a complete route.
    pub fn has_route(&self) -> bool {
        self.last_origin.is_some() && self.last_destination.is_some()
    }
}
