pub mod analytics;
pub mod flight;
pub mod intent;
pub mod session;

pub use analytics::{AnalyticsQuerySpec, FilterValue, QueryType};
pub use flight::{FlightStatus, StatusEndpoint, StatusRecord};
pub use intent::{ConfidenceSource, IntentKind, NormalizedQuery, RoutedIntent, Slots};
pub use session::Session;
