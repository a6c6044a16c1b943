use crate::config::AssistantConfig;
use crate::handlers;
use crate::services::orchestrator::TimeoutSettings;
use crate::services::providers::TextProvider;
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::mock::MockTextProvider;
use crate::services::status::{AviationStackProvider, MockStatusProvider, StatusApiConfig, StatusProvider};
use crate::services::warehouse::{
    BigQueryExecutor, MockWarehouseExecutor, WarehouseConfig, WarehouseExecutor,
};
use crate::services::{DialogueOrchestrator, SessionStore};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use service_core::error::AppError;
use service_core::middleware::rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: AssistantConfig,
    pub orchestrator: Arc<DialogueOrchestrator>,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: AssistantConfig) -> Result<Self, AppError> {
        let (llm, status, warehouse) = build_collaborators(&config);

        let sessions = Arc::new(SessionStore::new());
        let orchestrator = Arc::new(DialogueOrchestrator::new(
            llm,
            status,
            warehouse,
            sessions,
            TimeoutSettings {
                status_secs: config.timeouts.status_secs,
                warehouse_secs: config.timeouts.warehouse_secs,
            },
        ));

        let state = AppState {
            config: config.clone(),
            orchestrator,
        };

        let limiter = create_ip_rate_limiter(config.rate_limit.chat_per_minute, 60);
        let chat_routes = Router::new()
            .route("/chat", post(handlers::chat))
            .route_layer(middleware::from_fn_with_state(
                limiter,
                ip_rate_limit_middleware,
            ));

        let app = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .merge(chat_routes)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        );

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

fn build_collaborators(
    config: &AssistantConfig,
) -> (
    Arc<dyn TextProvider>,
    Arc<dyn StatusProvider>,
    Arc<dyn WarehouseExecutor>,
) {
    if config.provider == "mock" {
        tracing::info!("Using mock collaborators");
        return (
            Arc::new(MockTextProvider::new()),
            Arc::new(MockStatusProvider::with_default_record()),
            Arc::new(MockWarehouseExecutor::with_default_rows()),
        );
    }

    let llm = GeminiTextProvider::new(GeminiConfig {
        api_key: config.gemini.api_key.clone(),
        model: config.gemini.model.clone(),
        timeout_secs: config.timeouts.llm_secs,
    });
    tracing::info!(model = %config.gemini.model, "Initialized Gemini text provider");

    let status = AviationStackProvider::new(StatusApiConfig {
        api_key: config.status_api.api_key.clone(),
        base_url: config.status_api.base_url.clone(),
        timeout_secs: config.timeouts.status_secs,
    });

    let warehouse = BigQueryExecutor::new(WarehouseConfig {
        base_url: config.warehouse.base_url.clone(),
        project_id: config.warehouse.project_id.clone(),
        table: config.warehouse.table.clone(),
        access_token: config.warehouse.access_token.clone(),
        timeout_secs: config.timeouts.warehouse_secs,
    });

    (Arc::new(llm), Arc::new(status), Arc::new(warehouse))
}
