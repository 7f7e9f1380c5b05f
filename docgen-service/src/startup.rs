use crate::config::DocgenConfig;
use crate::handlers;
use crate::middleware::metrics::metrics_middleware;
use crate::services::pipeline::DocumentPipeline;
use crate::services::renderer::Renderer;
use crate::services::store::DocumentStore;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use service_core::error::AppError;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: DocgenConfig,
    pub store: Arc<dyn DocumentStore>,
    pub pipeline: DocumentPipeline,
    pub renderer: Arc<dyn Renderer>,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(
        config: DocgenConfig,
        store: Arc<dyn DocumentStore>,
        renderer: Arc<dyn Renderer>,
    ) -> Result<Self, AppError> {
        let pipeline = DocumentPipeline::new(store.clone());
        let state = AppState {
            config: config.clone(),
            store,
            pipeline,
            renderer,
        };

        let app = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            .route(
                "/company",
                get(handlers::get_company).patch(handlers::update_company),
            )
            .route(
                "/documents",
                post(handlers::create_document).get(handlers::list_documents),
            )
            .route("/documents/:document_id", get(handlers::get_document))
            .route(
                "/documents/:document_id/status",
                patch(handlers::update_document_status),
            )
            .route(
                "/documents/:document_id/pdf",
                get(handlers::render_document_pdf),
            )
            .route("/messages/inbound", post(handlers::inbound_message))
            .layer(middleware::from_fn(metrics_middleware))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

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
