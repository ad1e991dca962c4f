use crate::handlers::{
    authorize, bind_intake, filter_intake, handle_resource, score_intake, validate,
};
use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to listen on
    pub listen_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".parse().expect("valid default address"),
        }
    }
}

/// HTTP server hosting whichever stage roles the state enables
pub struct PipelineServer {
    config: Config,
    state: Arc<AppState>,
}

impl PipelineServer {
    /// Create a new server
    pub fn new(config: Config, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Build the router; only enabled roles get routes
    pub fn build_router(&self) -> Router {
        let mut router = Router::new().route("/healthz", get(healthz));

        if self.state.filter_queue.is_some() {
            router = router.route("/scheduler/filter", post(filter_intake));
        }
        if self.state.score_queue.is_some() {
            router = router.route("/scheduler/score", post(score_intake));
        }
        if self.state.bind_queue.is_some() {
            router = router.route("/scheduler/bind", post(bind_intake));
        }
        if self.state.webhook.is_some() {
            router = router
                .route("/validate", post(validate))
                .route("/resources", post(handle_resource))
                .route("/authorize", post(authorize));
        }

        router
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server until cancelled
    pub async fn run(self, token: CancellationToken) -> Result<(), std::io::Error> {
        let app = self.build_router();

        info!("Starting server on {}", self.config.listen_addr);

        let listener = TcpListener::bind(self.config.listen_addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
    }
}

/// Health check endpoint
async fn healthz() -> &'static str {
    "ok"
}
