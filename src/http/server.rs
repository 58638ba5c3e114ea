//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router with the gateway handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Collect request bodies under the configured limit
//! - Extract multipart text fields before dispatch
//! - Apply configuration updates without restart
//! - Serve with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Multipart, FromRequest, Path, State},
    http::{request::Parts, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::GatewayConfig;
use crate::gateway::dispatcher::RequestDispatcher;
use crate::gateway::format::FeatureSet;
use crate::http::context::RequestContext;
use crate::http::request::request_id_layer;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<RequestDispatcher>,
    pub config: Arc<ArcSwap<GatewayConfig>>,
}

/// HTTP host for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    shared_config: Arc<ArcSwap<GatewayConfig>>,
}

impl GatewayServer {
    /// Create a new server around a dispatcher.
    pub fn new(config: GatewayConfig, dispatcher: Arc<RequestDispatcher>) -> Self {
        let shared_config = Arc::new(ArcSwap::from_pointee(config.clone()));
        let state = AppState {
            dispatcher,
            config: shared_config.clone(),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            shared_config,
        }
    }

    /// Build the axum router with all middleware layers.
    ///
    /// The request-id layer sits outermost so the propagate layer and the
    /// handler both see the generated id.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{operation}", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(request_id_layer())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.limits.request_timeout_secs,
                    ))),
            )
    }

    /// Run the server on the given listener.
    ///
    /// Configuration updates received on `config_updates` are applied live;
    /// the server stops when the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway server starting");

        let shared = self.shared_config.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                tracing::info!("Applying configuration update");
                shared.store(Arc::new(new_config));
            }
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("Gateway server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Main gateway handler: builds the request context and dispatches.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(operation): Path<String>,
    request: Request<Body>,
) -> Response {
    let config = state.config.load();
    let features = FeatureSet::from_config(&config.features);
    let limit = config.limits.max_body_bytes;

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let mut ctx = RequestContext::from_parts(&parts, Some(addr), bytes.clone());

    if ctx.content_type_essence().as_deref() == Some("multipart/form-data") {
        match extract_multipart_fields(&parts, bytes).await {
            Ok(fields) => ctx.set_form_fields(fields),
            Err(message) => {
                tracing::warn!(
                    operation = %operation,
                    error = %message,
                    "Malformed multipart body"
                );
                return (StatusCode::BAD_REQUEST, "Malformed multipart body").into_response();
            }
        }
    }

    state.dispatcher.dispatch(features, &operation, ctx).await
}

/// Pull the text fields out of a multipart body. File parts are skipped;
/// only named text fields participate in form deserialization.
async fn extract_multipart_fields(
    parts: &Parts,
    body: Bytes,
) -> Result<Vec<(String, String)>, String> {
    let request = Request::from_parts(parts.clone(), Body::from(body));
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| e.to_string())?;

    let mut fields = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = match field.name() {
                    Some(name) => name.to_string(),
                    None => continue,
                };
                if field.file_name().is_some() {
                    continue;
                }
                let text = field.text().await.map_err(|e| e.to_string())?;
                fields.push((name, text));
            }
            Ok(None) => break,
            Err(e) => return Err(e.to_string()),
        }
    }
    Ok(fields)
}
