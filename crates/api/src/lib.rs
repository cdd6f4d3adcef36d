//! HTTP API for order commits.
//!
//! Exposes order creation, the commit coordinator, offer responses,
//! lifecycle transitions and the expiration reconciler over REST, with
//! structured logging (tracing) and Prometheus metrics. The external
//! systems are in-memory sandboxes seeded through `/sandbox` or a fixtures
//! file.

pub mod config;
pub mod error;
pub mod routes;
pub mod sandbox;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use commit::gateways::Notifier;
use commit::{Collaborators, CommitCoordinator, CommitSettings, ExpirationReconciler, OrderLifecycle};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use sandbox::{Sandbox, SandboxFixtures, StockLevel};

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub coordinator: CommitCoordinator<S>,
    pub lifecycle: OrderLifecycle<S>,
    pub reconciler: ExpirationReconciler<S>,
    pub store: S,
    pub settings: CommitSettings,
}

impl<S: OrderStore + Clone> AppState<S> {
    pub fn new(store: S, services: Collaborators, settings: CommitSettings) -> Self {
        let lifecycle = OrderLifecycle::new(store.clone(), services.clone(), settings.clone());
        Self {
            coordinator: CommitCoordinator::new(store.clone(), services, settings.clone()),
            reconciler: ExpirationReconciler::new(lifecycle.clone()),
            lifecycle,
            store,
            settings,
        }
    }
}

/// State for the `/sandbox` routes, which write to the in-memory
/// collaborators as well as the order store.
pub struct SandboxState<S: OrderStore> {
    pub app: Arc<AppState<S>>,
    pub sandbox: Sandbox,
}

/// Creates the Axum application router with all routes and shared state.
///
/// The `/sandbox` routes are only mounted when `sandbox` is given.
pub fn create_app<S: OrderStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    sandbox: Option<Sandbox>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let mut app = Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/commit", post(routes::orders::commit::<S>))
        .route("/orders/{id}/expire", post(routes::orders::expire::<S>))
        .route("/orders/{id}/abandon", post(routes::orders::abandon::<S>))
        .route("/orders/{id}/fulfill", post(routes::orders::fulfill::<S>))
        .route("/orders/{id}/refund", post(routes::orders::refund::<S>))
        .route("/offers/{id}/accept", post(routes::offers::accept::<S>))
        .route("/offers/{id}/reject", post(routes::offers::reject::<S>))
        .with_state(state.clone())
        .merge(metrics_router);

    if let Some(sandbox) = sandbox {
        let sandbox_router = Router::new()
            .route("/sandbox/fixtures", post(routes::sandbox::seed::<S>))
            .route(
                "/sandbox/orders/{id}/offers",
                post(routes::sandbox::create_offer::<S>),
            )
            .with_state(Arc::new(SandboxState {
                app: state,
                sandbox,
            }));
        app = app.merge(sandbox_router);
    }

    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
    .layer(TraceLayer::new_for_http())
}

/// Creates the application state backed by sandbox collaborators.
pub fn create_default_state<S: OrderStore + Clone + 'static>(
    store: S,
    settings: CommitSettings,
    notifier: Arc<dyn Notifier>,
) -> (Arc<AppState<S>>, Sandbox) {
    let sandbox = Sandbox::default();
    let services = sandbox.collaborators(notifier);
    let state = Arc::new(AppState::new(store, services, settings));
    (state, sandbox)
}
