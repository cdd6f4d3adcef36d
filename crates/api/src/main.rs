//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use api::SandboxFixtures;
use axum::Router;
use commit::gateways::{ChannelNotifier, FailedChargeNotice};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, OrderStore, PostgresOrderStore};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn describe_metrics() {
    metrics::describe_counter!("order.submit", "Orders submitted by buyers");
    metrics::describe_counter!("order.approve", "Orders approved by sellers");
    metrics::describe_counter!("order.abandon", "Pending orders abandoned or expired");
    metrics::describe_counter!("order.seller_lapse", "Submitted orders the seller let lapse");
    metrics::describe_counter!(
        commit::ARTWORK_VERSION_MISMATCH_METRIC,
        "Commits refused because an artwork changed after checkout"
    );
}

/// Delivers failed-charge notices until every sender is dropped.
async fn run_notification_worker(mut receiver: UnboundedReceiver<FailedChargeNotice>) {
    while let Some(notice) = receiver.recv().await {
        tracing::info!(
            transaction_id = %notice.transaction_id,
            user_id = %notice.user_id,
            "delivering failed charge notification"
        );
    }
    tracing::debug!("notification worker stopped");
}

fn load_fixtures(path: &str) -> SandboxFixtures {
    let json = std::fs::read_to_string(path).expect("failed to read sandbox fixtures");
    SandboxFixtures::from_json(&json).expect("failed to parse sandbox fixtures")
}

fn build_app<S: OrderStore + Clone + 'static>(
    store: S,
    config: &Config,
    notifier: ChannelNotifier,
    metrics_handle: PrometheusHandle,
) -> Router {
    let (state, sandbox) =
        api::create_default_state(store, config.commit_settings(), Arc::new(notifier));
    if let Some(path) = &config.sandbox_fixtures {
        sandbox.seed(load_fixtures(path));
    }
    api::create_app(state, Some(sandbox), metrics_handle)
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    describe_metrics();

    // 3. Start the notification worker
    let (notifier, receiver) = ChannelNotifier::channel();
    let worker = tokio::spawn(run_notification_worker(receiver));

    // 4. Build the application on the configured order store
    let app = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to database");
            let store = PostgresOrderStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL order store");
            build_app(store, &config, notifier, metrics_handle)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders are kept in memory");
            build_app(InMemoryOrderStore::new(), &config, notifier, metrics_handle)
        }
    };

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // Dropping the router dropped the last sender; let the worker drain.
    if let Err(error) = worker.await {
        tracing::error!(%error, "notification worker panicked");
    }

    tracing::info!("server shut down gracefully");
}
