use futures::future::ready;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tokio::task::JoinHandle;
use tracing::error;

use crate::health::HealthRegistry;

pub async fn index() -> &'static str {
    "hashtag trends"
}

/// Bind a `TcpListener` on the provided bind address to serve a `Router` on it.
pub async fn serve(router: Router, bind: &str) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(bind).await?;

    axum::serve(listener, router).await?;

    Ok(())
}

pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    // Snapshot times are recorded in milliseconds
    const BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 250.0, 1000.0];

    PrometheusBuilder::new()
        .set_buckets(BUCKETS)?
        .install_recorder()
}

/// Liveness, readiness and prometheus routes.
pub fn router(liveness: HealthRegistry, recorder: PrometheusHandle) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/_readiness", get(index))
        .route("/_liveness", get(move || ready(liveness.get_status())))
        .route("/metrics", get(move || ready(recorder.render())))
}

/// Serve the metrics router in the background. A failure to bind is logged, not
/// fatal: counting hashtags doesn't depend on anyone scraping us.
pub fn start_metrics_server(
    bind: String,
    liveness: HealthRegistry,
    recorder: PrometheusHandle,
) -> JoinHandle<()> {
    tokio::task::spawn(async move {
        if let Err(e) = serve(router(liveness, recorder), &bind).await {
            error!("failed to serve metrics on {}: {}", bind, e);
        }
    })
}
