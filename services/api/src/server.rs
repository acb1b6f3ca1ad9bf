use crate::cli::ServeArgs;
use crate::infra::{load_fixture, AppState, ReviewStack};
use crate::routes::with_review_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use review_rewards::config::AppConfig;
use review_rewards::error::AppError;
use review_rewards::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(seed) = args.seed.take() {
        config.seed.path = Some(seed);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let stack = ReviewStack::in_memory();
    let fixture = load_fixture(config.seed.path.as_deref())?;
    let summary = stack.seed(&fixture)?;
    info!(
        seed = ?config.seed.path,
        badges = summary.badges,
        achievements = summary.achievements,
        users = summary.users,
        "review catalog seeded"
    );
    if summary.users == 0 {
        warn!("no users seeded; authenticated routes will reject every request");
    }

    let app = with_review_routes(stack.api())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "review rewards service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
