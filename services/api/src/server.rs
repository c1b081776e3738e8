use crate::cli::ServeArgs;
use crate::infra::{live_services, AppState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use wisebites::config::AppConfig;
use wisebites::error::AppError;
use wisebites::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let integrations = &config.integrations;
    for (name, key) in [
        ("GOOGLE_API_KEY", &integrations.google_api_key),
        ("SERPAPI_KEY", &integrations.serpapi_key),
        ("GROQ_API_KEY", &integrations.groq_api_key),
    ] {
        if key.is_none() {
            warn!(variable = name, "integration key not set; dependent endpoints will degrade");
        }
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let services = live_services(&config);
    let app = with_service_routes(&services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        groq_model = %config.integrations.groq_model,
        freshness_days = config.cache.freshness_days,
        "wisebites api ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
