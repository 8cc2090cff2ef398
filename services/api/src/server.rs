use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryApplicationRepository, InMemoryProjectRepository};
use crate::routes::with_project_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use teamboard::config::{AppConfig, ConfigError};
use teamboard::error::AppError;
use teamboard::projects::applications::{Gatekeeper, HeaderIdentity, ProjectApplicationService};
use teamboard::telemetry;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if args.strict_answers {
        config.forms.strict_answers = true;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let identity = HeaderIdentity::new(&config.access.actor_header)
        .map_err(|_| ConfigError::InvalidActorHeader(config.access.actor_header.clone()))?;
    let gate = Arc::new(Gatekeeper::new(
        Arc::new(identity),
        config.access.sign_in_path.clone(),
    ));

    let service = Arc::new(
        ProjectApplicationService::new(
            Arc::new(InMemoryProjectRepository::default()),
            Arc::new(InMemoryApplicationRepository::default()),
        )
        .with_policy(config.forms.answer_policy()),
    );

    let app = with_project_routes(service, gate)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        policy = ?config.forms.answer_policy(),
        "teamboard service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
