use navguard::{AppState, config::Config, create_router, models::AlertStatus};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "navguard=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("valid NAVGUARD_* configuration");
    tracing::info!("configuration: {config:?}");

    let state = AppState::from_config(&config);
    let mut alert_updates = state.emergency.subscribe();
    tokio::spawn(async move {
        loop {
            match alert_updates.recv().await {
                Ok(alerts) => {
                    let active = alerts
                        .iter()
                        .filter(|alert| alert.status == AlertStatus::Active)
                        .count();
                    tracing::info!("{} emergency alerts, {} active", alerts.len(), active);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("alert monitor skipped {skipped} updates");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let app = create_router(state);

    tracing::info!("starting navguard on http://{}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .expect("bind listen address");
    axum::serve(listener, app).await.expect("server error");
}
