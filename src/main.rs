//! # Passkey Relying-Party Server
//!
//! Entry point: load configuration, build shared state, start the
//! challenge cleanup task, and serve the ceremony API.

use chrono::Utc;
use passkey_rp_server::config::Config;
use passkey_rp_server::create_router;
use passkey_rp_server::state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default: info for dependencies, debug for this crate. RUST_LOG wins.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,passkey_rp_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);

    let app_state = AppState::new(&config).await?;
    tracing::info!(
        rp_id = %app_state.rp.id,
        origins = ?app_state.rp.origins,
        credential_store = app_state.credentials.backend(),
        "Application state initialized"
    );

    // Without a validity window the sweep still drops challenges nobody
    // came back for within STALE_CHALLENGE_AGE.
    let window = chrono::Duration::from_std(config.sweep_after())?;
    let period = config.cleanup_interval();
    let challenges = app_state.challenges.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match challenges.purge_issued_before(Utc::now() - window).await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Stale challenges purged"),
                Err(e) => tracing::error!("Challenge cleanup failed: {:?}", e),
            }
        }
    });

    let app = create_router(app_state);

    let bind_addr = config.bind_address();
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
