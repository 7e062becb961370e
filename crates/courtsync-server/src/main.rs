mod api;
mod middleware;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use courtsync_core::SportCatalog;
use courtsync_portal::{PortalApi, PortalClient, StaticTokenProvider, TokenProvider};
use courtsync_sync::{
    ApiPortalAdapter, AutomationLock, BookingOrchestrator, CancellationOrchestrator,
    PortalAdapter, ScrapeStatusStore, SlotStore, SyncConfig, SyncScheduler,
};

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
    state::{PgScrapeStatusStore, PgSlotStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(courtsync_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = courtsync_db::PoolConfig::from_app_config(&config);
    let pool = courtsync_db::connect_pool(&config.database_url, pool_config).await?;
    courtsync_db::run_migrations(&pool).await?;

    let catalog = Arc::new(match &config.sports_path {
        Some(path) => courtsync_core::load_sports(path)?,
        None => SportCatalog::default(),
    });
    tracing::info!(sports = catalog.sports().len(), "sport catalog loaded");

    let tokens: Arc<dyn TokenProvider> = Arc::new(StaticTokenProvider::new(
        config.portal_auth_token.clone(),
    ));
    if config.portal_auth_token.is_none() {
        tracing::warn!(
            "COURTSYNC_PORTAL_AUTH_TOKEN not set; collection and booking are disabled until provided"
        );
    }
    let portal: Arc<dyn PortalApi> = Arc::new(PortalClient::new(
        &config.portal_base_url,
        config.portal_timeout_secs,
        Arc::clone(&tokens),
    )?);

    let slot_store: Arc<dyn SlotStore> = Arc::new(PgSlotStore::new(pool.clone()));
    let status_store = Arc::new(PgScrapeStatusStore::new(pool.clone()));
    let adapter: Arc<dyn PortalAdapter> = Arc::new(ApiPortalAdapter::new(
        "portal-api",
        Arc::clone(&portal),
        tokens,
        Arc::clone(&catalog),
        slot_store,
        Arc::clone(&status_store) as Arc<dyn ScrapeStatusStore>,
    ));

    let sync_config = SyncConfig::from_app_config(&config);
    let (scheduler, coalescer) = SyncScheduler::new(
        sync_config,
        vec![adapter],
        status_store as Arc<dyn ScrapeStatusStore>,
    );
    tokio::spawn(scheduler.run());

    let lock = Arc::new(AutomationLock::new());
    let booking = Arc::new(BookingOrchestrator::new(
        Arc::clone(&portal),
        Arc::clone(&catalog),
        Arc::clone(&lock),
    ));
    let cancellation = Arc::new(CancellationOrchestrator::new(portal, catalog, lock));

    let auth = AuthState::new(
        config.api_auth_token.clone(),
        matches!(config.env, courtsync_core::Environment::Development),
    )?;
    let app = build_app(
        AppState {
            pool,
            coalescer,
            booking,
            cancellation,
        },
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
