//! Noodle-eating contest judge entrypoint wiring the Discord bot, storage and health API.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use noodle_judge::{
    bot,
    config::{AppConfig, StorageBackend, StorageConfig},
    dao::{
        contest_store::{ContestStore, memory::MemoryContestStore},
        storage::StorageError,
    },
    routes,
    services::{scoring_service, storage_supervisor},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    config.validate().context("invalid configuration")?;
    let storage = config.storage.clone();

    let app_state = AppState::new(config);

    tokio::spawn(storage_supervisor::run(app_state.clone(), move || {
        connect_store(storage.clone())
    }));
    tokio::spawn(scoring_service::run_activity_sweep(app_state.clone()));

    let bot_state = app_state.clone();
    tokio::spawn(async move {
        if let Err(err) = bot::start_bot(bot_state).await {
            error!(error = %err, "Discord client stopped");
        }
    });

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting health server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Open the configured contest store.
async fn connect_store(storage: StorageConfig) -> Result<Arc<dyn ContestStore>, StorageError> {
    match storage.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryContestStore::new())),
        #[cfg(feature = "mongo-store")]
        StorageBackend::Mongo => {
            use noodle_judge::dao::contest_store::mongodb::{MongoConfig, MongoContestStore};

            let config = MongoConfig::from_storage(&storage).await?;
            let store = MongoContestStore::connect(config).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mongo-store"))]
        StorageBackend::Mongo => Err(StorageError::unavailable(
            "built without the mongo-store feature".into(),
            std::io::Error::from(std::io::ErrorKind::Unsupported),
        )),
    }
}

fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers; `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,serenity=warn,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
