//! Trivia Buzz Back binary entrypoint wiring REST, WebSocket, timers and action workers.

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trivia_buzz_back::{
    config::AppConfig,
    dao::{packets::PacketCatalog, session_store::InMemorySessionStore},
    routes,
    services::{timer::TimerCoordinator, worker_pool},
    state::{AppState, SharedState, bus::InMemoryBus},
};

/// How often expired sessions, idle locks and idle bus topics are dropped.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = InMemorySessionStore::new(config.retention);
    let bus = InMemoryBus::new(config.bus_capacity);
    let packets = load_packets(&config);

    let app_state = AppState::new(
        config.clone(),
        Arc::new(store.clone()),
        Arc::new(bus.clone()),
        packets,
    );

    let dispatcher = app_state.dispatcher().clone();
    worker_pool::spawn_action_consumer(
        dispatcher.clone(),
        app_state.bus().clone(),
        config.worker_count,
    )?;

    let coordinator = TimerCoordinator::new(dispatcher, config.tick_interval);
    if let Err(err) = coordinator.recover().await {
        warn!(error = %err, "failed to recover running timers");
    }
    tokio::spawn(coordinator.run());
    tokio::spawn(run_sweeper(app_state.clone(), store, bus));

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

fn load_packets(config: &AppConfig) -> PacketCatalog {
    let Some(path) = config.packets_path.as_deref() else {
        info!("no packets file configured; starting with an empty catalog");
        return PacketCatalog::default();
    };
    PacketCatalog::load(path).unwrap_or_else(|err| {
        warn!(
            path = %path.display(),
            error = %err,
            "failed to load packets; starting with an empty catalog"
        );
        PacketCatalog::default()
    })
}

/// Periodically drop expired sessions together with their locks and topics.
async fn run_sweeper(state: SharedState, store: InMemorySessionStore, bus: InMemoryBus) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let purged = store.purge_expired();
        state.dispatcher().locks().prune();
        bus.prune();
        if purged > 0 {
            info!(purged, "expired sessions removed");
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
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
