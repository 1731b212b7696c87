//! Trade Gateway Binary
//!
//! Starts the signed HTTP trading gateway.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin trade-gateway
//! ```
//!
//! # Configuration
//!
//! Settings come from an optional `gateway.toml` plus `GATEWAY_`-prefixed
//! environment variables (see [`trade_gateway::config`]); `.env` files are
//! loaded from the working directory. `RUST_LOG` controls log filtering
//! (default: info).
//!
//! The binary wires the simulated broker link (paper trading); a vendor
//! link plugs in behind the same `TransportFactory` without touching the
//! core.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use trade_gateway::broker::sim::SimTransportFactory;
use trade_gateway::broker::TransportFactory;
use trade_gateway::config::GatewaySettings;
use trade_gateway::notify::{NoopNotifier, Notifier, WebhookNotifier};
use trade_gateway::pool::SessionPool;
use trade_gateway::server::{create_router, AppState};
use trade_gateway::session::{BrokerSession, SessionConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment.
    let _ = dotenvy::dotenv();
    init_tracing();

    tracing::info!("starting trade gateway");

    let settings = GatewaySettings::load().context("loading settings")?;
    settings.validate().context("validating settings")?;
    let settings = Arc::new(settings);

    let notifier = build_notifier(&settings);
    let factory: Arc<dyn TransportFactory> = Arc::new(SimTransportFactory::new());

    let pool = Arc::new(build_sessions(&settings, &factory, &notifier).await);
    tracing::info!(sessions = pool.len(), "broker sessions ready");

    let state = AppState::new(pool, Arc::clone(&settings));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("invalid bind address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "trade gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("trade gateway stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_notifier(settings: &GatewaySettings) -> Arc<dyn Notifier> {
    match (&settings.notify.webhook_url, &settings.notify.secret) {
        (Some(url), Some(secret)) if !url.is_empty() => {
            tracing::info!(url = %url, "notification webhook configured");
            Arc::new(WebhookNotifier::new(url.clone(), secret.clone()))
        }
        _ => {
            tracing::info!("no notification webhook configured");
            Arc::new(NoopNotifier)
        }
    }
}

/// Open one session per enabled account. A session that cannot connect
/// terminates the process from within its bounded connect loop.
async fn build_sessions(
    settings: &GatewaySettings,
    factory: &Arc<dyn TransportFactory>,
    notifier: &Arc<dyn Notifier>,
) -> SessionPool {
    let mut sessions = Vec::new();
    for account in settings.enabled_accounts() {
        tracing::info!(
            account_id = %account.account_id,
            display_name = %account.display_name,
            "opening broker session"
        );
        let mut session = BrokerSession::new(
            SessionConfig {
                account_id: account.account_id.clone(),
                strategy_code: account.strategy_code,
                display_name: account.display_name.clone(),
            },
            Arc::clone(factory),
            Arc::clone(notifier),
        );
        session.connect().await;
        sessions.push(session);
    }
    SessionPool::new(sessions)
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
