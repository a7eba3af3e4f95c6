use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use gateway::BrokerSession;
use gateway_paper::PaperSession;
use log::info;

use trade_gateway::api;
use trade_gateway::auth::SignatureVerifier;
use trade_gateway::config::GatewayConfig;
use trade_gateway::registry::TraderRegistry;
use trade_gateway::state::AppState;

/// Signed HTTP gateway in front of broker trading sessions.
#[derive(Debug, Parser)]
#[command(name = "trade-gateway")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Override the configured listen port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("=== Trade Gateway Starting ===");

    let args = Args::parse();
    let config = GatewayConfig::load(&args.config)?;

    // Paper sessions stand in for live broker connectors; each enabled
    // account gets its own session, in configuration order.
    let sessions: Vec<Arc<dyn BrokerSession>> = config
        .enabled_traders()
        .map(|t| {
            Arc::new(PaperSession::new(
                t.account_id.clone(),
                t.display_name.clone(),
                t.initial_cash,
            )) as Arc<dyn BrokerSession>
        })
        .collect();
    let registry = TraderRegistry::new(sessions);
    info!("registered {} trading account(s)", registry.len());

    let credentials: HashMap<String, String> = config
        .auth
        .clients
        .iter()
        .map(|c| (c.client_id.clone(), c.secret_key.clone()))
        .collect();
    let verifier = SignatureVerifier::new(credentials, config.auth.signature_timeout_secs);

    let state = AppState {
        registry: Arc::new(registry),
        verifier: Arc::new(verifier),
    };
    let app = api::router(state);

    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", config.server.host, port);
    info!("Trade Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
