//! Holdline server binary — places the outbound call and serves the
//! provider's webhooks until the automation hands the call to a human.
//!
//! Starts an axum HTTP server with structured logging and graceful shutdown
//! on SIGTERM/SIGINT or on the automation reaching a terminal outcome.

use holdline_call::{CallManager, CallSettings};
use holdline_provider::{Ingress, NgrokIngress, StaticIngress, TwilioConfig, TwilioProvider};
use holdline_server::config::{self, Config, IngressMode};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("HOLDLINE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

fn build_ingress(config: &Config) -> Arc<dyn Ingress> {
    match config.ingress.mode {
        IngressMode::Static => {
            if config.ingress.public_url.is_empty() {
                panic!("ingress.public_url is required in static ingress mode");
            }
            Arc::new(StaticIngress::new(&config.ingress.public_url))
        }
        IngressMode::Ngrok => Arc::new(NgrokIngress::new(&config.ingress.agent_api)),
    }
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let settings: CallSettings = config.call_settings();
    for (field, value) in [
        ("telephony.from_number", &settings.from_number),
        ("telephony.target_number", &settings.target_number),
        ("telephony.transfer_number", &settings.transfer_number),
        ("telephony.account_sid", &config.telephony.account_sid),
    ] {
        assert!(!value.is_empty(), "{field} must be configured");
    }

    tracing::info!(
        target = %settings.target_number,
        keyword = %settings.keyword,
        keyword_timeout_secs = settings.keyword_timeout.as_secs(),
        language = %settings.language,
        "starting holdline call automation"
    );

    let provider = Arc::new(TwilioProvider::new(TwilioConfig {
        account_sid: config.telephony.account_sid.clone(),
        auth_token: config.telephony.auth_token.clone(),
        api_base: config.telephony.api_base.clone(),
    }));
    let ingress = build_ingress(&config);
    let manager = Arc::new(CallManager::new(settings, provider, ingress));

    // Bind the listener and establish the public ingress; fatal on failure.
    let public_url = manager
        .start_serving()
        .await
        .expect("failed to establish webhook transport — check server and ingress config");
    let listener = manager
        .take_listener()
        .expect("listener missing after start_serving");

    tracing::info!(%public_url, "serving provider webhooks");

    // Place the initial call once the server is accepting requests.
    let caller = manager.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        if let Err(e) = caller.place_call().await {
            tracing::error!("initial call placement failed: {e}");
        }
    });

    let app = holdline_server::app(manager.clone());

    // Serve until a signal arrives or the automation finishes.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(manager.clone()))
        .await
        .expect("server error");

    // Leave a completed call alone: it now belongs to the human it was
    // transferred to. Anything else is torn down.
    if !manager.status().is_done {
        manager.stop().await;
    }

    tracing::info!("holdline server shut down");
}

/// Waits for SIGINT (Ctrl+C), SIGTERM, or automation completion.
async fn shutdown_signal(manager: Arc<CallManager>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
        () = manager.wait_until_done() => {
            tracing::info!("automation reached a terminal outcome, shutting down");
        }
    }
}
