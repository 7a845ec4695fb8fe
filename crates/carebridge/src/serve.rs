// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `serve` subcommand: wires storage, inference, orchestration, and the
//! HTTP gateway together and runs until a shutdown signal arrives.

use std::sync::Arc;

use carebridge_config::CareBridgeConfig;
use carebridge_core::CareError;
use carebridge_gateway::{start_server, AuthConfig, GatewayState, ServerConfig};
use carebridge_inference::HttpEngine;
use carebridge_orchestrator::{GenerationRegistry, Orchestrator};
use carebridge_storage::{ConversationStore, Database};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Run the broker until SIGINT or SIGTERM.
pub async fn run(config: CareBridgeConfig) -> Result<(), CareError> {
    init_tracing(&config.agent.log_level);

    if !config.gateway.enabled {
        return Err(CareError::Config(
            "gateway.enabled is false; nothing to serve".to_string(),
        ));
    }

    // Refuse to expose the API without a credential. An unset token would
    // otherwise reject every request at the auth layer anyway.
    if config.gateway.bearer_token.is_none() {
        return Err(CareError::Config(
            "gateway.bearer_token must be set to start the gateway".to_string(),
        ));
    }

    info!(
        agent = %config.agent.name,
        fast_mode = config.agent.fast_mode,
        "starting carebridge"
    );

    let db = Database::open_with_options(&config.storage.database_path, config.storage.wal_mode)
        .await?;
    info!(path = %config.storage.database_path, "storage ready");

    let store = ConversationStore::new(
        db,
        config.limits.clone(),
        config.safety.greeting_message.clone(),
    );

    let mut engine = HttpEngine::new(&config.engine)?;
    if config.agent.fast_mode {
        // Fast mode sends bare turns with no system instruction.
        engine = engine.with_system_prompt(None);
    }
    info!(base_url = %config.engine.base_url, "inference engine configured");

    let registry = Arc::new(GenerationRegistry::new());
    let orchestrator = Arc::new(Orchestrator::new(
        store,
        Arc::new(engine),
        registry,
        &config,
    ));

    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
        bearer_token: config.gateway.bearer_token.clone(),
    };
    let state = GatewayState {
        orchestrator,
        auth: AuthConfig {
            bearer_token: server_config.bearer_token.clone(),
        },
    };

    let shutdown = install_signal_handler();
    let shutdown_wait = shutdown.clone();
    start_server(&server_config, state, async move {
        shutdown_wait.cancelled().await;
    })
    .await?;

    info!("carebridge stopped");
    Ok(())
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the configured `agent.log_level`
/// applies to carebridge crates with `warn` for everything else.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("carebridge={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received. The handler task runs in the background until then.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}
