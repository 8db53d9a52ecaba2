use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use vitalio_core::{UpdateExtractor, UpdateReceiver, UpdateSender, update_channel};
use vitalio_storage::create_memory_storage;

use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::routes::build_router;

/// Everything `build_app` wires together: the router plus both ends of the
/// update channel. The channel is created once here and injected into each
/// interceptor, so tests get an isolated channel per app.
pub struct AppParts {
    pub router: Router,
    pub update_sender: UpdateSender,
    pub update_receiver: UpdateReceiver,
}

pub fn build_app(cfg: &AppConfig) -> AppParts {
    let state = AppState {
        storage: create_memory_storage(),
    };
    let extractor = Arc::new(UpdateExtractor::with_default_rules(
        cfg.watch.timestamp_fallback,
    ));
    let (update_sender, update_receiver) = update_channel(cfg.watch.channel_capacity);

    let router = build_router(cfg, state, &update_sender, &extractor);

    AppParts {
        router,
        update_sender,
        update_receiver,
    }
}

pub struct VitalioServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub fn build(self) -> (VitalioServer, UpdateSender, UpdateReceiver) {
        let parts = build_app(&self.config);
        (
            VitalioServer {
                addr: self.addr,
                app: parts.router,
            },
            parts.update_sender,
            parts.update_receiver,
        )
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VitalioServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
