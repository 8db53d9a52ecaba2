use std::{env, sync::Arc};

use vitalio_server::{ServerBuilder, load_config, observability, worker};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From VITALIO_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (vitalio.toml)
    Default,
    /// No config file present; built-in defaults
    BuiltIn,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (VITALIO_CONFIG)"),
            Self::Default => write!(f, "default"),
            Self::BuiltIn => write!(f, "built-in defaults"),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present; optional for local development.
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    // Initialize tracing early with the default level
    observability::init_tracing();

    let (config_path, source) = resolve_config_path();

    let cfg = match load_config(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = config_path.as_deref().unwrap_or("<none>"),
        source = %source,
        "Configuration loaded"
    );

    observability::apply_logging_level(&cfg.logging.level);

    let (server, update_sender, update_receiver) =
        ServerBuilder::new().with_config(cfg.clone()).build();

    let _workers = worker::spawn_workers(
        update_receiver,
        cfg.watch.workers,
        Arc::new(worker::LoggingHandler),
    );

    tracing::info!(
        channel_capacity = update_sender.capacity(),
        watched_types = ?cfg.watch.resource_types,
        workers = cfg.watch.workers,
        "Resource watch pipeline started"
    );

    if let Err(err) = server.run().await {
        eprintln!("Server error: {err}");
    }
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: VITALIO_CONFIG
/// 3. Default: vitalio.toml (when present)
fn resolve_config_path() -> (Option<String>, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (Some(path), ConfigSource::CliArgument);
            }
        }
    }

    if let Ok(path) = env::var("VITALIO_CONFIG") {
        if !path.is_empty() {
            return (Some(path), ConfigSource::EnvironmentVariable);
        }
    }

    if std::path::Path::new("vitalio.toml").exists() {
        return (Some("vitalio.toml".to_string()), ConfigSource::Default);
    }

    (None, ConfigSource::BuiltIn)
}
