pub mod api;
pub mod config;
pub mod handlers;
pub mod observability;
pub mod routes;
pub mod server;
pub mod watch;
pub mod worker;

pub use config::{AppConfig, ConfigError, load_config};
pub use handlers::AppState;
pub use server::{AppParts, ServerBuilder, VitalioServer, build_app};
pub use watch::{ResourceWatch, generate_resource_watch};
pub use worker::{LoggingHandler, UpdateHandler, spawn_workers};
