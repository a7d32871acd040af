pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod state;

pub use config::{AppConfig, LoggingConfig, ServerConfig, StorageBackend, SweepConfig};
pub use observability::{apply_logging_level, init_tracing};
pub use server::{ServerBuilder, VeracityServer, build_app};
pub use state::AppState;
