mod cleanup_routes;
pub mod config;
mod http_layers;
#[allow(clippy::module_inception)]
pub mod server;
pub mod state;

pub use cleanup_routes::{cleanup_routes, CLEANUP_ROUTES_PREFIX};
pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
