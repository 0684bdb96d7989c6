//! HTTP surface for the LungScan API.

mod error;
mod handlers;
mod server;
mod state;

pub use error::ApiError;
pub use handlers::router;
pub use server::HttpServer;
pub use state::AppState;
