pub mod error;
pub mod server;
pub mod settings;
pub mod tasks;

pub use error::ApiError;
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
