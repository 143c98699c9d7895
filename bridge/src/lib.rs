pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod telegram;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use errors::BridgeError;
pub use server::{create_router, start_server, AppState};
pub use telegram::{ClientFactory, ClientManager, Credentials, MessengerClient};
