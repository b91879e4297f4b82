//! Infrastructure layer for stepwise
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod logging;
pub mod oracle;
pub mod transport;

// Re-export commonly used types
pub use config::{ConfigLoader, FileConfig, FileOutputConfig};
pub use logging::JsonlConversationLogger;
pub use oracle::{HttpOracleGateway, OracleSettings};
pub use transport::HttpServiceTransport;
