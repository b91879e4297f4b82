//! Reasoning oracle adapter
//!
//! Implements [`OracleGateway`](stepwise_application::OracleGateway) over the
//! on-demand chat endpoint of a hosted inference service.

mod gateway;
mod request;

pub use gateway::{CHAT_PATH, HttpOracleGateway, OracleSettings};
