//! HTTP transport to backend services
//!
//! Implements [`ServiceTransport`](stepwise_application::ServiceTransport).
//! Write-style calls send a JSON body, read-style calls a query string.

mod http;

pub use http::HttpServiceTransport;
