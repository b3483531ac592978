//! # Utility Modules
//!
//! Supporting utilities shared by the server and its transports.
//!
//! ## Components
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Thread-safe observability counters

pub mod logging;
pub mod metrics;
