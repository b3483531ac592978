//! # Service Layer
//!
//! The user-facing [`Server`](server::Server) and its builder.

pub mod server;
