//! # Packet Dispatch
//!
//! Routing of framed packets to application code.
//!
//! - **Dispatcher**: frozen type-tag → handler table
//! - **Observer**: connect / disconnect / unknown-packet lifecycle hooks

pub mod dispatcher;
pub mod observer;
