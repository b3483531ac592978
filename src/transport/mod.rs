//! # Transport Layer
//!
//! Connection handling on top of TCP.
//!
//! ## Components
//! - **Session**: One connected client and its write half
//! - **Registry**: The set of live sessions, used for broadcast
//! - **TCP**: Accept loop, per-session dispatch worker and a client helper

pub mod registry;
pub mod session;
pub mod tcp;
