//! Shared types for the Vantage services
//!
//! Error type, configuration loading, the hex-grid policy, and the wire
//! types exchanged between vantage-api and its clients.

pub mod config;
pub mod error;
pub mod hex;
pub mod types;

pub use error::{Error, Result};
