//! Error types for the registrator
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for registrator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the registrator
#[derive(Error, Debug)]
pub enum Error {
    /// Container runtime errors (event feed, inspection)
    #[error("Container runtime error: {0}")]
    Runtime(String),

    /// Host address lookup errors
    #[error("Address resolution error: {0}")]
    AddressResolution(String),

    /// Transport or client-side failure talking to the DNS provider
    #[error("Transport error: {0}")]
    Transport(String),

    /// Error reported by the DNS provider's service itself
    #[error("Provider error ({code}): {message}")]
    Provider {
        /// Provider error code (e.g. "InvalidChangeBatch")
        code: String,
        /// Provider error message
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a container runtime error
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Create an address resolution error
    pub fn address(msg: impl Into<String>) -> Self {
        Self::AddressResolution(msg.into())
    }

    /// Create a provider transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a provider-reported service error
    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True if the DNS provider itself rejected the request
    pub fn is_provider_error(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }
}
