//! # Framework Errors
//!
//! This module defines the common error types used throughout the engine.
//! Configuration errors are local and immediate; invocation-time errors
//! travel through the same callback/future channel as success so callers
//! never have to distinguish a sync failure from an async one.

use thiserror::Error;

/// Errors raised at configuration or registration time.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The option name is not part of the recognized option schema.
    #[error("unknown option: {0}")]
    UnknownOption(String),
    /// The supplied value does not match the option's declared kind.
    #[error("invalid value for option {option}: expected {expected}")]
    InvalidOptionValue {
        option: String,
        expected: &'static str,
    },
    /// Service names must be non-empty.
    #[error("service name must be a non-empty string")]
    EmptyServiceName,
}

/// The failure outcome of an invocation, delivered through the callback
/// and future channels. Cloneable so both channels can observe the same
/// settlement.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    /// `call` or `transfer` targeted an unregistered name.
    #[error("service not found: {0}")]
    ServiceNotFound(String),
    /// A handler failed, either by settling with an error or by
    /// returning `Err` from its future.
    #[error("{0}")]
    Handler(String),
    /// A handler panicked; caught at the manager boundary.
    #[error("handler for service '{service}' panicked")]
    HandlerPanic { service: String },
    /// Every handle to the context was dropped before it settled.
    #[error("handler for service '{service}' finished without settling")]
    Abandoned { service: String },
}

impl From<String> for CallError {
    fn from(message: String) -> Self {
        CallError::Handler(message)
    }
}

impl From<&str> for CallError {
    fn from(message: &str) -> Self {
        CallError::Handler(message.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CallError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CallError::Handler(err.to_string())
    }
}

impl From<serde_json::Error> for CallError {
    fn from(err: serde_json::Error) -> Self {
        CallError::Handler(err.to_string())
    }
}

impl From<AlreadySettled> for CallError {
    fn from(err: AlreadySettled) -> Self {
        CallError::Handler(err.to_string())
    }
}

/// Returned when `result` or `error` is invoked on an already-settled
/// context. Settling twice is a programming defect and is surfaced
/// loudly instead of being swallowed.
#[derive(Debug, Error)]
#[error("context already settled for service '{service}'")]
pub struct AlreadySettled {
    pub service: String,
}
