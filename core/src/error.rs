//! Error types for the request helper.
//!
//! # Design
//! Argument and environment problems are returned as `AjaxError` from the
//! call that detected them. A request that reaches the server and comes
//! back with a bad status, or that never connects, is not an error at this
//! level: it completes normally and is delivered to the `failure` callback.

use thiserror::Error;

/// Errors returned synchronously by the encoder, factory and orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AjaxError {
    /// Wrong argument type, wrong argument count, or an unsupported method.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Neither the native mechanism nor any legacy identifier could be used.
    #[error("no transport available: {0}")]
    TransportUnavailable(String),

    /// A transport handle was driven out of order, e.g. `send` before `open`.
    #[error("invalid transport state: {0}")]
    InvalidState(String),
}

impl AjaxError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        AjaxError::InvalidArgument(msg.into())
    }
}

/// Failure reported by a mechanism while instantiating or executing an
/// exchange. Surfaces to callers only through `Transport::error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ExchangeError(pub String);

impl ExchangeError {
    pub fn new(msg: impl Into<String>) -> Self {
        ExchangeError(msg.into())
    }
}
