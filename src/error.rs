//! Error Types for KVMemo
//!
//! This module defines the error taxonomy shared across the engine.
//! Every fallible public operation returns a `KvError`, and the command
//! layer translates it into a wire-level `-ERR` reply.
//!
//! Validation errors are returned to the caller before any state is
//! mutated. Background work (TTL sweep, eviction) never surfaces errors
//! to clients; it logs and continues. Invariant violations inside the
//! core (for example a memory counter underflow) are programming faults
//! and panic instead of returning an error.

use thiserror::Error;

/// Errors produced by the storage engine and its configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KvError {
    /// Malformed or oversized input, disallowed TTL, or a configuration
    /// value that failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Key absent or expired. Never escapes to the wire; a `GET` on a
    /// missing key surfaces as a miss, not an error.
    #[error("key not found")]
    NotFound,

    /// Reserved for future back-pressure when eviction cannot keep up.
    /// The engine currently accepts writes and logs sustained pressure.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Malformed frame or command at the protocol boundary.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Invariant violation; the caller should treat the connection as
    /// unusable.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KvError {
    /// Shorthand for an `InvalidArgument` error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        KvError::InvalidArgument(message.into())
    }
}

/// Result alias used throughout the engine.
pub type KvResult<T> = Result<T, KvError>;
