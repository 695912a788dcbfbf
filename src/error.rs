//! Error types for ridebot.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Stale write for {entity} {id}: expected version {expected}")]
    Conflict {
        entity: String,
        id: String,
        expected: i64,
    },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DatabaseError {
    /// Whether this error is an optimistic-concurrency rejection.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Messaging channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Channel {name} rejected the request with status {status}: {body}")]
    Rejected {
        name: String,
        status: u16,
        body: String,
    },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),
}

/// Address resolver errors.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("Resolver request failed: {0}")]
    RequestFailed(String),

    #[error("Resolver returned status {status}: {message}")]
    BadStatus { status: String, message: String },

    #[error("Resolver timed out after {0:?}")]
    Timeout(Duration),
}

/// Date/time normalization failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("Could not understand date/time: {0}")]
    Unrecognized(String),

    #[error("Date/time is in the past: {0}")]
    InPast(String),

    #[error("Date/time out of range: {0}")]
    OutOfRange(String),
}

/// Booking creation errors.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Conversation for {phone} is missing {field}")]
    Incomplete { phone: String, field: &'static str },

    #[error("Conversation for {phone} is not awaiting confirmation (step {step})")]
    NotConfirmable { phone: String, step: String },

    #[error("Storage failure: {0}")]
    Storage(#[from] DatabaseError),
}

impl BookingError {
    /// Whether the failure was a lost race against another write.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_conflict())
    }
}
