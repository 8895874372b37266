//! Error types for Runquest
//!
//! Gameplay operations never fail: out-of-range telemetry is clamped and
//! invalid-state calls are ignored. Errors only surface when configuration
//! tables are malformed or when JSON / file I/O fails.

use thiserror::Error;

/// Errors that can cross the engine boundary
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a persistence collaborator.
///
/// The engine logs these and keeps its in-memory state authoritative.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read stored state: {0}")]
    Read(String),

    #[error("Failed to write stored state: {0}")]
    Write(String),

    #[error("Stored state is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
