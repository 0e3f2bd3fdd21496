//! Error types shared across the bridge crates.
//!
//! The `Display` text of each variant is exactly what the host panel shows
//! to the user, so wording changes here are user-visible.

use std::path::PathBuf;

/// Top-level error type for bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("File not found")]
    FileNotFound { path: PathBuf },

    #[error("No active timeline")]
    NoActiveTimeline,

    #[error("No active project")]
    NoActiveProject,

    #[error("Media pool not available")]
    MediaPoolUnavailable,

    #[error("Resolve API not initialized. Make sure DaVinci Resolve is running.")]
    ApiUnavailable,

    #[error("No active project. Please open or create a project in DaVinci Resolve.")]
    NoProjectOpen,

    #[error("Failed to import or find clip")]
    ClipNotFound,

    #[error("Failed to insert clip: {message}")]
    InsertFailed { message: String },

    #[error("Import failed")]
    ImportFailed,

    #[error("Failed to create bin: {name}")]
    BinCreationFailed { name: String },

    #[error("Failed to create output directory: {message}")]
    OutputDirFailed { message: String },

    #[error("Render timeout")]
    RenderTimeout { waited_secs: u64 },

    #[error("Render completed but file not found")]
    RenderOutputMissing { token: String },

    #[error("{scope} failed: {message}")]
    RenderFailed { scope: String, message: String },

    #[error(
        "File size exceeds {limit} limit. Please use shorter in/out points or lower quality settings."
    )]
    OutputTooLarge { size: u64, limit: String },

    #[error("{message}")]
    InvalidPayload { message: String },

    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("No function specified")]
    NoFunction,

    #[error("{message}")]
    Automation { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using BridgeError.
pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn render_failed(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RenderFailed {
            scope: scope.into(),
            message: message.into(),
        }
    }

    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: msg.into(),
        }
    }

    pub fn automation(msg: impl Into<String>) -> Self {
        Self::Automation {
            message: msg.into(),
        }
    }

    pub fn insert_failed(msg: impl Into<String>) -> Self {
        Self::InsertFailed {
            message: msg.into(),
        }
    }

    /// Whether the process should exit non-zero after reporting this error.
    ///
    /// Only dispatch failures do; everything an operation reports exits 0.
    pub fn is_dispatch_error(&self) -> bool {
        matches!(self, Self::UnknownFunction { .. } | Self::NoFunction)
    }
}
