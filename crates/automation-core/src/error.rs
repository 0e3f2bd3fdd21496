//! Automation API and session errors.

use resolve_bridge_common::BridgeError;

/// A single automation call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("{method} is not available in this Resolve release")]
    MissingMethod { method: String },

    #[error("{message}")]
    Call { method: String, message: String },

    #[error("{method} returned an unexpected value: {detail}")]
    UnexpectedValue { method: String, detail: String },
}

/// Result type alias for automation calls.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn missing_method(method: impl Into<String>) -> Self {
        Self::MissingMethod {
            method: method.into(),
        }
    }

    pub fn call(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Call {
            method: method.into(),
            message: message.into(),
        }
    }

    pub fn unexpected(method: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UnexpectedValue {
            method: method.into(),
            detail: detail.into(),
        }
    }
}

impl From<ApiError> for BridgeError {
    fn from(err: ApiError) -> Self {
        BridgeError::automation(err.to_string())
    }
}

/// Why a session accessor could not produce a handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("automation API unavailable")]
    ApiUnavailable,

    #[error("project manager unavailable")]
    NoProjectManager,

    #[error("no project open")]
    NoProject,

    #[error("no timeline open")]
    NoTimeline,

    #[error("media pool unavailable")]
    NoMediaPool,

    #[error("media pool has no root folder")]
    NoRootFolder,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<SessionError> for BridgeError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::ApiUnavailable => BridgeError::ApiUnavailable,
            SessionError::NoProjectManager | SessionError::NoProject => {
                BridgeError::NoActiveProject
            }
            SessionError::NoTimeline => BridgeError::NoActiveTimeline,
            SessionError::NoMediaPool | SessionError::NoRootFolder => {
                BridgeError::MediaPoolUnavailable
            }
            SessionError::Api(api) => api.into(),
        }
    }
}
