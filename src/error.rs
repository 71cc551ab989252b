use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tower_sessions::session;

/// Terminal error codes carried in the JSON body of a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The query string could not be parsed, or it lacks the parameters
    /// needed to even start a login round-trip.
    InvalidQueryString,

    /// The caller is not authorized: the correlation cookie is missing or
    /// the session lacks a required function.
    UnauthorizedAccess,

    /// The function lookup against the identity provider failed. This is an
    /// authorization-infrastructure failure, not an absence of credentials.
    VerifyAccessFailed,
}

impl ErrorCode {
    /// The wire spelling of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidQueryString => "Invalid-Query-String",
            ErrorCode::UnauthorizedAccess => "Unauthorized-Access",
            ErrorCode::VerifyAccessFailed => "Error-while-verifying-user-access",
        }
    }

    /// Human-readable message mirrored into the response body.
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidQueryString => "Invalid Access",
            ErrorCode::UnauthorizedAccess => "Unauthorized Access",
            ErrorCode::VerifyAccessFailed => "Error while verifying user access",
        }
    }
}

/// JSON body returned with every terminal error response. The `status` field
/// mirrors the HTTP status line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ErrorBody {
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    /// Builds the body for a terminal response.
    pub fn new(status: StatusCode, code: ErrorCode) -> Self {
        Self {
            status: status.as_u16(),
            code: code.as_str().to_owned(),
            message: code.message().to_owned(),
        }
    }
}

/// An error which can occur while evaluating the gate.
///
/// Only session-store failures surface here; identity-provider failures are
/// recovered locally by the validator (they degrade to a login redirect or a
/// terminal error response, never to an `Err`).
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// A mapping to `tower_sessions::session::Error`.
    #[error(transparent)]
    Session(#[from] session::Error),
}
