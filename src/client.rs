use axum::http::StatusCode;
use serde::Serialize;

use crate::record::{SessionDetails, UserFunction};

/// An error returned by the identity provider exchange.
///
/// Every variant is treated as "not authenticated" / "not authorized" by the
/// caller; there is no implicit success path.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The provider could not be reached, or the call timed out.
    #[error("identity provider unreachable: {0}")]
    Transport(reqwest::Error),

    /// The provider answered outside the accepted status range.
    #[error("identity provider answered {0}")]
    BadStatus(StatusCode),

    /// The response body did not decode as the expected shape.
    #[error("could not decode identity provider response: {0}")]
    Decode(reqwest::Error),
}

#[derive(Debug, Serialize)]
struct FunctionQuery<'a> {
    token: &'a str,
    functions: &'a [String],
}

/// Performs the token-exchange and function-lookup calls against the
/// identity provider.
///
/// The client imposes no timeout of its own; the embedding layer should
/// supply a [`reqwest::Client`] with a bounded timeout, which then surfaces
/// as [`ClientError::Transport`].
#[derive(Debug, Clone, Default)]
pub struct IdentityClient {
    http: reqwest::Client,
}

impl IdentityClient {
    /// Wraps the provided HTTP client.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Exchanges a short-lived assertion token for verified user details.
    ///
    /// The raw token is the POST body; success is exactly HTTP 200 or 201.
    #[tracing::instrument(level = "debug", skip_all, err)]
    pub async fn exchange_token(
        &self,
        credential_url: &str,
        assertion_token: &str,
    ) -> Result<SessionDetails, ClientError> {
        let response = self
            .http
            .post(credential_url)
            .body(assertion_token.to_owned())
            .send()
            .await
            .map_err(ClientError::Transport)?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(ClientError::BadStatus(status));
        }

        response.json().await.map_err(ClientError::Decode)
    }

    /// Looks up which of the requested functions the token's user holds.
    ///
    /// Success is any 2xx; an empty result is valid and distinct from a
    /// transport error.
    #[tracing::instrument(level = "debug", skip_all, err)]
    pub async fn fetch_functions(
        &self,
        functions_url: &str,
        token: &str,
        requested: &[String],
    ) -> Result<Vec<UserFunction>, ClientError> {
        let response = self
            .http
            .post(functions_url)
            .json(&FunctionQuery {
                token,
                functions: requested,
            })
            .send()
            .await
            .map_err(ClientError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::BadStatus(status));
        }

        response.json().await.map_err(ClientError::Decode)
    }
}
