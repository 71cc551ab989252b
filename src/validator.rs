use std::sync::Arc;

use axum::http::StatusCode;
use time::OffsetDateTime;
use tower_sessions::{session, Session};

use crate::authz::authorize;
use crate::client::IdentityClient;
use crate::config::{GateConfig, IdentityPrecedence};
use crate::error::{ErrorCode, GateError};
use crate::identity::{GateRequest, IdentityRequest};
use crate::record::{SessionDetails, SessionRecord};

/// The gate's per-request decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The request may proceed to the downstream handler. Carries the
    /// session record when one was consulted; open resources skip the
    /// session entirely.
    Proceed(Option<SessionRecord>),

    /// The caller must authenticate; redirect to the login URL.
    Redirect(String),

    /// Terminal error response, produced before any downstream handler runs.
    Reject(StatusCode, ErrorCode),
}

/// The request-authentication gate.
///
/// Holds the immutable [`GateConfig`] and the [`IdentityClient`]; cheap to
/// clone and shared read-only across concurrent requests.
#[derive(Debug, Clone)]
pub struct Gate {
    config: Arc<GateConfig>,
    client: IdentityClient,
}

impl Gate {
    /// Creates a gate with a default HTTP client.
    pub fn new(config: GateConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Uses the provided HTTP client for identity-provider calls. The
    /// embedding layer should configure a bounded timeout on it.
    pub fn with_client(config: GateConfig, http: reqwest::Client) -> Self {
        Self {
            config: Arc::new(config),
            client: IdentityClient::new(http),
        }
    }

    /// The gate's static configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Decides whether the request is already authenticated and current, or
    /// must re-authenticate.
    ///
    /// Identity-provider failures never surface as `Err`: a failed token
    /// exchange degrades to a fresh login round-trip and a failed function
    /// lookup to a terminal error response. Only session-store failures
    /// propagate.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %req.path))]
    pub async fn validate(
        &self,
        req: &GateRequest,
        session: &Session,
    ) -> Result<Outcome, GateError> {
        if req.websocket_upgrade || self.config.open_resources.is_open(&req.path) {
            tracing::debug!("open resource, bypassing gate");
            return Ok(Outcome::Proceed(None));
        }

        if self.config.require_cookie && req.correlation_cookie.is_none() {
            tracing::debug!(cookie = %self.config.cookie_name, "correlation cookie absent");
            return Ok(Outcome::Reject(
                StatusCode::UNAUTHORIZED,
                ErrorCode::UnauthorizedAccess,
            ));
        }

        if req.query_is_malformed() {
            return Ok(Outcome::Reject(
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidQueryString,
            ));
        }

        let identity = req.identity();
        let mut record = self.read_record(session).await?;
        let now = OffsetDateTime::now_utc();

        if record.is_warm(now, self.config.inactivity_timeout)
            && self.cookie_consistent(&record, req)
        {
            if !authorize(
                record.granted_functions(),
                &self.config.required_functions,
                self.config.authz_policy,
            ) {
                return Ok(Outcome::Reject(
                    StatusCode::UNAUTHORIZED,
                    ErrorCode::UnauthorizedAccess,
                ));
            }

            self.apply_view(&mut record, &identity, req);
            record.touch(now);
            self.write_record(session, &record).await?;
            return Ok(Outcome::Proceed(Some(record)));
        }

        // Expired or never established: re-enter the unauthenticated path.
        if let Some(details) = self.trusted_header_details(req) {
            let prefer_header = identity.assertion_token.is_none()
                || self.config.precedence == IdentityPrecedence::HeaderAuthoritative;
            if prefer_header {
                let token = details.trx_isat.clone();
                return self
                    .establish(session, record, details, &token, &identity, req, now)
                    .await;
            }
        }

        if let Some(token) = identity.assertion_token.clone() {
            return match self
                .client
                .exchange_token(&self.config.credential_url, &token)
                .await
            {
                Ok(details) => {
                    self.establish(session, record, details, &token, &identity, req, now)
                        .await
                }
                Err(err) => {
                    // A failed exchange is indistinguishable from "not yet
                    // authenticated"; send the caller back to login.
                    tracing::warn!(err = %err, "token exchange failed");
                    Ok(Outcome::Redirect(self.login_redirect(&identity, &record)))
                }
            };
        }

        let app_id = identity.app_id.as_deref().or(record.app_id.as_deref());
        if app_id.is_none() {
            return Ok(Outcome::Reject(
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidQueryString,
            ));
        }

        let url = self.login_redirect(&identity, &record);
        tracing::debug!(url = %url, "no assertion token, redirecting to login");
        Ok(Outcome::Redirect(url))
    }

    /// Merges verified details into the record and stamps the establishment
    /// timestamp. The session is mutated only after the exchange and any
    /// function lookup fully succeed.
    #[allow(clippy::too_many_arguments)]
    async fn establish(
        &self,
        session: &Session,
        mut record: SessionRecord,
        details: SessionDetails,
        token: &str,
        identity: &IdentityRequest,
        req: &GateRequest,
        now: OffsetDateTime,
    ) -> Result<Outcome, GateError> {
        let functions = match self.config.functions_url.as_deref() {
            Some(url) if !self.config.required_functions.is_empty() => {
                match self
                    .client
                    .fetch_functions(url, token, &self.config.required_functions)
                    .await
                {
                    Ok(functions) => Some(functions),
                    Err(err) => {
                        tracing::error!(err = %err, "function lookup failed");
                        return Ok(Outcome::Reject(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            ErrorCode::VerifyAccessFailed,
                        ));
                    }
                }
            }
            _ => None,
        };

        if !authorize(
            functions.as_deref().unwrap_or_default(),
            &self.config.required_functions,
            self.config.authz_policy,
        ) {
            return Ok(Outcome::Reject(
                StatusCode::UNAUTHORIZED,
                ErrorCode::UnauthorizedAccess,
            ));
        }

        record.establish(details, functions, now);
        self.apply_view(&mut record, identity, req);
        if identity.app_id.is_some() {
            record.app_id = identity.app_id.clone();
        }
        if self.config.cookie_echo {
            record.correlation = req.correlation_cookie.clone();
        }

        session.cycle_id().await?; // Session-fixation mitigation.
        self.write_record(session, &record).await?;

        if let Some(details) = &record.details {
            tracing::debug!(user.id = %details.user_id, "session established");
        }
        Ok(Outcome::Proceed(Some(record)))
    }

    /// A `view` parameter present in the request always overwrites the
    /// stored view, independent of whether re-authentication occurred.
    fn apply_view(&self, record: &mut SessionRecord, identity: &IdentityRequest, req: &GateRequest) {
        let header_view = if self.config.header_trust {
            req.header_view.as_deref()
        } else {
            None
        };

        let chosen = match self.config.precedence {
            IdentityPrecedence::HeaderAuthoritative => {
                header_view.or(identity.view.as_deref())
            }
            IdentityPrecedence::CookieAuthoritative => {
                identity.view.as_deref().or(header_view)
            }
        };

        if let Some(view) = chosen {
            record.view = Some(view.to_owned());
            if let Some(details) = &mut record.details {
                details.app_view = view.to_owned();
            }
        }
    }

    fn cookie_consistent(&self, record: &SessionRecord, req: &GateRequest) -> bool {
        if !self.config.cookie_echo {
            return true;
        }
        match (&record.correlation, &req.correlation_cookie) {
            (Some(stored), Some(presented)) => stored == presented,
            (Some(_), None) => false,
            _ => true,
        }
    }

    fn trusted_header_details(&self, req: &GateRequest) -> Option<SessionDetails> {
        if !self.config.header_trust {
            return None;
        }
        let raw = req.header_user_details.as_deref()?;
        match serde_json::from_str(raw) {
            Ok(details) => Some(details),
            Err(err) => {
                tracing::warn!(err = %err, "unparseable identity header, ignoring");
                None
            }
        }
    }

    /// Builds the login redirect with only the populated parameters.
    fn login_redirect(&self, identity: &IdentityRequest, record: &SessionRecord) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());

        let app_id = identity.app_id.as_deref().or(record.app_id.as_deref());
        for (name, value) in [
            ("appid", app_id),
            ("SSCOMMON", identity.sso_common.as_deref()),
            ("view", identity.view.as_deref()),
            ("PROFILENAME", identity.profile_name.as_deref()),
            ("mode", identity.mode.as_deref()),
        ] {
            if let Some(value) = value {
                query.append_pair(name, value);
            }
        }

        format!("{}?{}", self.config.login_url, query.finish())
    }

    async fn read_record(&self, session: &Session) -> Result<SessionRecord, GateError> {
        match session.get::<SessionRecord>(&self.config.data_key).await {
            Ok(record) => Ok(record.unwrap_or_default()),
            // Malformed stored state reads as absent, never as an error.
            Err(session::Error::SerdeJson(_)) => Ok(SessionRecord::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_record(
        &self,
        session: &Session,
        record: &SessionRecord,
    ) -> Result<(), GateError> {
        session.insert(&self.config.data_key, record).await?;
        Ok(())
    }
}
