use time::Duration;

use crate::authz::AuthzPolicy;
use crate::open_resource::{OpenResourceClassifier, DEFAULT_OPEN_RESOURCE_PATTERN};

const DEFAULT_DATA_KEY: &str = "axum-session-gate.data";
const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::hours(1);

/// Which identity wins when cookie-derived and header-derived identity are
/// both present and disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentityPrecedence {
    /// The session established via the correlation cookie is authoritative.
    #[default]
    CookieAuthoritative,

    /// Proxy-injected identity headers are authoritative.
    HeaderAuthoritative,
}

/// An error which can occur while building a [`GateConfig`].
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum ConfigError {
    #[error("login URL is required")]
    MissingLoginUrl,

    #[error("credential URL is required")]
    MissingCredentialUrl,

    #[error("cookie name is required")]
    MissingCookieName,

    #[error("functions URL is required when required functions are configured")]
    MissingFunctionsUrl,

    #[error("invalid open-resource pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Static gate configuration. Immutable after construction; shared
/// read-only across concurrent requests.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub(crate) login_url: String,
    pub(crate) credential_url: String,
    pub(crate) functions_url: Option<String>,
    pub(crate) required_functions: Vec<String>,
    pub(crate) cookie_name: String,
    pub(crate) inactivity_timeout: Duration,
    pub(crate) data_key: String,
    pub(crate) open_resources: OpenResourceClassifier,
    pub(crate) authz_policy: AuthzPolicy,
    pub(crate) precedence: IdentityPrecedence,
    pub(crate) header_trust: bool,
    pub(crate) cookie_echo: bool,
    pub(crate) require_cookie: bool,
}

impl GateConfig {
    /// Starts a builder from the three values every deployment must supply.
    pub fn builder(
        login_url: impl Into<String>,
        credential_url: impl Into<String>,
        cookie_name: impl Into<String>,
    ) -> GateConfigBuilder {
        GateConfigBuilder {
            login_url: login_url.into(),
            credential_url: credential_url.into(),
            cookie_name: cookie_name.into(),
            functions_url: None,
            required_functions: Vec::new(),
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            data_key: DEFAULT_DATA_KEY.to_owned(),
            open_resource_pattern: Some(DEFAULT_OPEN_RESOURCE_PATTERN.to_owned()),
            authz_policy: AuthzPolicy::default(),
            precedence: IdentityPrecedence::default(),
            header_trust: false,
            cookie_echo: false,
            require_cookie: false,
        }
    }

    /// The identity provider's interactive login URL.
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Name of the correlation cookie.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Session key under which the whole record is stored.
    pub fn data_key(&self) -> &str {
        &self.data_key
    }

    /// The sliding-expiration inactivity window.
    pub fn inactivity_timeout(&self) -> Duration {
        self.inactivity_timeout
    }

    /// The compiled open-resource allow-list.
    pub fn open_resources(&self) -> &OpenResourceClassifier {
        &self.open_resources
    }
}

/// Builder for [`GateConfig`]. Validation and open-resource pattern
/// compilation happen in [`build`](GateConfigBuilder::build).
#[derive(Debug, Clone)]
pub struct GateConfigBuilder {
    login_url: String,
    credential_url: String,
    cookie_name: String,
    functions_url: Option<String>,
    required_functions: Vec<String>,
    inactivity_timeout: Duration,
    data_key: String,
    open_resource_pattern: Option<String>,
    authz_policy: AuthzPolicy,
    precedence: IdentityPrecedence,
    header_trust: bool,
    cookie_echo: bool,
    require_cookie: bool,
}

impl GateConfigBuilder {
    /// Enables function gating: callers must hold the required functions,
    /// looked up at `functions_url` when the session is established.
    pub fn with_required_functions(
        mut self,
        functions_url: impl Into<String>,
        required: Vec<String>,
    ) -> Self {
        self.functions_url = Some(functions_url.into());
        self.required_functions = required;
        self
    }

    /// Session-inactivity timeout for the sliding expiration window.
    /// Defaults to one hour.
    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }

    /// Session key under which the whole record is stored.
    pub fn with_data_key(mut self, data_key: impl Into<String>) -> Self {
        self.data_key = data_key.into();
        self
    }

    /// Replaces the default open-resource allow-list pattern. `None`
    /// disables the bypass entirely.
    pub fn with_open_resource_pattern(mut self, pattern: Option<String>) -> Self {
        self.open_resource_pattern = pattern;
        self
    }

    /// Match policy for required functions. Defaults to
    /// [`AuthzPolicy::RequireAll`].
    pub fn with_authz_policy(mut self, policy: AuthzPolicy) -> Self {
        self.authz_policy = policy;
        self
    }

    /// Precedence between cookie-derived and header-derived identity.
    pub fn with_identity_precedence(mut self, precedence: IdentityPrecedence) -> Self {
        self.precedence = precedence;
        self
    }

    /// Accepts proxy-injected `TRX_USER_DETAILS` / `TRX_VIEW` headers as
    /// identity and view hints.
    pub fn with_header_trust(mut self, header_trust: bool) -> Self {
        self.header_trust = header_trust;
        self
    }

    /// Stores the accepted correlation-cookie value in the record and
    /// re-authenticates when a later request presents a different one.
    pub fn with_cookie_echo(mut self, cookie_echo: bool) -> Self {
        self.cookie_echo = cookie_echo;
        self
    }

    /// Rejects requests missing the correlation cookie outright with a 401
    /// before any other evaluation.
    pub fn with_require_cookie(mut self, require_cookie: bool) -> Self {
        self.require_cookie = require_cookie;
        self
    }

    /// Validates the configuration and compiles the open-resource pattern.
    pub fn build(self) -> Result<GateConfig, ConfigError> {
        if self.login_url.trim().is_empty() {
            return Err(ConfigError::MissingLoginUrl);
        }
        if self.credential_url.trim().is_empty() {
            return Err(ConfigError::MissingCredentialUrl);
        }
        if self.cookie_name.trim().is_empty() {
            return Err(ConfigError::MissingCookieName);
        }
        if !self.required_functions.is_empty()
            && self
                .functions_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
        {
            return Err(ConfigError::MissingFunctionsUrl);
        }

        let open_resources = OpenResourceClassifier::new(self.open_resource_pattern.as_deref())?;

        Ok(GateConfig {
            login_url: self.login_url,
            credential_url: self.credential_url,
            functions_url: self.functions_url,
            required_functions: self.required_functions,
            cookie_name: self.cookie_name,
            inactivity_timeout: self.inactivity_timeout,
            data_key: self.data_key,
            open_resources,
            authz_policy: self.authz_policy,
            precedence: self.precedence,
            header_trust: self.header_trust,
            cookie_echo: self.cookie_echo,
            require_cookie: self.require_cookie,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = GateConfig::builder("https://login.example.com", "https://id.example.com/credential", "trx-session")
            .build()
            .unwrap();

        assert_eq!(config.inactivity_timeout, Duration::hours(1));
        assert_eq!(config.data_key, "axum-session-gate.data");
        assert_eq!(config.authz_policy, AuthzPolicy::RequireAll);
        assert_eq!(config.precedence, IdentityPrecedence::CookieAuthoritative);
        assert!(!config.header_trust);
        assert!(config.open_resources.is_open("/assets/app.css"));
    }

    #[test]
    fn blank_required_fields_are_rejected() {
        assert!(matches!(
            GateConfig::builder("  ", "https://id", "c").build(),
            Err(ConfigError::MissingLoginUrl)
        ));
        assert!(matches!(
            GateConfig::builder("https://login", " ", "c").build(),
            Err(ConfigError::MissingCredentialUrl)
        ));
        assert!(matches!(
            GateConfig::builder("https://login", "https://id", "").build(),
            Err(ConfigError::MissingCookieName)
        ));
    }

    #[test]
    fn function_gating_requires_a_lookup_url() {
        let result = GateConfig::builder("https://login", "https://id", "c")
            .with_required_functions("  ", vec!["report.view".into()])
            .build();
        assert!(matches!(result, Err(ConfigError::MissingFunctionsUrl)));
    }

    #[test]
    fn invalid_pattern_is_fatal_at_build() {
        let result = GateConfig::builder("https://login", "https://id", "c")
            .with_open_resource_pattern(Some("(".into()))
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidPattern(_))));
    }
}
