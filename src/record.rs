use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// The verified identity record returned by the identity provider in
/// exchange for an assertion token.
///
/// Created only by a successful token exchange; never partially populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct SessionDetails {
    pub account_id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub default_profile: String,
    #[serde(default)]
    pub app_view: String,
    /// The assertion token the details were exchanged for.
    #[serde(default)]
    pub trx_isat: String,
}

/// A single granted capability returned by the identity provider's function
/// lookup. A session holds a set of these, unique by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFunction {
    /// Capability identifier, e.g. `report.view`.
    pub id: String,
    /// Provider-assigned value for the capability.
    pub value: String,
}

/// Per-browser-session state, serialized as a unit under a single session
/// data key.
///
/// Invariant: `details` and `established_at` are set atomically together by
/// [`establish`](SessionRecord::establish) — no record carries identity
/// fields without an establishment timestamp, and vice versa.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Verified identity, present only on established sessions.
    pub details: Option<SessionDetails>,

    /// Free-form view hint; overwritten by a `view` request parameter on
    /// every successful validation.
    pub view: Option<String>,

    /// Last `appid` seen on this session, used to parameterize the login
    /// redirect when a later request omits it.
    pub app_id: Option<String>,

    /// Echo of the correlation-cookie value accepted at establishment.
    pub correlation: Option<String>,

    /// Granted function identifiers fetched at establishment. `None` when
    /// function gating is not configured.
    pub functions: Option<Vec<UserFunction>>,

    /// When the identity was last verified; slides forward on every
    /// validated request.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub established_at: Option<OffsetDateTime>,
}

impl SessionRecord {
    /// Whether the session was established within the inactivity window.
    pub fn is_warm(&self, now: OffsetDateTime, timeout: Duration) -> bool {
        match self.established_at {
            Some(established) => now - established <= timeout,
            None => false,
        }
    }

    /// Records verified identity plus the establishment timestamp in one
    /// step. Session mutation happens only through this method after a fully
    /// successful exchange, never incrementally.
    pub fn establish(
        &mut self,
        details: SessionDetails,
        functions: Option<Vec<UserFunction>>,
        now: OffsetDateTime,
    ) {
        self.details = Some(details);
        self.functions = functions;
        self.established_at = Some(now);
    }

    /// Extends the sliding expiration window.
    pub fn touch(&mut self, now: OffsetDateTime) {
        if self.established_at.is_some() {
            self.established_at = Some(now);
        }
    }

    pub(crate) fn granted_functions(&self) -> &[UserFunction] {
        self.functions.as_deref().unwrap_or_default()
    }
}
