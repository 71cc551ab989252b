use axum::http::{header, HeaderMap, Request};
use tower_cookies::cookie::Cookie;

/// Header carrying a proxy-injected identity hint (JSON-encoded
/// [`SessionDetails`](crate::SessionDetails)).
pub const TRX_USER_DETAILS: &str = "TRX_USER_DETAILS";

/// Header carrying a proxy-injected view hint.
pub const TRX_VIEW: &str = "TRX_VIEW";

/// Identity-relevant query parameters, parsed once per request and immutable
/// after extraction. Blank values read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct IdentityRequest {
    pub app_id: Option<String>,
    pub mode: Option<String>,
    /// The short-lived assertion token (`TRX-ISAT`).
    pub assertion_token: Option<String>,
    pub view: Option<String>,
    pub sso_common: Option<String>,
    pub profile_name: Option<String>,
}

impl IdentityRequest {
    /// Parses the raw query string. Parameter names follow the identity
    /// provider's spelling exactly.
    pub fn from_query(query: &str) -> Self {
        let mut parsed = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let value = Some(value.to_owned());

            match key.as_ref() {
                "appid" => parsed.app_id = value,
                "mode" => parsed.mode = value,
                "TRX-ISAT" => parsed.assertion_token = value,
                "view" => parsed.view = value,
                "SSCOMMON" => parsed.sso_common = value,
                "PROFILENAME" => parsed.profile_name = value,
                _ => {}
            }
        }

        parsed
    }
}

/// The normalized, request-scoped inputs the gate evaluates: path, query,
/// the correlation cookie, and proxy headers.
#[derive(Debug, Clone, Default)]
#[allow(missing_docs)]
pub struct GateRequest {
    pub path: String,
    pub query: String,
    pub correlation_cookie: Option<String>,
    pub header_user_details: Option<String>,
    pub header_view: Option<String>,
    pub websocket_upgrade: bool,
}

impl GateRequest {
    /// Extracts the gate's inputs from an inbound request. `cookie_name`
    /// selects the correlation cookie.
    pub fn from_request<T>(req: &Request<T>, cookie_name: &str) -> Self {
        let headers = req.headers();

        Self {
            path: req.uri().path().to_owned(),
            query: req.uri().query().unwrap_or_default().to_owned(),
            correlation_cookie: cookie_value(headers, cookie_name),
            header_user_details: header_value(headers, TRX_USER_DETAILS),
            header_view: header_value(headers, TRX_VIEW),
            websocket_upgrade: is_websocket_upgrade(headers),
        }
    }

    /// Detects invalid percent-escapes, the one way a query string can be
    /// malformed after transport framing.
    pub fn query_is_malformed(&self) -> bool {
        let bytes = self.query.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'%' {
                match (bytes.get(i + 1), bytes.get(i + 2)) {
                    (Some(hi), Some(lo))
                        if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() =>
                    {
                        i += 3;
                    }
                    _ => return true,
                }
            } else {
                i += 1;
            }
        }
        false
    }

    /// Parses the identity-relevant query parameters.
    pub fn identity(&self) -> IdentityRequest {
        IdentityRequest::from_query(&self.query)
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(|cookie| cookie.ok())
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty())
}

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("websocket"))
}
