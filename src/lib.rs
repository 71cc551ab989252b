//! Session-validating identity gate for Axum.
//!
//! This crate provides a Tower middleware which sits in front of a web
//! application and decides, per request, whether the caller is already
//! authenticated against a browser session. When no valid session exists the
//! caller is redirected to an external identity provider; a short-lived
//! assertion token returned by that provider is then exchanged for verified
//! user details, which populate the session store before the request is
//! allowed to proceed.
//!
//! The gate covers four concerns:
//!
//! 1. Classifying open resources (static assets, websocket upgrades) that
//!    bypass authentication entirely,
//! 2. Validating a session against a sliding inactivity window,
//! 3. Exchanging assertion tokens for identity via the [`IdentityClient`],
//! 4. Authorizing the caller's granted functions against a required set.
//!
//! Session persistence is decoupled from the gate: sessions are provided via
//! [`tower-sessions`](tower_sessions), so any engine implementing
//! [`SessionStore`](tower_sessions::SessionStore) is supported. The session
//! layer is composed into [`GateLayer`] so the gate and downstream handlers
//! observe the same session.
//!
//! # Outcomes
//!
//! Every request resolves to one of three [`Outcome`]s: `Proceed` (the
//! request reaches the inner service, with the [`SessionRecord`] available
//! as a request extension and extractor), `Redirect` (a temporary redirect
//! to the configured login URL), or `Reject` (a terminal JSON error
//! response). Identity-provider failures during the token exchange never
//! surface as server errors; they degrade to a fresh login round-trip.
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::{routing::get, Router};
//! use axum_session_gate::{Gate, GateConfig, GateLayer, SessionRecord};
//! use tower_sessions::{MemoryStore, SessionManagerLayer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = GateConfig::builder(
//!         "https://login.example.com",
//!         "https://login.example.com/credential",
//!         "trx-session",
//!     )
//!     .with_required_functions(
//!         "https://login.example.com/functions".to_owned(),
//!         vec!["report.view".to_owned()],
//!     )
//!     .build()
//!     .expect("valid gate configuration");
//!
//!     let session_store = MemoryStore::default();
//!     let session_layer = SessionManagerLayer::new(session_store);
//!     let gate_layer = GateLayer::new(Gate::new(config), session_layer);
//!
//!     async fn handler(record: SessionRecord) -> String {
//!         let details = record.details.expect("gated routes have identity");
//!         format!("Hello, {} {}!", details.first_name, details.last_name)
//!     }
//!
//!     let app = Router::new().route("/", get(handler)).layer(gate_layer);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app.into_make_service()).await.unwrap();
//! }
//! ```

#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod authz;
mod client;
mod config;
mod error;
mod extract;
mod identity;
mod open_resource;
mod record;
mod service;
mod validator;

pub use authz::{authorize, AuthzPolicy};
pub use client::{ClientError, IdentityClient};
pub use config::{ConfigError, GateConfig, GateConfigBuilder, IdentityPrecedence};
pub use error::{ErrorBody, ErrorCode, GateError};
pub use identity::{GateRequest, IdentityRequest, TRX_USER_DETAILS, TRX_VIEW};
pub use open_resource::{OpenResourceClassifier, DEFAULT_OPEN_RESOURCE_PATTERN};
pub use record::{SessionDetails, SessionRecord, UserFunction};
pub use service::{GateLayer, GateService};
pub use tower_sessions;
pub use validator::{Gate, Outcome};
