use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{
    http::{header::LOCATION, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tower_cookies::CookieManager;
use tower_layer::Layer;
use tower_service::Service;
use tower_sessions::{
    service::{CookieController, PlaintextCookie},
    Session, SessionManager, SessionManagerLayer, SessionStore,
};
use tracing::Instrument;

use crate::{error::ErrorBody, Gate, GateRequest, Outcome};

/// A middleware that runs the [`Gate`] ahead of the inner service.
///
/// A passing request proceeds with its [`SessionRecord`](crate::SessionRecord)
/// inserted as a request extension; a failing one terminates here with a
/// redirect or a JSON error response.
#[derive(Debug, Clone)]
pub struct GateService<S> {
    inner: S,
    gate: Gate,
}

impl<S> GateService<S> {
    /// Create a new [`GateService`] wrapping the inner service.
    pub fn new(inner: S, gate: Gate) -> Self {
        Self { inner, gate }
    }
}

impl<ReqBody, S> Service<Request<ReqBody>> for GateService<S>
where
    S: Service<Request<ReqBody>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let span = tracing::info_span!("gate", user.id = tracing::field::Empty);

        let gate = self.gate.clone();

        // Because the inner service can panic until ready, we need to ensure we only
        // use the ready service.
        //
        // See: https://docs.rs/tower/latest/tower/trait.Service.html#be-careful-when-cloning-inner-services
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(
            async move {
                let Some(session) = req.extensions().get::<Session>().cloned() else {
                    tracing::error!("session not found in request extensions");
                    return Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response());
                };

                let gate_req = GateRequest::from_request(&req, gate.config().cookie_name());

                let outcome = match gate.validate(&gate_req, &session).await {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        tracing::error!(err = %err, "could not evaluate gate");
                        return Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response());
                    }
                };

                match outcome {
                    Outcome::Proceed(record) => {
                        if let Some(record) = record {
                            if let Some(details) = &record.details {
                                tracing::Span::current()
                                    .record("user.id", details.user_id.as_str());
                            }
                            req.extensions_mut().insert(record);
                        }
                        inner.call(req).await
                    }
                    Outcome::Redirect(url) => Ok(redirect_response(&url)),
                    Outcome::Reject(status, code) => {
                        Ok((status, Json(ErrorBody::new(status, code))).into_response())
                    }
                }
            }
            .instrument(span),
        )
    }
}

fn redirect_response(url: &str) -> Response {
    match HeaderValue::from_str(url) {
        Ok(location) => {
            let mut res = Response::default();
            *res.status_mut() = StatusCode::TEMPORARY_REDIRECT;
            res.headers_mut().insert(LOCATION, location);
            res
        }
        Err(err) => {
            tracing::error!(err = %err, "invalid redirect target");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// A layer for running the [`Gate`] in front of a service.
///
/// Composes the session layer with the gate, so the session the gate reads
/// and the one the downstream handler sees are the same.
#[derive(Debug, Clone)]
pub struct GateLayer<Sessions: SessionStore, C: CookieController = PlaintextCookie> {
    gate: Gate,
    session_manager_layer: SessionManagerLayer<Sessions, C>,
}

impl<Sessions: SessionStore, C: CookieController> GateLayer<Sessions, C> {
    /// Create a new [`GateLayer`] with the provided gate and session layer.
    pub fn new(gate: Gate, session_manager_layer: SessionManagerLayer<Sessions, C>) -> Self {
        Self {
            gate,
            session_manager_layer,
        }
    }
}

impl<S, Sessions: SessionStore, C: CookieController> Layer<S> for GateLayer<Sessions, C> {
    type Service = CookieManager<SessionManager<GateService<S>, Sessions, C>>;

    fn layer(&self, inner: S) -> Self::Service {
        let gate_service = GateService {
            inner,
            gate: self.gate.clone(),
        };

        self.session_manager_layer.layer(gate_service)
    }
}
