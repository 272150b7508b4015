//! The per-request state machine.
//!
//! ```text
//! MATCHING ─► BEFORE_MIDDLEWARE ─► INPUT_VALIDATION ─► HANDLER_EXECUTION
//!    │              │ respond              │                  │
//!    │              ▼                      ▼                  ▼
//!    │     RESPONSE_SERIALIZATION ◄── AFTER_MIDDLEWARE ◄──────┘
//!    │              ▲
//!    └─► ERROR ─────┘   (reachable from every stage)
//! ```
//!
//! Errors from any stage become `{error:{message, details?}}` with the
//! status of their [`ApiError`] kind. The session is persisted after the
//! response is produced, whatever the outcome.

use std::time::Instant;

use bytes::Bytes;
use galleria_core::{ApiError, RequestId};
use galleria_middleware::stages::REQUEST_ID_HEADER;
use galleria_middleware::{Flow, Reply, Request, RequestContext, Response};
use http::header::{CONTENT_TYPE, SET_COOKIE};
use http::request::Parts;
use http::Method;
use http_body_util::BodyExt;
use serde_json::{Map, Value};
use tracing::Instrument;

use crate::app::{App, RouteEntry};
use crate::endpoint::Target;

impl App {
    /// Handles a buffered request.
    pub async fn handle(&self, request: Request) -> Response {
        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };
        self.dispatch(parts, body).await
    }

    /// Handles a request given as head and body.
    pub async fn dispatch(&self, parts: Parts, body: Bytes) -> Response {
        let request_id = RequestId::from_header_or_new(
            parts
                .headers
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok()),
        );
        let span = tracing::info_span!(
            "http.request",
            request_id = %request_id,
            method = %parts.method,
            path = %parts.uri.path(),
            endpoint = tracing::field::Empty,
        );

        self.dispatch_in_span(request_id, parts, body)
            .instrument(span)
            .await
    }

    async fn dispatch_in_span(&self, request_id: RequestId, parts: Parts, body: Bytes) -> Response {
        let started = Instant::now();

        let Some(matched) = self.ctx.router.match_route(&parts.method, parts.uri.path()) else {
            tracing::debug!("no route matched");
            let response = self.error_response(&ApiError::not_found("Not found"));
            log_completion(&response, started);
            return response;
        };
        let route = &self.ctx.routes[matched.index()];
        tracing::Span::current().record("endpoint", route.name());

        let session = self.ctx.sessions.load(&parts.headers).await;
        let ctx = RequestContext::builder(parts.method, "/")
            .uri(parts.uri)
            .request_id(request_id)
            .headers(parts.headers)
            .body(body)
            .path_params(matched.into_params())
            .endpoint(route.name())
            .session(session.clone())
            .build();

        let mut response = match self.run(route, ctx).await {
            Ok(reply) => reply.into_response(route.endpoint().content_type()),
            Err(err) => self.error_response(&err),
        };

        match self.ctx.sessions.persist(&session).await {
            Ok(Some(cookie)) => {
                response.headers_mut().append(SET_COOKIE, cookie);
            }
            Ok(None) => {}
            Err(err) => tracing::error!(error = %err, "failed to persist session"),
        }

        log_completion(&response, started);
        response
    }

    async fn run(&self, route: &RouteEntry, ctx: RequestContext) -> Result<Reply, ApiError> {
        let meta = ctx.meta();

        let mut ctx = match route.chain().run_before(ctx).await? {
            Flow::Continue(ctx) => ctx,
            Flow::Respond(reply) => return Ok(reply),
        };

        if let Some(input) = route.endpoint().input() {
            let raw = merged_input(&ctx)?;
            input.parse(raw, &mut ctx)?;
        }

        let reply = match route.endpoint().target() {
            Target::Handler(handler) => {
                let data = handler(ctx).await?;
                Reply::json(data).with_status(route.endpoint().status())
            }
            Target::Raw(handler) => handler(ctx).await?,
            Target::View { template, data } => {
                let data = data(ctx).await?;
                let renderer = self
                    .ctx
                    .renderer
                    .as_ref()
                    .ok_or_else(|| ApiError::internal("No template renderer configured"))?;
                let html = renderer
                    .render(template, &data)
                    .map_err(|e| ApiError::internal_with_source("Failed to render view", e))?;
                Reply::html(html)
            }
        };

        route.chain().run_after(&meta, reply).await
    }

    pub(crate) fn error_response(&self, err: &ApiError) -> Response {
        let status = err.status_code();
        if status.is_server_error() {
            tracing::error!(error = %err, source = ?std::error::Error::source(err), "request failed");
        } else {
            tracing::debug!(error = %err, "request rejected");
        }

        let envelope = err.to_envelope(self.ctx.expose_internal_errors);
        let body = serde_json::to_value(&envelope).unwrap_or(Value::Null);
        Reply::raw_json(body).with_status(status).into_response(None)
    }
}

/// Merges path parameters, query values and body fields, later sources winning.
fn merged_input(ctx: &RequestContext) -> Result<Value, ApiError> {
    let mut merged = Map::new();

    for (name, value) in ctx.path_params() {
        merged.insert(name.clone(), Value::String(value.clone()));
    }
    for (name, value) in ctx.query_pairs()? {
        merged.insert(name, Value::String(value));
    }

    let body = ctx.body();
    if body.iter().all(u8::is_ascii_whitespace) || *ctx.method() == Method::GET {
        return Ok(Value::Object(merged));
    }

    let is_form = ctx
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
            .map_err(|_| ApiError::bad_request("Malformed form body"))?;
        for (name, value) in pairs {
            merged.insert(name, Value::String(value));
        }
        return Ok(Value::Object(merged));
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => {
            merged.extend(fields);
            Ok(Value::Object(merged))
        }
        Ok(_) => Err(ApiError::bad_request("Request body must be a JSON object")),
        Err(err) => {
            tracing::debug!(error = %err, "malformed JSON body");
            Err(ApiError::bad_request("Malformed JSON body"))
        }
    }
}

fn log_completion(response: &Response, started: Instant) {
    tracing::info!(
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_secs_f64() * 1000.0,
        "request completed"
    );
}
