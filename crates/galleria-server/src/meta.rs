//! Built-in endpoints: health probes and API documentation.
//!
//! | path                     | answers                                       |
//! |--------------------------|-----------------------------------------------|
//! | `/healthz`               | 200/503 `{data:{healthy}}`                    |
//! | `/readyz`                | 200/503 `{data:{ready}}`                      |
//! | `/openapi.json`          | the generated OpenAPI document                |
//! | `/api.html`              | the RapiDoc page                              |
//! | `/assets/rapidoc-min.js` | the RapiDoc script from the assets directory  |
//!
//! None of them appear in the OpenAPI document.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use galleria_core::ApiError;
use galleria_middleware::{Reply, APPLICATION_JSON};
use http::header::CACHE_CONTROL;
use http::{HeaderValue, Method, StatusCode};
use serde_json::json;

use crate::controller::{controller as new_controller, ControllerBuilder};
use crate::endpoint::endpoint;
use crate::health::HealthRegistry;

/// File name of the documentation viewer script.
pub const RAPIDOC_SCRIPT: &str = "rapidoc-min.js";

const SCRIPT_CONTENT_TYPE: &str = "text/javascript; charset=utf-8";

pub(crate) struct MetaAssets {
    pub(crate) openapi_json: String,
    pub(crate) docs_html: String,
    pub(crate) assets_dir: PathBuf,
}

pub(crate) fn controller(health: Arc<HealthRegistry>, assets: MetaAssets) -> ControllerBuilder {
    let readiness = Arc::clone(&health);
    let openapi = Bytes::from(assets.openapi_json);
    let page = assets.docs_html;
    let script = assets.assets_dir.join(RAPIDOC_SCRIPT);

    new_controller("/").endpoints(vec![
        endpoint(Method::GET, "/healthz", "healthz")
            .hide_from_openapi()
            .raw_handler(move |_ctx| {
                let health = Arc::clone(&health);
                async move {
                    let healthy = health.check_health().await;
                    Ok(probe_reply(json!({ "healthy": healthy }), healthy))
                }
            }),
        endpoint(Method::GET, "/readyz", "readyz")
            .hide_from_openapi()
            .raw_handler(move |_ctx| {
                let health = Arc::clone(&readiness);
                async move {
                    let ready = health.check_readiness().await;
                    Ok(probe_reply(json!({ "ready": ready }), ready))
                }
            }),
        endpoint(Method::GET, "/openapi.json", "openApiDocument")
            .hide_from_openapi()
            .raw_handler(move |_ctx| {
                let body = openapi.clone();
                async move { Ok(Reply::bytes(body, APPLICATION_JSON)) }
            }),
        endpoint(Method::GET, "/api.html", "apiReference")
            .hide_from_openapi()
            .raw_handler(move |_ctx| {
                let page = page.clone();
                async move { Ok(Reply::html(page)) }
            }),
        endpoint(Method::GET, "/assets/rapidoc-min.js", "docsViewerScript")
            .hide_from_openapi()
            .raw_handler(move |_ctx| {
                let script = script.clone();
                async move {
                    match tokio::fs::read(&script).await {
                        Ok(content) => Ok(Reply::bytes(content, SCRIPT_CONTENT_TYPE)
                            .with_header(CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400"))),
                        Err(err) if err.kind() == io::ErrorKind::NotFound => {
                            tracing::warn!(path = %script.display(), "documentation script missing");
                            Err(ApiError::not_found("Not found"))
                        }
                        Err(err) => Err(ApiError::internal_with_source(
                            "Failed to read documentation script",
                            err,
                        )),
                    }
                }
            }),
    ])
}

fn probe_reply(data: serde_json::Value, ok: bool) -> Reply {
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Reply::json(data).with_status(status)
}
