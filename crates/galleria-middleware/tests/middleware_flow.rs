//! End-to-end middleware flow tests.
//!
//! These tests drive a chain the way the dispatch engine does: BEFORE units,
//! a handler step, AFTER units, session persistence and serialization.

use std::sync::Arc;

use galleria_core::{ApiError, CurrentUser};
use galleria_middleware::stages::{request_id, REQUEST_ID_HEADER};
use galleria_middleware::{
    Flow, MiddlewareChain, MiddlewareUnit, Reply, RequestContext, SessionManager,
};
use http::header::{COOKIE, LOCATION, SET_COOKIE};
use http::{HeaderMap, HeaderValue, Method, StatusCode};

fn load_user() -> Arc<MiddlewareUnit> {
    Arc::new(MiddlewareUnit::before("load_user", |mut ctx: RequestContext| async move {
        if let Some(id) = ctx.session().user_id() {
            ctx.set_user(CurrentUser {
                id,
                email: None,
                display_name: None,
                tenant_ids: vec!["t1".to_string()],
            });
        }
        Ok(Flow::Continue(ctx))
    }))
}

fn require_auth() -> Arc<MiddlewareUnit> {
    Arc::new(MiddlewareUnit::before("require_auth", |ctx: RequestContext| async move {
        if ctx.user().is_some() {
            return Ok(Flow::Continue(ctx));
        }
        let return_to = ctx.original_url();
        ctx.session().update(|data| data.return_to = Some(return_to));
        Ok(Flow::Respond(Reply::redirect("/auth/login")))
    }))
}

async fn run(
    chain: &MiddlewareChain,
    manager: &SessionManager,
    headers: HeaderMap,
    uri: &str,
) -> Result<(Reply, Option<HeaderValue>), ApiError> {
    let session = manager.load(&headers).await;
    let ctx = RequestContext::builder(Method::GET, uri)
        .headers(headers)
        .session(session.clone())
        .build();
    let meta = ctx.meta();

    let reply = match chain.run_before(ctx).await? {
        Flow::Respond(reply) => reply,
        Flow::Continue(ctx) => {
            let scope = ctx.tenant_scope()?;
            Reply::json(serde_json::json!({ "tenant": scope.tenant_id().as_str() }))
        }
    };
    let reply = chain.run_after(&meta, reply).await?;
    let cookie = manager
        .persist(&session)
        .await
        .map_err(|e| ApiError::internal_with_source("session", e))?;
    Ok((reply, cookie))
}

fn chain() -> MiddlewareChain {
    MiddlewareChain::compose(&[
        &[load_user(), Arc::new(request_id())],
        &[require_auth()],
    ])
}

#[tokio::test]
async fn test_anonymous_request_is_redirected_and_remembered() {
    let manager = SessionManager::in_memory();
    let (reply, cookie) = run(&chain(), &manager, HeaderMap::new(), "/dashboard?tab=2")
        .await
        .unwrap();

    assert_eq!(reply.status(), StatusCode::FOUND);
    assert_eq!(reply.headers()[LOCATION], "/auth/login");
    // AFTER units still run on short-circuited replies.
    assert!(reply.headers().contains_key(REQUEST_ID_HEADER));

    let cookie = cookie.expect("new session issues a cookie");
    let pair = cookie.to_str().unwrap().split(';').next().unwrap().to_string();
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_str(&pair).unwrap());
    let session = manager.load(&headers).await;
    assert_eq!(session.data().return_to.as_deref(), Some("/dashboard?tab=2"));
}

#[tokio::test]
async fn test_authenticated_request_reaches_handler() {
    let manager = SessionManager::in_memory();

    // Log in.
    let session = manager.load(&HeaderMap::new()).await;
    session.update(|data| {
        data.user_id = Some("u1".to_string());
        data.current_tenant_id = Some("t1".to_string());
    });
    let cookie = manager.persist(&session).await.unwrap().unwrap();
    let pair = cookie.to_str().unwrap().split(';').next().unwrap().to_string();

    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_str(&pair).unwrap());
    let (reply, set_cookie) = run(&chain(), &manager, headers, "/api/v1/albums").await.unwrap();

    assert_eq!(reply.status(), StatusCode::OK);
    assert!(set_cookie.is_none());

    let response = reply.into_response(None);
    assert!(response.headers().get(SET_COOKIE).is_none());
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn test_missing_tenant_is_forbidden() {
    let manager = SessionManager::in_memory();
    let session = manager.load(&HeaderMap::new()).await;
    session.update(|data| data.user_id = Some("u1".to_string()));
    let cookie = manager.persist(&session).await.unwrap().unwrap();
    let pair = cookie.to_str().unwrap().split(';').next().unwrap().to_string();

    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_str(&pair).unwrap());
    let err = run(&chain(), &manager, headers, "/api/v1/albums").await.unwrap_err();

    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
}
