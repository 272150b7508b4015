//! Browser login, tenant switching and the rendered pages.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{log_in, logged_in, AUTHORIZE_URL};
use galleria_albums::AlbumStatus;
use galleria_middleware::{MemorySessionStore, SessionConfig, SessionManager};
use galleria_test::TestClient;
use serde_json::json;

#[tokio::test]
async fn test_login_redirects_to_provider_with_state() {
    let client = common::client();

    let response = client.get("/auth/login").send().await;
    response.assert_status_code(302);

    let location = response.location().unwrap();
    assert!(location.starts_with(AUTHORIZE_URL));
    assert!(location.contains("state="));
    assert!(!client.cookies().is_empty());
}

#[tokio::test]
async fn test_callback_lands_on_dashboard_by_default() {
    let client = common::client();
    assert_eq!(log_in(&client, "ada-code").await, "/dashboard");
}

#[tokio::test]
async fn test_callback_rejects_wrong_state() {
    let client = common::client();
    client.get("/auth/login").send().await.assert_status_code(302);

    let response = client
        .get("/auth/callback?code=ada-code&state=forged")
        .send()
        .await;
    response.assert_status_code(400);
}

#[tokio::test]
async fn test_callback_without_login_is_rejected() {
    let client = common::client();

    let response = client
        .get("/auth/callback?code=ada-code&state=anything")
        .send()
        .await;
    response.assert_status_code(400);
}

#[tokio::test]
async fn test_callback_with_unknown_code_fails_login() {
    let client = common::client();
    let login = client.get("/auth/login").send().await;
    let state = login.location().unwrap().split_once("state=").unwrap().1.to_string();

    let response = client
        .get("/auth/callback")
        .query(&[("code", "bogus"), ("state", state.as_str())])
        .send()
        .await;
    response.assert_status_code(401);
    assert_eq!(response.error_message().unwrap(), "Login failed");
}

#[tokio::test]
async fn test_provider_error_fails_login() {
    let client = common::client();
    let login = client.get("/auth/login").send().await;
    let state = login.location().unwrap().split_once("state=").unwrap().1.to_string();

    let response = client
        .get("/auth/callback")
        .query(&[("error", "access_denied"), ("state", state.as_str())])
        .send()
        .await;
    response.assert_status_code(401);
}

#[tokio::test]
async fn test_dashboard_requires_login() {
    let client = common::client();
    client.get("/dashboard").send().await.assert_redirect("/auth/login");
}

#[tokio::test]
async fn test_dashboard_renders_tenants_and_counts() {
    let client = logged_in("ada-code").await;
    client
        .post("/api/v1/albums")
        .json(&json!({"name": "Summer", "status": AlbumStatus::Published}))
        .send()
        .await
        .assert_status_code(201);

    let response = client.get("/dashboard").send().await;
    response.assert_status_code(200);
    assert!(response.content_type().unwrap().starts_with("text/html"));

    let html = response.text().unwrap();
    assert!(html.contains("Welcome, Ada"));
    assert!(html.contains("org-1"));
    assert!(html.contains(r#"value="5""#));
    assert!(html.contains("Published: 1"));
}

#[tokio::test]
async fn test_home_page_for_anonymous_and_signed_in() {
    let client = common::client();

    let anonymous = client.get("/").send().await;
    anonymous.assert_status_code(200);
    assert!(anonymous.text().unwrap().contains("/auth/login"));

    log_in(&client, "ada-code").await;
    assert!(client.get("/").send().await.text().unwrap().contains("Signed in as Ada"));
}

#[tokio::test]
async fn test_switch_tenant() {
    let client = logged_in("ada-code").await;
    client
        .post("/api/v1/albums")
        .json(&json!({"name": "In org-1"}))
        .send()
        .await
        .assert_status_code(201);

    let response = client
        .post("/auth/tenant")
        .json(&json!({"tenantId": "5"}))
        .send()
        .await;
    response.assert_status_code(200);
    assert_eq!(response.data().unwrap(), json!({"currentTenantId": "5"}));

    let list = client.get("/api/v1/albums").send().await;
    assert_eq!(list.meta().unwrap()["total"], 0);
}

#[tokio::test]
async fn test_switch_tenant_from_form_redirects() {
    let client = logged_in("ada-code").await;

    let response = client
        .post("/auth/tenant")
        .form(&[("tenantId", "5"), ("next", "/dashboard")])
        .send()
        .await;
    response.assert_redirect("/dashboard");
}

#[tokio::test]
async fn test_switch_to_foreign_tenant_is_forbidden() {
    let client = logged_in("ada-code").await;

    let response = client
        .post("/auth/tenant")
        .json(&json!({"tenantId": "org-2"}))
        .send()
        .await;
    response.assert_status_code(403);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let client = logged_in("ada-code").await;
    client.get("/api/v1/albums").send().await.assert_status_code(200);

    client.get("/auth/logout").send().await.assert_redirect("/");

    client.get("/api/v1/albums").send().await.assert_redirect("/auth/login");
}

#[tokio::test]
async fn test_relogin_keeps_selected_tenant() {
    let client = logged_in("ada-code").await;
    client
        .post("/auth/tenant")
        .json(&json!({"tenantId": "5"}))
        .send()
        .await
        .assert_status_code(200);

    log_in(&client, "ada-code").await;

    let response = client
        .post("/api/v1/albums")
        .json(&json!({"name": "Where am I"}))
        .send()
        .await;
    assert_eq!(response.data().unwrap()["tenantId"], "5");
}

#[tokio::test]
async fn test_abandoned_anonymous_sessions_are_evicted() {
    let store = Arc::new(MemorySessionStore::new(Duration::from_millis(1)));
    let mut state = common::state();
    state.sessions = SessionManager::new(store.clone(), SessionConfig::default());
    let client = TestClient::new(common::app_with(state));

    for _ in 0..200 {
        let visitor = client.fresh_session();
        visitor.get("/dashboard").send().await.assert_status_code(302);
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    client.fresh_session().get("/dashboard").send().await.assert_status_code(302);

    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_login_issues_a_new_session_id() {
    let client = common::client();
    client.get("/dashboard").send().await.assert_status_code(302);
    let anonymous = client.cookies().get("galleria.sid").unwrap();

    log_in(&client, "ada-code").await;
    let signed_in = client.cookies().get("galleria.sid").unwrap();
    assert_ne!(anonymous, signed_in);

    // The pre-login id no longer carries the user.
    let fixated = client.fresh_session();
    fixated.cookies().insert("galleria.sid", anonymous);
    fixated.get("/dashboard").send().await.assert_status_code(302);

    client.get("/dashboard").send().await.assert_status_code(200);
}
