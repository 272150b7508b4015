//! Shared fixtures: an in-memory app with a scripted identity provider.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use galleria_albums::auth::{IdentityProvider, ResolvedIdentity};
use galleria_albums::{build_app, AppState, IdentityError};
use galleria_config::GalleriaConfig;
use galleria_server::App;
use galleria_test::TestClient;
use serde_json::{json, Value};

pub const AUTHORIZE_URL: &str = "https://idp.test/authorize";

/// Identity provider that answers from a fixed code → claims table.
#[derive(Default)]
pub struct ScriptedIdentity {
    logins: HashMap<String, Value>,
}

impl ScriptedIdentity {
    pub fn with_login(mut self, code: &str, claims: Value) -> Self {
        self.logins.insert(code.to_string(), claims);
        self
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentity {
    fn authorize_url(&self, state: &str) -> String {
        format!("{AUTHORIZE_URL}?state={state}")
    }

    async fn exchange(&self, code: &str) -> Result<ResolvedIdentity, IdentityError> {
        let claims = self
            .logins
            .get(code)
            .ok_or(IdentityError::Rejected { status: 400 })?;
        ResolvedIdentity::from_claims(claims)
    }
}

pub fn ada_claims() -> Value {
    json!({
        "sub": "ada",
        "email": "ada@example.com",
        "name": "Ada",
        "organization": ["org-1"],
        "groups": ["/org-5", "/staff"],
    })
}

pub fn grace_claims() -> Value {
    json!({
        "sub": "grace",
        "email": "grace@example.com",
        "organization": ["org-2"],
    })
}

pub fn loner_claims() -> Value {
    json!({ "sub": "loner" })
}

pub fn identity() -> ScriptedIdentity {
    ScriptedIdentity::default()
        .with_login("ada-code", ada_claims())
        .with_login("grace-code", grace_claims())
        .with_login("loner-code", loner_claims())
}

pub fn app_with(state: AppState) -> App {
    build_app(&GalleriaConfig::default(), state).unwrap()
}

pub fn state() -> AppState {
    AppState::in_memory(&GalleriaConfig::default())
        .unwrap()
        .with_identity(Arc::new(identity()))
}

pub fn client() -> TestClient {
    TestClient::new(app_with(state()))
}

/// Runs the browser login round trip and returns where the callback sent us.
pub async fn log_in(client: &TestClient, code: &str) -> String {
    let login = client.get("/auth/login").send().await;
    login.assert_status_code(302);

    let location = login.location().unwrap().to_string();
    let state = location
        .split_once("state=")
        .map(|(_, state)| state.to_string())
        .unwrap();

    let callback = client
        .get("/auth/callback")
        .query(&[("code", code), ("state", state.as_str())])
        .send()
        .await;
    callback.assert_status_code(302);
    callback.location().unwrap().to_string()
}

/// A client logged in with `code`.
pub async fn logged_in(code: &str) -> TestClient {
    let client = client();
    log_in(&client, code).await;
    client
}
