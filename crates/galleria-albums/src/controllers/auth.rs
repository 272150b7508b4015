//! `/auth`: login round trip, logout and tenant switching.
//!
//! None of these routes appear in the OpenAPI document.

use std::sync::Arc;

use chrono::Utc;
use galleria_core::{ApiError, CurrentUser};
use galleria_middleware::{Reply, Session};
use galleria_server::{controller, endpoint, ControllerBuilder};
use http::Method;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{require_auth, IdentityProvider};
use crate::dto::SwitchTenant;
use crate::model::User;
use crate::repository::UserRepository;

/// Base path of the auth routes.
pub const BASE_PATH: &str = "/auth";

/// Where a fresh login lands when nothing else was requested.
pub const DEFAULT_LANDING: &str = "/dashboard";

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Returns `target` if it is a path on this site.
pub fn local_redirect(target: Option<String>) -> Option<String> {
    target.filter(|t| t.starts_with('/') && !t.starts_with("//"))
}

/// Describes the auth routes.
pub fn routes(identity: Arc<dyn IdentityProvider>, users: Arc<dyn UserRepository>) -> ControllerBuilder {
    let login_identity = Arc::clone(&identity);

    controller(BASE_PATH)
        .description("Browser login")
        .endpoints(vec![
            endpoint(Method::GET, "/login", "login")
                .hide_from_openapi()
                .raw_handler(move |ctx| {
                    let identity = Arc::clone(&login_identity);
                    async move {
                        let state = Uuid::new_v4().simple().to_string();
                        ctx.session()
                            .update(|data| data.oauth_state = Some(state.clone()));
                        Ok::<_, ApiError>(Reply::redirect(&identity.authorize_url(&state)))
                    }
                }),
            endpoint(Method::GET, "/callback", "loginCallback")
                .hide_from_openapi()
                .raw_handler(move |ctx| {
                    let identity = Arc::clone(&identity);
                    let users = Arc::clone(&users);
                    async move {
                        let query: CallbackQuery = ctx.query()?;
                        let session = ctx.session();
                        let expected = session.take_oauth_state();

                        if let Some(error) = query.error {
                            tracing::warn!(%error, "identity provider returned an error");
                            return Err(ApiError::unauthorized("Login failed"));
                        }
                        if expected.is_none() || query.state != expected {
                            return Err(ApiError::bad_request("Invalid login state"));
                        }
                        let code = query
                            .code
                            .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;

                        let identity = identity.exchange(&code).await?;
                        let now = Utc::now();
                        let user = users
                            .upsert(User {
                                id: identity.subject,
                                email: identity.email,
                                display_name: identity.display_name,
                                tenant_ids: identity.tenant_ids,
                                created_at: now,
                                last_login_at: now,
                            })
                            .await?;

                        sign_in(session, &user.to_current_user());
                        tracing::info!(user_id = %user.id, tenants = user.tenant_ids.len(), "user logged in");

                        let target = local_redirect(session.take_return_to())
                            .unwrap_or_else(|| DEFAULT_LANDING.to_string());
                        Ok(Reply::redirect(&target))
                    }
                }),
            endpoint(Method::GET, "/logout", "logout")
                .hide_from_openapi()
                .raw_handler(|ctx| async move {
                    if let Some(user) = ctx.user() {
                        tracing::info!(user_id = %user.id, "user logged out");
                    }
                    ctx.session().destroy();
                    Ok::<_, ApiError>(Reply::redirect("/"))
                }),
            endpoint(Method::POST, "/tenant", "switchTenant")
                .hide_from_openapi()
                .middleware(require_auth())
                .input::<SwitchTenant>()
                .raw_handler(|mut ctx| async move {
                    let input = ctx.take_input::<SwitchTenant>()?;
                    let user = ctx.require_user()?;
                    if !user.is_member_of(&input.tenant_id) {
                        return Err(ApiError::forbidden("Not a member of that tenant"));
                    }

                    tracing::info!(user_id = %user.id, tenant_id = %input.tenant_id, "tenant switched");
                    ctx.session()
                        .update(|data| data.current_tenant_id = Some(input.tenant_id.clone()));

                    Ok(match local_redirect(input.next) {
                        Some(next) => Reply::redirect(&next),
                        None => Reply::json(json!({ "currentTenantId": input.tenant_id })),
                    })
                }),
        ])
}

/// Binds `user` to the session under a fresh session id.
///
/// A previously selected tenant survives the login while the user is still
/// a member of it; otherwise the first membership becomes current.
fn sign_in(session: &Session, user: &CurrentUser) {
    session.regenerate_id();
    session.update(|data| {
        data.user_id = Some(user.id.clone());
        let keep = data
            .current_tenant_id
            .as_deref()
            .is_some_and(|tenant| user.is_member_of(tenant));
        if !keep {
            data.current_tenant_id = user.tenant_ids.first().cloned();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use galleria_middleware::{SessionData, SessionId};

    fn ada(tenants: &[&str]) -> CurrentUser {
        CurrentUser {
            id: "u-1".to_string(),
            email: None,
            display_name: None,
            tenant_ids: tenants.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_local_redirect() {
        assert_eq!(local_redirect(Some("/albums?x=1".into())).as_deref(), Some("/albums?x=1"));
        assert_eq!(local_redirect(Some("//evil.example.com".into())), None);
        assert_eq!(local_redirect(Some("https://evil.example.com".into())), None);
        assert_eq!(local_redirect(None), None);
    }

    #[test]
    fn test_sign_in_picks_first_tenant() {
        let session = Session::new();
        sign_in(&session, &ada(&["org-1", "5"]));

        let data = session.data();
        assert_eq!(data.user_id.as_deref(), Some("u-1"));
        assert_eq!(data.current_tenant_id.as_deref(), Some("org-1"));
    }

    #[test]
    fn test_sign_in_keeps_valid_selection() {
        let session = Session::new();
        session.update(|data| data.current_tenant_id = Some("5".to_string()));
        sign_in(&session, &ada(&["org-1", "5"]));
        assert_eq!(session.current_tenant_id().as_deref(), Some("5"));

        session.update(|data| data.current_tenant_id = Some("gone".to_string()));
        sign_in(&session, &ada(&["org-1"]));
        assert_eq!(session.current_tenant_id().as_deref(), Some("org-1"));
    }

    #[test]
    fn test_sign_in_drops_pre_login_id() {
        let session = Session::loaded(SessionId::generate(), SessionData::default());
        sign_in(&session, &ada(&["org-1"]));
        assert!(session.id().is_none());
        assert!(session.is_dirty());
    }

    #[test]
    fn test_sign_in_without_tenants() {
        let session = Session::new();
        sign_in(&session, &ada(&[]));
        assert_eq!(
            session.data(),
            SessionData {
                user_id: Some("u-1".to_string()),
                ..SessionData::default()
            }
        );
    }
}
