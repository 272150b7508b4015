//! Authentication middleware.
//!
//! [`load_user`] is installed globally and attaches the session user to
//! every request it can; [`require_auth`] guards individual controllers or
//! endpoints and sends anonymous visitors to the login page.

use std::sync::Arc;

use galleria_middleware::{Flow, MiddlewareUnit, Reply};

use crate::repository::UserRepository;

/// Where anonymous visitors are sent.
pub const LOGIN_PATH: &str = "/auth/login";

/// Name of the [`load_user`] unit.
pub const LOAD_USER: &str = "load_user";

/// Name of the [`require_auth`] unit.
pub const REQUIRE_AUTH: &str = "require_auth";

/// BEFORE unit resolving the session's `userId` into the request user.
///
/// Lookup failures are logged and the request continues anonymously.
pub fn load_user(users: Arc<dyn UserRepository>) -> MiddlewareUnit {
    MiddlewareUnit::before(LOAD_USER, move |mut ctx| {
        let users = Arc::clone(&users);
        async move {
            let Some(user_id) = ctx.session().user_id() else {
                return Ok(Flow::Continue(ctx));
            };

            match users.find_by_id(&user_id).await {
                Ok(Some(user)) => ctx.set_user(user.to_current_user()),
                Ok(None) => tracing::warn!(%user_id, "session refers to an unknown user"),
                Err(err) => tracing::warn!(%user_id, error = %err, "failed to load session user"),
            }
            Ok(Flow::Continue(ctx))
        }
    })
}

/// BEFORE unit that redirects anonymous requests to [`LOGIN_PATH`].
///
/// The requested URL is stored as the session's `returnTo` so the login
/// callback can send the user back.
pub fn require_auth() -> MiddlewareUnit {
    MiddlewareUnit::before(REQUIRE_AUTH, |ctx| async move {
        if ctx.user().is_some() {
            return Ok(Flow::Continue(ctx));
        }

        let return_to = ctx.original_url();
        tracing::debug!(%return_to, "anonymous request redirected to login");
        ctx.session().update(|data| data.return_to = Some(return_to));
        Ok(Flow::Respond(Reply::redirect(LOGIN_PATH)))
    })
}
