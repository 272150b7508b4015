//! Server-rendered pages.

use galleria_core::ApiError;
use galleria_server::{controller, endpoint, ControllerBuilder};
use http::Method;
use serde_json::json;

use crate::auth::require_auth;
use crate::service::AlbumService;

/// Describes the HTML pages.
pub fn routes(title: String, service: AlbumService) -> ControllerBuilder {
    let dashboard_title = title.clone();

    controller("/")
        .description("HTML pages")
        .endpoints(vec![
            endpoint(Method::GET, "/", "home")
                .hide_from_openapi()
                .render_view("home.html", move |ctx| {
                    let title = title.clone();
                    async move { Ok::<_, ApiError>(json!({ "title": title, "user": ctx.user() })) }
                }),
            endpoint(Method::GET, "/dashboard", "dashboard")
                .hide_from_openapi()
                .middleware(require_auth())
                .render_view("dashboard.html", move |ctx| {
                    let title = dashboard_title.clone();
                    let service = service.clone();
                    async move {
                        let user = ctx.require_user()?;
                        // Without a usable tenant the page still renders, just without counts.
                        let counts = match ctx.tenant_scope() {
                            Ok(scope) => Some(service.counts(&scope).await?),
                            Err(_) => None,
                        };

                        Ok::<_, ApiError>(json!({
                            "title": title,
                            "user": user,
                            "tenants": user.tenant_ids,
                            "currentTenantId": ctx.session().current_tenant_id(),
                            "counts": counts,
                        }))
                    }
                }),
        ])
}
