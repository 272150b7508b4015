//! `/api/v1/albums`: the tenant's albums as JSON.
//!
//! Every endpoint sits behind [`require_auth`] and resolves the caller's
//! [`TenantScope`](galleria_core::TenantScope) before touching the service,
//! so a request without a selected tenant fails with 403.

use galleria_core::ApiError;
use galleria_middleware::Reply;
use galleria_server::{controller, endpoint, ControllerBuilder};
use http::{Method, StatusCode};
use serde_json::json;

use crate::auth::require_auth;
use crate::dto::{CreateAlbum, ListAlbumsQuery, UpdateAlbum};
use crate::model::Album;
use crate::service::{parse_album_id, AlbumService};

/// Base path of the album API.
pub const BASE_PATH: &str = "/api/v1/albums";

/// Describes the album API.
pub fn routes(service: AlbumService) -> ControllerBuilder {
    let list = service.clone();
    let get = service.clone();
    let create = service.clone();
    let update = service.clone();
    let delete = service;

    controller(BASE_PATH)
        .description("Albums of the currently selected tenant")
        .tag("Albums")
        .middleware(require_auth())
        .endpoints(vec![
            endpoint(Method::GET, "/", "listAlbums")
                .description("Lists albums; `meta` carries `page`, `limit` and `total`")
                .input::<ListAlbumsQuery>()
                .output::<Vec<Album>>()
                .raw_handler(move |mut ctx| {
                    let service = list.clone();
                    async move {
                        let scope = ctx.tenant_scope()?;
                        let query = ctx.take_input::<ListAlbumsQuery>()?;
                        let page = service.list(&scope, query).await?;

                        let items = serde_json::to_value(&page.items).map_err(|e| {
                            ApiError::internal_with_source("Failed to serialize albums", e)
                        })?;
                        Ok::<_, ApiError>(Reply::json(items)
                            .with_meta("page", json!(page.page))
                            .with_meta("limit", json!(page.limit))
                            .with_meta("total", json!(page.total)))
                    }
                }),
            endpoint(Method::GET, "/{id}", "getAlbum")
                .description("Fetches one album")
                .output::<Album>()
                .handler(move |ctx| {
                    let service = get.clone();
                    async move {
                        let scope = ctx.tenant_scope()?;
                        let id = parse_album_id(ctx.path_param("id"))?;
                        service.get(&scope, id).await
                    }
                }),
            endpoint(Method::POST, "/", "createAlbum")
                .description("Creates an album; names are unique within the tenant")
                .input::<CreateAlbum>()
                .output::<Album>()
                .status(StatusCode::CREATED)
                .handler(move |mut ctx| {
                    let service = create.clone();
                    async move {
                        let scope = ctx.tenant_scope()?;
                        let input = ctx.take_input::<CreateAlbum>()?;
                        service.create(&scope, input).await
                    }
                }),
            endpoint(Method::PUT, "/{id}", "updateAlbum")
                .description("Updates the given fields of an album")
                .input::<UpdateAlbum>()
                .output::<Album>()
                .handler(move |mut ctx| {
                    let service = update.clone();
                    async move {
                        let scope = ctx.tenant_scope()?;
                        let id = parse_album_id(ctx.path_param("id"))?;
                        let input = ctx.take_input::<UpdateAlbum>()?;
                        service.update(&scope, id, input).await
                    }
                }),
            endpoint(Method::DELETE, "/{id}", "deleteAlbum")
                .description("Soft-deletes an album")
                .handler(move |ctx| {
                    let service = delete.clone();
                    async move {
                        let scope = ctx.tenant_scope()?;
                        let id = parse_album_id(ctx.path_param("id"))?;
                        service.delete(&scope, id).await?;
                        Ok::<_, ApiError>(json!({ "deleted": true }))
                    }
                }),
        ])
}
