//! Album use cases.
//!
//! [`AlbumService`] receives the caller's [`TenantScope`] on every call
//! instead of reading it from ambient state; every log event it emits runs
//! inside the scope's span and so carries the tenant id.

use std::sync::Arc;

use chrono::Utc;
use galleria_core::{ApiError, ApiResult, TenantScope};
use serde::Serialize;
use uuid::Uuid;

use crate::dto::{CreateAlbum, ListAlbumsQuery, UpdateAlbum};
use crate::error::RepositoryError;
use crate::model::{Album, StatusCounts};
use crate::repository::{AlbumListParams, AlbumRepository};

/// One page of albums.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumPage {
    /// Albums on this page.
    pub items: Vec<Album>,
    /// Page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Matches across all pages.
    pub total: u64,
}

/// Tenant-scoped album operations.
#[derive(Clone)]
pub struct AlbumService {
    albums: Arc<dyn AlbumRepository>,
}

impl std::fmt::Debug for AlbumService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlbumService").finish_non_exhaustive()
    }
}

impl AlbumService {
    /// Creates a service over `albums`.
    pub fn new(albums: Arc<dyn AlbumRepository>) -> Self {
        Self { albums }
    }

    /// Lists albums, applying page 1, limit 20, newest first when unset.
    pub async fn list(&self, scope: &TenantScope, query: ListAlbumsQuery) -> ApiResult<AlbumPage> {
        let defaults = AlbumListParams::default();
        let params = AlbumListParams {
            page: query.page.unwrap_or(defaults.page),
            limit: query.limit.unwrap_or(defaults.limit),
            sort_by: query.sort_by.unwrap_or(defaults.sort_by),
            sort_direction: query.sort_direction.unwrap_or(defaults.sort_direction),
            search: query.search,
            status: query.status,
            include_deleted: query.include_deleted,
        };

        scope
            .instrument(async move {
                let slice = self.albums.list(scope.tenant_id(), &params).await?;
                tracing::debug!(total = slice.total, page = params.page, "albums listed");
                Ok::<_, ApiError>(AlbumPage {
                    items: slice.items,
                    page: params.page,
                    limit: params.limit,
                    total: slice.total,
                })
            })
            .await
    }

    /// Fetches a live album.
    pub async fn get(&self, scope: &TenantScope, id: Uuid) -> ApiResult<Album> {
        scope.instrument(self.find_live(scope, id)).await
    }

    /// Creates an album.
    pub async fn create(&self, scope: &TenantScope, input: CreateAlbum) -> ApiResult<Album> {
        scope
            .instrument(async move {
                let album = Album::new(scope.tenant_id().clone(), input, Utc::now());
                let album = self.albums.insert(album).await?;
                tracing::info!(album_id = %album.id, status = %album.status, "album created");
                Ok::<_, ApiError>(album)
            })
            .await
    }

    /// Applies a partial update to a live album.
    pub async fn update(&self, scope: &TenantScope, id: Uuid, input: UpdateAlbum) -> ApiResult<Album> {
        scope
            .instrument(async move {
                let mut album = self.find_live(scope, id).await?;
                if input.is_empty() {
                    return Ok(album);
                }
                album.apply(input, Utc::now());
                let album = self.albums.update(album).await?;
                tracing::info!(album_id = %album.id, "album updated");
                Ok::<_, ApiError>(album)
            })
            .await
    }

    /// Soft-deletes a live album.
    pub async fn delete(&self, scope: &TenantScope, id: Uuid) -> ApiResult<()> {
        scope
            .instrument(async move {
                if !self.albums.soft_delete(scope.tenant_id(), id, Utc::now()).await? {
                    return Err(RepositoryError::album_not_found().into());
                }
                tracing::info!(album_id = %id, "album deleted");
                Ok::<_, ApiError>(())
            })
            .await
    }

    /// Counts live albums by status.
    pub async fn counts(&self, scope: &TenantScope) -> ApiResult<StatusCounts> {
        scope
            .instrument(async move {
                let counts = self.albums.count_by_status(scope.tenant_id()).await?;
                Ok::<_, ApiError>(counts)
            })
            .await
    }

    async fn find_live(&self, scope: &TenantScope, id: Uuid) -> ApiResult<Album> {
        match self.albums.find_by_id(scope.tenant_id(), id).await? {
            Some(album) if !album.is_deleted() => Ok(album),
            _ => Err(ApiError::not_found("Album not found")),
        }
    }
}

/// Parses an album id path parameter; anything malformed is a 404.
pub fn parse_album_id(raw: Option<&str>) -> ApiResult<Uuid> {
    raw.and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| ApiError::not_found("Album not found"))
}
