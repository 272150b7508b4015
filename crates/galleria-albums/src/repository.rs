//! Storage abstraction.
//!
//! Services only talk to the [`AlbumRepository`] and [`UserRepository`]
//! traits. Every album query takes the tenant explicitly; implementations
//! must never return another tenant's rows.
//!
//! The in-memory implementations keep their tables behind a
//! [`parking_lot::RwLock`] and enforce the same uniqueness rule a relational
//! unique index would: album names are unique among a tenant's live albums.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use galleria_core::TenantId;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::dto::{AlbumStatus, SortBy, SortDirection};
use crate::error::RepositoryError;
use crate::model::{Album, StatusCounts, User};

/// Fully resolved list parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumListParams {
    /// 1-based page.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Sort column.
    pub sort_by: SortBy,
    /// Sort order.
    pub sort_direction: SortDirection,
    /// Case-insensitive text filter.
    pub search: Option<String>,
    /// Status filter.
    pub status: Option<AlbumStatus>,
    /// Include soft-deleted albums.
    pub include_deleted: bool,
}

impl Default for AlbumListParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            sort_by: SortBy::CreatedAt,
            sort_direction: SortDirection::Desc,
            search: None,
            status: None,
            include_deleted: false,
        }
    }
}

impl AlbumListParams {
    fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.limit as usize)
    }

    fn matches(&self, album: &Album) -> bool {
        if album.is_deleted() && !self.include_deleted {
            return false;
        }
        if self.status.is_some_and(|status| status != album.status) {
            return false;
        }
        match &self.search {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                album.name.to_lowercase().contains(&needle)
                    || album
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
        }
    }

    fn compare(&self, a: &Album, b: &Album) -> Ordering {
        let ordering = match self.sort_by {
            SortBy::Name => name_key(&a.name).cmp(&name_key(&b.name)),
            SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
            SortBy::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortBy::Status => a.status.cmp(&b.status),
        }
        .then_with(|| a.id.cmp(&b.id));

        match self.sort_direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// One page of albums plus the number of matches across all pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumSlice {
    /// Albums on the requested page.
    pub items: Vec<Album>,
    /// Total matches.
    pub total: u64,
}

// Names compare case-insensitively for both sorting and uniqueness.
fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// Album storage.
#[async_trait]
pub trait AlbumRepository: Send + Sync + 'static {
    /// Fetches an album, including soft-deleted ones.
    async fn find_by_id(&self, tenant: &TenantId, id: Uuid) -> Result<Option<Album>, RepositoryError>;

    /// Lists the tenant's albums.
    async fn list(&self, tenant: &TenantId, params: &AlbumListParams) -> Result<AlbumSlice, RepositoryError>;

    /// Stores a new album.
    ///
    /// Fails with [`RepositoryError::DuplicateName`] if a live album of the
    /// same tenant already has the name.
    async fn insert(&self, album: Album) -> Result<Album, RepositoryError>;

    /// Replaces a stored album.
    async fn update(&self, album: Album) -> Result<Album, RepositoryError>;

    /// Marks a live album deleted. Returns `false` if there was none.
    async fn soft_delete(&self, tenant: &TenantId, id: Uuid, at: DateTime<Utc>) -> Result<bool, RepositoryError>;

    /// Counts the tenant's live albums by status.
    async fn count_by_status(&self, tenant: &TenantId) -> Result<StatusCounts, RepositoryError>;
}

/// User storage.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Fetches a user by subject id.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError>;

    /// Inserts or refreshes a user, keeping the original `created_at`.
    async fn upsert(&self, user: User) -> Result<User, RepositoryError>;
}

/// [`AlbumRepository`] kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryAlbumRepository {
    albums: RwLock<HashMap<Uuid, Album>>,
}

impl MemoryAlbumRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored albums, deleted ones included.
    pub fn len(&self) -> usize {
        self.albums.read().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.albums.read().is_empty()
    }

    fn check_unique(albums: &HashMap<Uuid, Album>, candidate: &Album) -> Result<(), RepositoryError> {
        let taken = albums.values().any(|other| {
            other.id != candidate.id
                && other.tenant_id == candidate.tenant_id
                && !other.is_deleted()
                && name_key(&other.name) == name_key(&candidate.name)
        });
        if taken {
            return Err(RepositoryError::DuplicateName {
                name: candidate.name.clone(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AlbumRepository for MemoryAlbumRepository {
    async fn find_by_id(&self, tenant: &TenantId, id: Uuid) -> Result<Option<Album>, RepositoryError> {
        Ok(self
            .albums
            .read()
            .get(&id)
            .filter(|album| &album.tenant_id == tenant)
            .cloned())
    }

    async fn list(&self, tenant: &TenantId, params: &AlbumListParams) -> Result<AlbumSlice, RepositoryError> {
        let mut matches: Vec<Album> = self
            .albums
            .read()
            .values()
            .filter(|album| &album.tenant_id == tenant && params.matches(album))
            .cloned()
            .collect();
        matches.sort_by(|a, b| params.compare(a, b));

        let total = matches.len() as u64;
        let items = matches
            .into_iter()
            .skip(params.offset())
            .take(params.limit as usize)
            .collect();

        Ok(AlbumSlice { items, total })
    }

    async fn insert(&self, album: Album) -> Result<Album, RepositoryError> {
        let mut albums = self.albums.write();
        Self::check_unique(&albums, &album)?;
        albums.insert(album.id, album.clone());
        Ok(album)
    }

    async fn update(&self, album: Album) -> Result<Album, RepositoryError> {
        let mut albums = self.albums.write();
        match albums.get(&album.id) {
            Some(stored) if stored.tenant_id == album.tenant_id => {}
            _ => return Err(RepositoryError::album_not_found()),
        }
        Self::check_unique(&albums, &album)?;
        albums.insert(album.id, album.clone());
        Ok(album)
    }

    async fn soft_delete(&self, tenant: &TenantId, id: Uuid, at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let mut albums = self.albums.write();
        match albums.get_mut(&id) {
            Some(album) if &album.tenant_id == tenant && !album.is_deleted() => {
                album.deleted_at = Some(at);
                album.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_by_status(&self, tenant: &TenantId) -> Result<StatusCounts, RepositoryError> {
        let mut counts = StatusCounts::default();
        for album in self.albums.read().values() {
            if &album.tenant_id == tenant && !album.is_deleted() {
                counts.record(album.status);
            }
        }
        Ok(counts)
    }
}

/// [`UserRepository`] kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn upsert(&self, mut user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write();
        if let Some(existing) = users.get(&user.id) {
            user.created_at = existing.created_at;
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }
}
