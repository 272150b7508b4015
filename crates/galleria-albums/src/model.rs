//! Stored records.

use chrono::{DateTime, Utc};
use galleria_core::{CurrentUser, TenantId};
use galleria_docs::{ApiSchema, Schema};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::{AlbumStatus, CreateAlbum, UpdateAlbum};

/// An album owned by one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    /// Time-ordered identifier.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Cover image location.
    pub cover_photo_url: Option<String>,
    /// Publication state.
    pub status: AlbumStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Soft-deletion time.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Album {
    /// Creates a new album for `tenant_id` from a validated payload.
    #[must_use]
    pub fn new(tenant_id: TenantId, input: CreateAlbum, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            tenant_id,
            name: input.name,
            description: input.description,
            cover_photo_url: input.cover_photo_url,
            status: input.status,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Applies the fields present in `update`.
    pub fn apply(&mut self, update: UpdateAlbum, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(cover_photo_url) = update.cover_photo_url {
            self.cover_photo_url = cover_photo_url;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated_at = now;
    }

    /// Returns `true` once soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl ApiSchema for Album {
    fn schema() -> Schema {
        let timestamp = || Schema::string().with_format("date-time");
        Schema::object()
            .required_field("id", Schema::string().with_format("uuid"))
            .required_field("tenantId", String::schema())
            .required_field("name", String::schema())
            .required_field("description", Option::<String>::schema())
            .required_field("coverPhotoUrl", Schema::string().with_format("uri").nullable())
            .required_field("status", AlbumStatus::schema())
            .required_field("createdAt", timestamp())
            .required_field("updatedAt", timestamp())
            .required_field("deletedAt", timestamp().nullable())
    }
}

/// Album totals per status for one tenant, excluding deleted albums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    /// Drafts.
    pub draft: u64,
    /// Published albums.
    pub published: u64,
    /// Archived albums.
    pub archived: u64,
}

impl StatusCounts {
    /// Adds one album with `status`.
    pub fn record(&mut self, status: AlbumStatus) {
        match status {
            AlbumStatus::Draft => self.draft += 1,
            AlbumStatus::Published => self.published += 1,
            AlbumStatus::Archived => self.archived += 1,
        }
    }

    /// Sum over all statuses.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.draft + self.published + self.archived
    }
}

/// A user known from a previous login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Subject identifier issued by the identity provider.
    pub id: String,
    /// Email address.
    pub email: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
    /// Tenant memberships as of the last login.
    pub tenant_ids: Vec<String>,
    /// First login.
    pub created_at: DateTime<Utc>,
    /// Most recent login.
    pub last_login_at: DateTime<Utc>,
}

impl User {
    /// Returns the request identity for this user.
    #[must_use]
    pub fn to_current_user(&self) -> CurrentUser {
        CurrentUser {
            id: self.id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            tenant_ids: self.tenant_ids.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(name: &str) -> CreateAlbum {
        CreateAlbum {
            name: name.to_string(),
            description: Some("Beach days".to_string()),
            cover_photo_url: None,
            status: AlbumStatus::Draft,
        }
    }

    #[test]
    fn test_new_album() {
        let now = Utc::now();
        let album = Album::new(TenantId::new("org-1"), create("Summer"), now);

        assert_eq!(album.id.get_version_num(), 7);
        assert_eq!(album.created_at, now);
        assert_eq!(album.updated_at, now);
        assert!(!album.is_deleted());
    }

    #[test]
    fn test_apply_update() {
        let created = Utc::now();
        let mut album = Album::new(TenantId::new("org-1"), create("Summer"), created);
        let later = created + chrono::Duration::seconds(5);

        album.apply(
            UpdateAlbum {
                description: Some(None),
                status: Some(AlbumStatus::Published),
                ..UpdateAlbum::default()
            },
            later,
        );

        assert_eq!(album.name, "Summer");
        assert_eq!(album.description, None);
        assert_eq!(album.status, AlbumStatus::Published);
        assert_eq!(album.updated_at, later);
        assert_eq!(album.created_at, created);
    }

    #[test]
    fn test_album_serializes_camel_case() {
        let album = Album::new(TenantId::new("org-1"), create("Summer"), Utc::now());
        let value = serde_json::to_value(&album).unwrap();

        assert_eq!(value["tenantId"], "org-1");
        assert_eq!(value["coverPhotoUrl"], json!(null));
        assert_eq!(value["deletedAt"], json!(null));
        assert_eq!(value["status"], "draft");

        let schema = Album::schema();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        for key in keys {
            assert!(schema.is_required(key), "{key} undocumented");
        }
    }

    #[test]
    fn test_status_counts() {
        let mut counts = StatusCounts::default();
        counts.record(AlbumStatus::Draft);
        counts.record(AlbumStatus::Draft);
        counts.record(AlbumStatus::Archived);

        assert_eq!(counts.draft, 2);
        assert_eq!(counts.published, 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_user_to_current_user() {
        let now = Utc::now();
        let user = User {
            id: "u-1".to_string(),
            email: Some("ada@example.com".to_string()),
            display_name: None,
            tenant_ids: vec!["org-1".to_string()],
            created_at: now,
            last_login_at: now,
        };

        let current = user.to_current_user();
        assert_eq!(current.id, "u-1");
        assert!(current.is_member_of("org-1"));
    }
}
