//! Validated album payloads.
//!
//! Each DTO is deserialized from the merged request input (path parameters,
//! query string, body) and then checked with `validator`. Optional text fields
//! treat `""` as absent, numeric query parameters accept their string form,
//! and absent fields take the documented defaults. Serializing a DTO yields
//! exactly its declared fields.

use galleria_core::coerce;
use galleria_docs::{ApiSchema, Schema};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

/// Largest page size a list request may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Album publication state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlbumStatus {
    /// Work in progress, the default for new albums.
    #[default]
    Draft,
    /// Visible to the tenant.
    Published,
    /// Kept for reference.
    Archived,
}

impl AlbumStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 3] = [Self::Draft, Self::Published, Self::Archived];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

impl std::fmt::Display for AlbumStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ApiSchema for AlbumStatus {
    fn schema() -> Schema {
        Schema::string_enum(Self::ALL.iter().map(AlbumStatus::as_str))
    }
}

/// Sortable album columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    /// Album name.
    Name,
    /// Creation time.
    #[default]
    CreatedAt,
    /// Last modification time.
    UpdatedAt,
    /// Publication state.
    Status,
}

impl ApiSchema for SortBy {
    fn schema() -> Schema {
        Schema::string_enum(["name", "createdAt", "updatedAt", "status"])
    }
}

/// Sort order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

impl ApiSchema for SortDirection {
    fn schema() -> Schema {
        Schema::string_enum(["asc", "desc"])
    }
}

fn name_schema() -> Schema {
    Schema::string().with_min_length(1)
}

fn optional_text() -> Schema {
    Schema::string().nullable()
}

fn optional_url() -> Schema {
    Schema::string().with_format("uri").nullable()
}

/// Payload of `POST /api/v1/albums`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlbum {
    /// Display name, unique among the tenant's live albums.
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    /// Free-form description.
    #[serde(default, deserialize_with = "coerce::empty_string_as_none")]
    pub description: Option<String>,

    /// Cover image location.
    #[serde(default, deserialize_with = "coerce::empty_string_as_none")]
    #[validate(url(message = "Cover photo URL must be a valid URL"))]
    pub cover_photo_url: Option<String>,

    /// Initial state.
    #[serde(default)]
    pub status: AlbumStatus,
}

impl ApiSchema for CreateAlbum {
    fn schema() -> Schema {
        Schema::object()
            .required_field("name", name_schema())
            .property("description", optional_text())
            .property("coverPhotoUrl", optional_url())
            .property(
                "status",
                AlbumStatus::schema().with_default(json!(AlbumStatus::Draft.as_str())),
            )
    }
}

/// Payload of `PUT /api/v1/albums/{id}`.
///
/// Absent fields are left untouched. For `description` and `coverPhotoUrl`,
/// `null` or `""` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlbum {
    /// New name.
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,

    /// New description.
    #[serde(default, deserialize_with = "coerce::nullable_string")]
    pub description: Option<Option<String>>,

    /// New cover image location.
    #[serde(default, deserialize_with = "coerce::nullable_string")]
    #[validate(url(message = "Cover photo URL must be a valid URL"))]
    pub cover_photo_url: Option<Option<String>>,

    /// New state.
    #[serde(default)]
    pub status: Option<AlbumStatus>,
}

impl UpdateAlbum {
    /// Returns `true` when no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.cover_photo_url.is_none()
            && self.status.is_none()
    }
}

impl ApiSchema for UpdateAlbum {
    fn schema() -> Schema {
        Schema::object()
            .property("name", name_schema())
            .property("description", optional_text())
            .property("coverPhotoUrl", optional_url())
            .property("status", AlbumStatus::schema())
    }
}

/// Query of `GET /api/v1/albums`.
///
/// Unset paging and sorting fields are resolved by
/// [`AlbumService::list`](crate::AlbumService::list).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListAlbumsQuery {
    /// 1-based page number.
    #[serde(default, deserialize_with = "coerce::option_u32")]
    #[validate(range(min = 1, message = "Page must be a positive integer"))]
    pub page: Option<u32>,

    /// Page size.
    #[serde(default, deserialize_with = "coerce::option_u32")]
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,

    /// Sort column.
    #[serde(default)]
    pub sort_by: Option<SortBy>,

    /// Sort order.
    #[serde(default)]
    pub sort_direction: Option<SortDirection>,

    /// Case-insensitive text matched against name and description.
    #[serde(default, deserialize_with = "coerce::empty_string_as_none")]
    pub search: Option<String>,

    /// Only albums in this state.
    #[serde(default)]
    pub status: Option<AlbumStatus>,

    /// Include soft-deleted albums.
    #[serde(default, deserialize_with = "coerce::bool_or_string")]
    pub include_deleted: bool,
}

impl ApiSchema for ListAlbumsQuery {
    fn schema() -> Schema {
        Schema::object()
            .property("page", Schema::integer().with_range(Some(1.0), None))
            .property(
                "limit",
                Schema::integer().with_range(Some(1.0), Some(f64::from(MAX_PAGE_SIZE))),
            )
            .property("sortBy", SortBy::schema())
            .property("sortDirection", SortDirection::schema())
            .property("search", Schema::string())
            .property("status", AlbumStatus::schema())
            .property("includeDeleted", Schema::boolean().with_default(json!(false)))
    }
}

/// Body of `POST /auth/tenant`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SwitchTenant {
    /// Tenant to make current.
    #[validate(length(min = 1, message = "Tenant is required"))]
    pub tenant_id: String,

    /// Local path to continue to afterwards.
    #[serde(default, deserialize_with = "coerce::empty_string_as_none")]
    pub next: Option<String>,
}

impl ApiSchema for SwitchTenant {
    fn schema() -> Schema {
        Schema::object()
            .required_field("tenantId", Schema::string().with_min_length(1))
            .property("next", Schema::string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galleria_core::validate;
    use proptest::prelude::*;

    #[test]
    fn test_create_album_defaults_and_coercion() {
        let album: CreateAlbum = validate(json!({
            "name": "Summer",
            "description": "",
            "coverPhotoUrl": "",
        }))
        .unwrap();

        assert_eq!(album.name, "Summer");
        assert_eq!(album.description, None);
        assert_eq!(album.cover_photo_url, None);
        assert_eq!(album.status, AlbumStatus::Draft);
    }

    #[test]
    fn test_create_album_projection() {
        let album: CreateAlbum = validate(json!({
            "name": "Summer",
            "description": "",
            "status": "published",
            "tenantId": "ignored",
        }))
        .unwrap();

        assert_eq!(
            serde_json::to_value(&album).unwrap(),
            json!({
                "name": "Summer",
                "description": null,
                "coverPhotoUrl": null,
                "status": "published",
            })
        );
    }

    #[test]
    fn test_create_album_requires_name() {
        let err = validate::<CreateAlbum>(json!({"name": ""})).unwrap_err();
        assert_eq!(err.issues[0].path, "name");
        assert_eq!(err.issues[0].message, "Name is required");

        let err = validate::<CreateAlbum>(json!({})).unwrap_err();
        assert_eq!(err.issues[0].code, "required");
    }

    #[test]
    fn test_create_album_rejects_bad_url() {
        let err = validate::<CreateAlbum>(json!({"name": "A", "coverPhotoUrl": "not a url"}))
            .unwrap_err();
        assert_eq!(err.issues[0].path, "coverPhotoUrl");
        assert_eq!(err.issues[0].code, "invalid_url");
    }

    #[test]
    fn test_create_album_rejects_unknown_status() {
        let err = validate::<CreateAlbum>(json!({"name": "A", "status": "hidden"})).unwrap_err();
        assert_eq!(err.issues[0].path, "status");
        assert_eq!(err.issues[0].code, "invalid_enum_value");
    }

    #[test]
    fn test_update_album_distinguishes_absent_and_cleared() {
        let update: UpdateAlbum = validate(json!({"description": "", "status": "archived"})).unwrap();
        assert_eq!(update.name, None);
        assert_eq!(update.description, Some(None));
        assert_eq!(update.cover_photo_url, None);
        assert_eq!(update.status, Some(AlbumStatus::Archived));

        let empty: UpdateAlbum = validate(json!({})).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_update_album_validates_present_fields() {
        assert!(validate::<UpdateAlbum>(json!({"name": ""})).is_err());
        assert!(validate::<UpdateAlbum>(json!({"coverPhotoUrl": "nope"})).is_err());

        let ok: UpdateAlbum =
            validate(json!({"coverPhotoUrl": "https://cdn.example.com/a.jpg"})).unwrap();
        assert_eq!(
            ok.cover_photo_url,
            Some(Some("https://cdn.example.com/a.jpg".to_string()))
        );
    }

    #[test]
    fn test_list_query_coerces_strings() {
        let query: ListAlbumsQuery = validate(json!({
            "page": "2",
            "limit": "50",
            "sortBy": "updatedAt",
            "sortDirection": "asc",
            "search": "",
            "includeDeleted": "true",
        }))
        .unwrap();

        assert_eq!(query.page, Some(2));
        assert_eq!(query.limit, Some(50));
        assert_eq!(query.sort_by, Some(SortBy::UpdatedAt));
        assert_eq!(query.sort_direction, Some(SortDirection::Asc));
        assert_eq!(query.search, None);
        assert!(query.include_deleted);
    }

    #[test]
    fn test_list_query_defaults() {
        let query: ListAlbumsQuery = validate(json!({})).unwrap();
        assert_eq!(query, ListAlbumsQuery::default());
        assert!(!query.include_deleted);
    }

    #[test]
    fn test_list_query_rejects_zero_page() {
        let err = validate::<ListAlbumsQuery>(json!({"page": "0"})).unwrap_err();
        assert_eq!(err.issues[0].path, "page");
        assert_eq!(err.issues[0].code, "too_small");
    }

    #[test]
    fn test_list_query_rejects_unknown_sort() {
        let err = validate::<ListAlbumsQuery>(json!({"sortBy": "colour"})).unwrap_err();
        assert_eq!(err.issues[0].path, "sortBy");
    }

    #[test]
    fn test_schemas_document_required_fields() {
        assert!(CreateAlbum::schema().is_required("name"));
        assert!(!UpdateAlbum::schema().is_required("name"));
        assert_eq!(ListAlbumsQuery::schema().properties["limit"].maximum, Some(100.0));
        assert_eq!(
            AlbumStatus::schema().enum_values,
            vec![json!("draft"), json!("published"), json!("archived")]
        );
    }

    #[test]
    fn test_switch_tenant() {
        let switch: SwitchTenant = validate(json!({"tenantId": "org-2", "next": ""})).unwrap();
        assert_eq!(switch.tenant_id, "org-2");
        assert_eq!(switch.next, None);

        let err = validate::<SwitchTenant>(json!({"tenantId": ""})).unwrap_err();
        assert_eq!(err.issues[0].message, "Tenant is required");
    }

    proptest! {
        #[test]
        fn prop_limit_over_max_is_rejected(limit in (MAX_PAGE_SIZE + 1)..100_000u32) {
            let err = validate::<ListAlbumsQuery>(json!({"limit": limit.to_string()})).unwrap_err();
            prop_assert_eq!(&err.issues[0].path, "limit");
            prop_assert_eq!(&err.issues[0].code, "too_big");
        }

        #[test]
        fn prop_limit_within_bounds_is_accepted(limit in 1..=MAX_PAGE_SIZE) {
            let query: ListAlbumsQuery = validate(json!({"limit": limit})).unwrap();
            prop_assert_eq!(query.limit, Some(limit));
        }

        #[test]
        fn prop_status_defaults_to_draft(name in "[A-Za-z][A-Za-z0-9 ]{0,30}") {
            let album: CreateAlbum = validate(json!({"name": name})).unwrap();
            prop_assert_eq!(album.status, AlbumStatus::Draft);
        }

        #[test]
        fn prop_empty_optional_text_becomes_null(name in "[a-z]{1,12}") {
            let album: CreateAlbum = validate(json!({
                "name": name,
                "description": "",
                "coverPhotoUrl": "",
            }))
            .unwrap();
            let projected = serde_json::to_value(&album).unwrap();
            prop_assert!(projected["description"].is_null());
            prop_assert!(projected["coverPhotoUrl"].is_null());
        }
    }
}
