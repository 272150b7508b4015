//! Identity claims.
//!
//! Tenant memberships come from two claims:
//!
//! - `organization`: an array of ids, or an object keyed by id. Ids are kept
//!   as they are (`"org-1"` stays `"org-1"`).
//! - `groups`: group paths such as `"/org-5"`. The leading `/` and then the
//!   literal `org-` prefix are stripped (`"/org-5"` becomes `"5"`); groups
//!   without the prefix are not tenants.
//!
//! The two sources produce differently shaped ids for the same tenant; both
//! shapes are kept.

use serde_json::Value;

use crate::error::IdentityError;

const GROUP_TENANT_PREFIX: &str = "org-";

/// Who the identity provider says the user is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// `sub` claim.
    pub subject: String,
    /// `email` claim.
    pub email: Option<String>,
    /// `name`, falling back to `preferred_username`.
    pub display_name: Option<String>,
    /// Tenant memberships, in claim order without duplicates.
    pub tenant_ids: Vec<String>,
}

impl ResolvedIdentity {
    /// Builds an identity from userinfo or ID token claims.
    pub fn from_claims(claims: &Value) -> Result<Self, IdentityError> {
        let subject = string_claim(claims, "sub").ok_or(IdentityError::MissingClaim("sub"))?;

        Ok(Self {
            subject,
            email: string_claim(claims, "email"),
            display_name: string_claim(claims, "name")
                .or_else(|| string_claim(claims, "preferred_username")),
            tenant_ids: tenant_ids(claims),
        })
    }
}

fn string_claim(claims: &Value, name: &str) -> Option<String> {
    claims
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Extracts tenant ids from the `organization` and `groups` claims.
pub fn tenant_ids(claims: &Value) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    let mut push = |id: String| {
        if !id.is_empty() && !ids.contains(&id) {
            ids.push(id);
        }
    };

    match claims.get("organization") {
        Some(Value::Array(orgs)) => orgs
            .iter()
            .filter_map(Value::as_str)
            .for_each(|id| push(id.to_string())),
        Some(Value::Object(orgs)) => orgs.keys().for_each(|id| push(id.clone())),
        Some(Value::String(id)) => push(id.clone()),
        _ => {}
    }

    if let Some(Value::Array(groups)) = claims.get("groups") {
        groups
            .iter()
            .filter_map(Value::as_str)
            .filter_map(tenant_from_group)
            .for_each(|id| push(id.to_string()));
    }

    ids
}

/// Maps a group path onto a tenant id, if it names one.
pub fn tenant_from_group(group: &str) -> Option<&str> {
    let group = group.strip_prefix('/').unwrap_or(group);
    group.strip_prefix(GROUP_TENANT_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_organization_ids_are_verbatim() {
        let claims = json!({"sub": "u-1", "organization": ["org-1", "org-2"]});
        assert_eq!(tenant_ids(&claims), vec!["org-1", "org-2"]);

        let keyed = json!({"sub": "u-1", "organization": {"org-1": {"name": "Acme"}}});
        assert_eq!(tenant_ids(&keyed), vec!["org-1"]);
    }

    #[test]
    fn test_group_ids_lose_prefix() {
        let claims = json!({"sub": "u-1", "groups": ["org-5", "/org-6", "/staff", "admins"]});
        assert_eq!(tenant_ids(&claims), vec!["5", "6"]);
    }

    #[test]
    fn test_sources_are_combined() {
        let claims = json!({
            "sub": "u-1",
            "organization": ["org-1"],
            "groups": ["/org-5", "/org-5"],
        });
        assert_eq!(tenant_ids(&claims), vec!["org-1", "5"]);
    }

    #[test]
    fn test_no_membership_claims() {
        assert!(tenant_ids(&json!({"sub": "u-1"})).is_empty());
        assert!(tenant_ids(&json!({"sub": "u-1", "groups": "org-1"})).is_empty());
    }

    #[test]
    fn test_bare_prefix_is_not_a_tenant() {
        assert_eq!(tenant_from_group("/org-"), Some(""));
        assert!(tenant_ids(&json!({"groups": ["/org-"]})).is_empty());
    }

    #[test]
    fn test_resolved_identity() {
        let identity = ResolvedIdentity::from_claims(&json!({
            "sub": "u-1",
            "email": "ada@example.com",
            "preferred_username": "ada",
            "groups": ["/org-7"],
        }))
        .unwrap();

        assert_eq!(identity.subject, "u-1");
        assert_eq!(identity.email.as_deref(), Some("ada@example.com"));
        assert_eq!(identity.display_name.as_deref(), Some("ada"));
        assert_eq!(identity.tenant_ids, vec!["7"]);
    }

    #[test]
    fn test_missing_subject() {
        let err = ResolvedIdentity::from_claims(&json!({"email": "x@example.com"})).unwrap_err();
        assert!(matches!(err, IdentityError::MissingClaim("sub")));
    }

    proptest! {
        #[test]
        fn prop_group_prefix_stripped(id in "[0-9a-z]{1,8}") {
            let slashed = format!("/org-{id}");
            let bare = format!("org-{id}");
            prop_assert_eq!(tenant_from_group(&slashed), Some(id.as_str()));
            prop_assert_eq!(tenant_from_group(&bare), Some(id.as_str()));
        }
    }
}
