//! Authenticated users and tenant scoping.
//!
//! [`CurrentUser`] is the identity the auth middleware attaches to a request
//! once the session user has been loaded. [`TenantScope`] is handed to
//! services explicitly: it carries the tenant every query must be limited to
//! and a tracing span pre-bound with that tenant.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::instrument::Instrumented;
use tracing::{Instrument, Span};

/// The user attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// Stable user identifier.
    pub id: String,
    /// Email address, when the identity provider shares it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Tenants the user is a member of.
    #[serde(default)]
    pub tenant_ids: Vec<String>,
}

impl CurrentUser {
    /// Returns `true` if the user belongs to the tenant.
    #[must_use]
    pub fn is_member_of(&self, tenant_id: &str) -> bool {
        self.tenant_ids.iter().any(|t| t == tenant_id)
    }

    /// Returns an identifier suitable for logging.
    #[must_use]
    pub fn log_id(&self) -> String {
        format!("user:{}", self.id)
    }
}

/// A tenant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a tenant id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TenantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Tenant identifier plus a logging span bound to it.
///
/// # Example
///
/// ```
/// use galleria_core::TenantScope;
///
/// let scope = TenantScope::new("tenant-1");
/// assert_eq!(scope.tenant_id().as_str(), "tenant-1");
/// scope.in_scope(|| tracing::info!("runs with tenant_id=tenant-1 attached"));
/// ```
#[derive(Debug, Clone)]
pub struct TenantScope {
    tenant_id: TenantId,
    span: Span,
}

impl TenantScope {
    /// Creates a scope with a fresh `tenant` span.
    #[must_use]
    pub fn new(tenant_id: impl Into<TenantId>) -> Self {
        let tenant_id = tenant_id.into();
        let span = tracing::info_span!("tenant", tenant_id = %tenant_id);
        Self { tenant_id, span }
    }

    /// Creates a scope whose span is a child of `parent`.
    #[must_use]
    pub fn with_parent(tenant_id: impl Into<TenantId>, parent: &Span) -> Self {
        let tenant_id = tenant_id.into();
        let span = tracing::info_span!(parent: parent, "tenant", tenant_id = %tenant_id);
        Self { tenant_id, span }
    }

    /// Returns the tenant id.
    #[must_use]
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Returns the pre-bound span.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Runs a closure inside the tenant span.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        self.span.in_scope(f)
    }

    /// Instruments a future with the tenant span.
    pub fn instrument<F: Future>(&self, future: F) -> Instrumented<F> {
        future.instrument(self.span.clone())
    }
}
