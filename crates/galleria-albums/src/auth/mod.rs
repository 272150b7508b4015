//! Authentication: session user loading, the login guard and the identity
//! provider.

pub mod claims;
pub mod middleware;
pub mod oidc;

pub use claims::{tenant_from_group, tenant_ids, ResolvedIdentity};
pub use middleware::{load_user, require_auth, LOAD_USER, LOGIN_PATH, REQUIRE_AUTH};
pub use oidc::{IdentityProvider, OidcProvider};
