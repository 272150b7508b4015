//! OpenID Connect login.
//!
//! The authorization-code flow needs two things from the provider: the URL
//! the browser is sent to, and the exchange of the returned code for the
//! user's claims. [`IdentityProvider`] captures exactly that so tests can
//! swap in a fake.

use std::time::Duration;

use async_trait::async_trait;
use galleria_config::OidcSettings;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::claims::ResolvedIdentity;
use crate::error::IdentityError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// An external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Returns the URL that starts a login carrying `state`.
    fn authorize_url(&self, state: &str) -> String;

    /// Redeems an authorization code.
    async fn exchange(&self, code: &str) -> Result<ResolvedIdentity, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// [`IdentityProvider`] speaking OIDC over HTTP.
#[derive(Debug, Clone)]
pub struct OidcProvider {
    client: Client,
    settings: OidcSettings,
}

impl OidcProvider {
    /// Creates a provider for `settings`.
    pub fn new(settings: OidcSettings) -> Result<Self, IdentityError> {
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self { client, settings })
    }

    /// Returns the settings.
    pub fn settings(&self) -> &OidcSettings {
        &self.settings
    }

    async fn redeem_code(&self, code: &str) -> Result<String, IdentityError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.settings.redirect_url.as_str()),
            ("client_id", self.settings.client_id.as_str()),
        ];
        if let Some(secret) = &self.settings.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = self
            .client
            .post(self.settings.token_endpoint())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "token endpoint rejected authorization code");
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(format!("token response: {e}")))?;
        Ok(token.access_token)
    }

    async fn fetch_claims(&self, access_token: &str) -> Result<Value, IdentityError> {
        let response = self
            .client
            .get(self.settings.userinfo_endpoint())
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "userinfo endpoint rejected access token");
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(format!("userinfo response: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    fn authorize_url(&self, state: &str) -> String {
        let scope = self.settings.scopes.join(" ");
        let query = serde_urlencoded::to_string([
            ("response_type", "code"),
            ("client_id", self.settings.client_id.as_str()),
            ("redirect_uri", self.settings.redirect_url.as_str()),
            ("scope", scope.as_str()),
            ("state", state),
        ])
        .unwrap_or_default();

        let endpoint = self.settings.authorize_endpoint();
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        format!("{endpoint}{separator}{query}")
    }

    async fn exchange(&self, code: &str) -> Result<ResolvedIdentity, IdentityError> {
        let access_token = self.redeem_code(code).await?;
        let claims = self.fetch_claims(&access_token).await?;
        let identity = ResolvedIdentity::from_claims(&claims)?;
        tracing::debug!(
            subject = %identity.subject,
            tenants = identity.tenant_ids.len(),
            "identity resolved"
        );
        Ok(identity)
    }
}
