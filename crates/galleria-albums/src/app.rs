//! Application assembly.
//!
//! [`AppState`] holds the long-lived collaborators; [`build_app`] turns them
//! and the configuration into a [`galleria_server::App`].

use std::path::Path;
use std::sync::Arc;

use galleria_config::GalleriaConfig;
use galleria_middleware::{stages, MemorySessionStore, SessionConfig, SessionManager};
use galleria_server::{App, HealthRegistry, MiniJinjaRenderer, TemplateRenderer};

use crate::auth::{load_user, IdentityProvider, OidcProvider};
use crate::controllers;
use crate::error::StartupError;
use crate::repository::{AlbumRepository, MemoryAlbumRepository, MemoryUserRepository, UserRepository};
use crate::service::AlbumService;

const BUNDLED_TEMPLATES: [(&str, &str); 2] = [
    ("home.html", include_str!("../templates/home.html")),
    ("dashboard.html", include_str!("../templates/dashboard.html")),
];

/// Long-lived collaborators shared by all requests.
#[derive(Clone)]
pub struct AppState {
    /// Album storage.
    pub albums: Arc<dyn AlbumRepository>,
    /// User storage.
    pub users: Arc<dyn UserRepository>,
    /// Login provider.
    pub identity: Arc<dyn IdentityProvider>,
    /// Page renderer.
    pub renderer: Arc<dyn TemplateRenderer>,
    /// Session handling.
    pub sessions: SessionManager,
    /// Health and readiness hooks.
    pub health: Arc<HealthRegistry>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    /// Builds a state backed by in-memory storage.
    ///
    /// Templates come from `views.templates_dir` when that directory exists
    /// and from the copies compiled into the binary otherwise.
    pub fn in_memory(config: &GalleriaConfig) -> Result<Self, StartupError> {
        let identity = OidcProvider::new(config.oidc.clone())?;
        let sessions = SessionManager::new(
            Arc::new(MemorySessionStore::new(config.session.max_age())),
            SessionConfig {
                cookie_name: config.session.cookie_name.clone(),
                secure: config.session.secure,
                max_age: config.session.max_age(),
            },
        );

        Ok(Self {
            albums: Arc::new(MemoryAlbumRepository::new()),
            users: Arc::new(MemoryUserRepository::new()),
            identity: Arc::new(identity),
            renderer: renderer_for(&config.views.templates_dir)?,
            sessions,
            health: Arc::new(HealthRegistry::new()),
        })
    }

    /// Replaces the identity provider.
    #[must_use]
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    /// Replaces the health registry.
    #[must_use]
    pub fn with_health(mut self, health: Arc<HealthRegistry>) -> Self {
        self.health = health;
        self
    }

    /// Replaces the template renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }
}

fn renderer_for(templates_dir: &str) -> Result<Arc<dyn TemplateRenderer>, StartupError> {
    if Path::new(templates_dir).is_dir() {
        tracing::debug!(dir = %templates_dir, "loading templates from disk");
        return Ok(Arc::new(MiniJinjaRenderer::new(templates_dir)));
    }
    Ok(Arc::new(MiniJinjaRenderer::from_templates(BUNDLED_TEMPLATES)?))
}

/// Wires `state` into an application.
///
/// Global middleware runs in this order: request id, then session user.
pub fn build_app(config: &GalleriaConfig, state: AppState) -> Result<App, StartupError> {
    let docs = &config.docs;
    let service = AlbumService::new(Arc::clone(&state.albums));

    let mut builder = App::builder()
        .title(docs.title.clone())
        .version(docs.version.clone())
        .middleware(stages::request_id())
        .middleware(load_user(Arc::clone(&state.users)))
        .controller(controllers::views::routes(docs.title.clone(), service.clone()))
        .controller(controllers::auth::routes(
            Arc::clone(&state.identity),
            Arc::clone(&state.users),
        ))
        .controller(controllers::albums::routes(service))
        .renderer(state.renderer)
        .sessions(state.sessions)
        .health(state.health)
        .expose_internal_errors(config.server.expose_internal_errors)
        .assets_dir(&docs.assets_dir);
    if let Some(description) = &docs.description {
        builder = builder.description(description.clone());
    }

    Ok(builder.build()?)
}
