//! Application assembly.
//!
//! [`App::builder`] collects controllers, global middleware and
//! collaborators; [`AppBuilder::build`] runs the single registration pass:
//!
//! 1. every controller and endpoint description is checked,
//! 2. full paths are resolved and checked for conflicts,
//! 3. each endpoint's middleware chain is composed (global, controller,
//!    endpoint),
//! 4. the OpenAPI document and the RapiDoc page are generated,
//! 5. the built-in endpoints (`/healthz`, `/readyz`, `/openapi.json`,
//!    `/api.html`, `/assets/rapidoc-min.js`) are mounted.
//!
//! The result is an immutable [`ServerContext`] shared by every request.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use galleria_docs::{DocsError, OpenApi, OpenApiGenerator, OperationSpec, RapiDoc, Tag};
use galleria_middleware::{MiddlewareChain, MiddlewareUnit, SessionManager, TEXT_HTML};
use http::Method;

use crate::controller::{Controller, ControllerBuilder};
use crate::endpoint::{Endpoint, Target};
use crate::error::ConfigError;
use crate::health::HealthRegistry;
use crate::meta::{self, MetaAssets};
use crate::router::{join_paths, normalize_template, RouteError, Router};
use crate::views::TemplateRenderer;

/// Default directory holding the documentation viewer script.
pub const DEFAULT_ASSETS_DIR: &str = "assets";

/// One registered endpoint with its resolved path and middleware chain.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    path: String,
    endpoint: Endpoint,
    chain: MiddlewareChain,
}

impl RouteEntry {
    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        self.endpoint.method()
    }

    /// Returns the full path template.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the endpoint name.
    pub fn name(&self) -> &str {
        self.endpoint.name()
    }

    /// Returns the endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the composed middleware chain.
    pub fn chain(&self) -> &MiddlewareChain {
        &self.chain
    }
}

/// Everything a request needs, built once by [`AppBuilder::build`].
pub struct ServerContext {
    pub(crate) openapi: OpenApi,
    pub(crate) openapi_json: String,
    pub(crate) docs_html: String,
    pub(crate) router: Router,
    pub(crate) routes: Vec<RouteEntry>,
    pub(crate) health: Arc<HealthRegistry>,
    pub(crate) sessions: SessionManager,
    pub(crate) renderer: Option<Arc<dyn TemplateRenderer>>,
    pub(crate) expose_internal_errors: bool,
}

impl fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerContext")
            .field("routes", &self.routes.len())
            .field("operations", &self.openapi.operation_count())
            .field("expose_internal_errors", &self.expose_internal_errors)
            .finish_non_exhaustive()
    }
}

impl ServerContext {
    /// Returns the generated OpenAPI document.
    pub fn openapi(&self) -> &OpenApi {
        &self.openapi
    }

    /// Returns the OpenAPI document as served.
    pub fn openapi_json(&self) -> &str {
        &self.openapi_json
    }

    /// Returns the RapiDoc page as served.
    pub fn docs_html(&self) -> &str {
        &self.docs_html
    }

    /// Returns every registered route, built-ins last.
    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    /// Finds the route registered for `method` and `path` template.
    pub fn route(&self, method: &Method, path: &str) -> Option<&RouteEntry> {
        self.routes
            .iter()
            .find(|r| r.method() == method && r.path() == path)
    }

    /// Returns the health registry.
    pub fn health(&self) -> &Arc<HealthRegistry> {
        &self.health
    }

    /// Returns the session manager.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }
}

/// A built application, cheap to clone.
#[derive(Debug, Clone)]
pub struct App {
    pub(crate) ctx: Arc<ServerContext>,
}

impl App {
    /// Starts assembling an application.
    pub fn builder() -> AppBuilder {
        AppBuilder::default()
    }

    /// Returns the shared context.
    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    /// Returns the health registry.
    pub fn health(&self) -> &Arc<HealthRegistry> {
        &self.ctx.health
    }
}

/// Collects the parts of an [`App`].
pub struct AppBuilder {
    title: String,
    version: String,
    description: Option<String>,
    middleware: Vec<Arc<MiddlewareUnit>>,
    controllers: Vec<ControllerBuilder>,
    renderer: Option<Arc<dyn TemplateRenderer>>,
    sessions: Option<SessionManager>,
    health: Option<Arc<HealthRegistry>>,
    expose_internal_errors: bool,
    assets_dir: PathBuf,
    builtin_routes: bool,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self {
            title: "API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            middleware: Vec::new(),
            controllers: Vec::new(),
            renderer: None,
            sessions: None,
            health: None,
            expose_internal_errors: false,
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            builtin_routes: true,
        }
    }
}

impl fmt::Debug for AppBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppBuilder")
            .field("title", &self.title)
            .field("controllers", &self.controllers.len())
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

impl AppBuilder {
    /// Sets the API title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the API version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the API description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a global middleware unit.
    pub fn middleware(mut self, unit: impl Into<Arc<MiddlewareUnit>>) -> Self {
        self.middleware.push(unit.into());
        self
    }

    /// Adds a controller.
    pub fn controller(mut self, controller: ControllerBuilder) -> Self {
        self.controllers.push(controller);
        self
    }

    /// Sets the renderer used by view endpoints.
    pub fn renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Sets the session manager. Defaults to an in-memory store.
    pub fn sessions(mut self, sessions: SessionManager) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Sets the health registry. Defaults to a fresh registry.
    pub fn health(mut self, health: Arc<HealthRegistry>) -> Self {
        self.health = Some(health);
        self
    }

    /// Sends 5xx messages and details to clients instead of a generic message.
    pub fn expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    /// Sets the directory `rapidoc-min.js` is served from.
    pub fn assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = dir.into();
        self
    }

    /// Mounts (or not) the built-in health and documentation endpoints.
    pub fn builtin_routes(mut self, enabled: bool) -> Self {
        self.builtin_routes = enabled;
        self
    }

    /// Runs the registration pass.
    pub fn build(self) -> Result<App, ConfigError> {
        let health = self
            .health
            .unwrap_or_else(|| Arc::new(HealthRegistry::new()));
        let mut table = RouteTable {
            global: self.middleware,
            has_renderer: self.renderer.is_some(),
            router: Router::new(),
            routes: Vec::new(),
            operations: Vec::new(),
        };

        for builder in self.controllers {
            table.mount(&builder.build()?)?;
        }

        let mut generator = OpenApiGenerator::new()
            .title(self.title.as_str())
            .version(self.version.as_str());
        if let Some(description) = &self.description {
            generator = generator.description(description.as_str());
        }
        let openapi = generator.generate(&table.operations)?;
        let openapi_json = serde_json::to_string(&openapi).map_err(DocsError::from)?;
        let docs_html = RapiDoc::new(format!("{} API", self.title)).html();

        if self.builtin_routes {
            let assets = MetaAssets {
                openapi_json: openapi_json.clone(),
                docs_html: docs_html.clone(),
                assets_dir: self.assets_dir,
            };
            table.mount(&meta::controller(Arc::clone(&health), assets).build()?)?;
        }

        tracing::info!(
            routes = table.routes.len(),
            documented = openapi.operation_count(),
            "application built"
        );

        Ok(App {
            ctx: Arc::new(ServerContext {
                openapi,
                openapi_json,
                docs_html,
                router: table.router,
                routes: table.routes,
                health,
                sessions: self.sessions.unwrap_or_else(SessionManager::in_memory),
                renderer: self.renderer,
                expose_internal_errors: self.expose_internal_errors,
            }),
        })
    }
}

struct RouteTable {
    global: Vec<Arc<MiddlewareUnit>>,
    has_renderer: bool,
    router: Router,
    routes: Vec<RouteEntry>,
    operations: Vec<OperationSpec>,
}

impl RouteTable {
    fn mount(&mut self, controller: &Controller) -> Result<(), ConfigError> {
        for endpoint in controller.endpoints() {
            let path = normalize_template(&join_paths(controller.base_path(), endpoint.path()));
            let index = self.routes.len();

            self.router
                .add_route(endpoint.method().clone(), &path, index)
                .map_err(|err| match err {
                    RouteError::InvalidPath(p) => ConfigError::InvalidPath(p),
                    RouteError::Conflict { existing } => ConfigError::DuplicateRoute {
                        method: endpoint.method().to_string(),
                        path: path.clone(),
                        existing: self.routes[existing].name().to_string(),
                    },
                })?;

            let is_view = matches!(endpoint.target(), Target::View { .. });
            if is_view && !self.has_renderer {
                return Err(ConfigError::MissingRenderer {
                    endpoint: endpoint.name().to_string(),
                });
            }

            let chain = MiddlewareChain::compose(&[
                self.global.as_slice(),
                controller.middleware(),
                endpoint.middleware(),
            ]);
            tracing::debug!(
                method = %endpoint.method(),
                path = %path,
                endpoint = endpoint.name(),
                middleware = ?chain.names(),
                "route registered"
            );

            if !endpoint.is_hidden() {
                self.operations.push(operation_spec(controller, endpoint, &path, is_view));
            }

            self.routes.push(RouteEntry {
                path,
                endpoint: endpoint.clone(),
                chain,
            });
        }
        Ok(())
    }
}

fn operation_spec(controller: &Controller, endpoint: &Endpoint, path: &str, is_view: bool) -> OperationSpec {
    let mut op = OperationSpec::new(endpoint.method().clone(), path, endpoint.name());
    op.description = endpoint.description().map(ToString::to_string);
    op.tag = controller.tag().map(|name| Tag {
        name: name.to_string(),
        description: controller.description().map(ToString::to_string),
    });
    op.input = endpoint.input().map(|input| input.schema().clone());
    op.output = endpoint.output().cloned();
    op.status = endpoint.status().as_u16();
    op.content_type = endpoint
        .content_type()
        .and_then(|ct| ct.to_str().ok())
        .map(ToString::to_string)
        .or_else(|| is_view.then(|| TEXT_HTML.to_string()));
    op
}
