//! Declarative endpoint descriptors.
//!
//! An endpoint is described with [`endpoint`] and a chain of builder calls,
//! ending in exactly one target: [`handler`](EndpointBuilder::handler),
//! [`raw_handler`](EndpointBuilder::raw_handler) or
//! [`render_view`](EndpointBuilder::render_view). The builder only
//! accumulates; mistakes are reported when the application is built.
//!
//! ```
//! use galleria_core::ApiError;
//! use galleria_server::endpoint;
//! use http::{Method, StatusCode};
//! use serde_json::json;
//!
//! let ping = endpoint(Method::GET, "/ping", "ping")
//!     .description("Liveness probe for load balancers")
//!     .status(StatusCode::OK)
//!     .handler(|_ctx| async move { Ok::<_, ApiError>(json!({"pong": true})) })
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(ping.name(), "ping");
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use galleria_core::{validate, ApiError, Dto, ValidationFailure};
use galleria_docs::{ApiSchema, Schema};
use galleria_middleware::{BoxFuture, MiddlewareUnit, Reply, RequestContext};
use http::{HeaderValue, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::error::ConfigError;

/// Handler whose result is wrapped in the `{data, meta}` envelope.
pub type JsonHandlerFn =
    Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Result<Value, ApiError>> + Send + Sync>;

/// Handler producing the complete reply.
pub type RawHandlerFn =
    Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Result<Reply, ApiError>> + Send + Sync>;

/// Produces the data a view template is rendered with.
pub type ViewDataFn = JsonHandlerFn;

/// What an endpoint executes once its BEFORE middleware passed.
#[derive(Clone)]
pub enum Target {
    /// Serialize the result into the envelope.
    Handler(JsonHandlerFn),
    /// Use the returned reply as-is.
    Raw(RawHandlerFn),
    /// Render a template with the returned data.
    View {
        /// Template name.
        template: String,
        /// Data provider.
        data: ViewDataFn,
    },
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(_) => f.write_str("Handler"),
            Self::Raw(_) => f.write_str("Raw"),
            Self::View { template, .. } => f.debug_struct("View").field("template", template).finish(),
        }
    }
}

type InputParser =
    Arc<dyn Fn(Value, &mut RequestContext) -> Result<(), ValidationFailure> + Send + Sync>;

/// Validated input declared by an endpoint.
///
/// Parsing stores the typed value in the request context, where the
/// handler retrieves it with [`RequestContext::take_input`].
#[derive(Clone)]
pub struct InputSpec {
    parser: InputParser,
    schema: Schema,
    type_name: &'static str,
}

impl InputSpec {
    /// Describes input of type `T`.
    #[must_use]
    pub fn of<T: Dto + ApiSchema>() -> Self {
        Self {
            parser: Arc::new(|raw, ctx| {
                let input = validate::<T>(raw)?;
                ctx.set_input(input);
                Ok(())
            }),
            schema: T::schema(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Returns the OpenAPI schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validates `raw` and stores the result in `ctx`.
    pub fn parse(&self, raw: Value, ctx: &mut RequestContext) -> Result<(), ValidationFailure> {
        (self.parser)(raw, ctx)
    }
}

impl fmt::Debug for InputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSpec").field("type", &self.type_name).finish()
    }
}

/// Starts describing an endpoint.
pub fn endpoint(method: Method, path: impl Into<String>, name: impl Into<String>) -> EndpointBuilder {
    EndpointBuilder {
        method,
        path: path.into(),
        name: name.into(),
        middleware: Vec::new(),
        description: None,
        hidden: false,
        content_type: None,
        input: None,
        output: None,
        status: StatusCode::OK,
        targets: Vec::new(),
    }
}

/// Accumulates an endpoint description.
#[derive(Debug)]
pub struct EndpointBuilder {
    method: Method,
    path: String,
    name: String,
    middleware: Vec<Arc<MiddlewareUnit>>,
    description: Option<String>,
    hidden: bool,
    content_type: Option<String>,
    input: Option<InputSpec>,
    output: Option<Schema>,
    status: StatusCode,
    targets: Vec<Target>,
}

impl EndpointBuilder {
    /// Appends an endpoint-level middleware unit.
    pub fn middleware(mut self, unit: impl Into<Arc<MiddlewareUnit>>) -> Self {
        self.middleware.push(unit.into());
        self
    }

    /// Sets the description shown in the API documentation.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Leaves this endpoint out of the OpenAPI document.
    pub fn hide_from_openapi(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Overrides the response `Content-Type`.
    pub fn response_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Validates the merged request input as `T` before the handler runs.
    pub fn input<T: Dto + ApiSchema>(mut self) -> Self {
        self.input = Some(InputSpec::of::<T>());
        self
    }

    /// Documents the `data` payload as `T`.
    pub fn output<T: ApiSchema>(mut self) -> Self {
        self.output = Some(T::schema());
        self
    }

    /// Sets the success status of [`handler`](Self::handler) replies.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sets a handler whose result is wrapped in the envelope.
    pub fn handler<F, Fut, T>(mut self, f: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.targets.push(Target::Handler(json_handler(f)));
        self
    }

    /// Sets a handler that produces the complete reply.
    pub fn raw_handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, ApiError>> + Send + 'static,
    {
        self.targets.push(Target::Raw(Arc::new(move |ctx| Box::pin(f(ctx)))));
        self
    }

    /// Renders `template` with the value produced by `data`.
    pub fn render_view<F, Fut, T>(mut self, template: impl Into<String>, data: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.targets.push(Target::View {
            template: template.into(),
            data: json_handler(data),
        });
        self
    }

    /// Returns the endpoint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checks the description and freezes it.
    pub fn build(mut self) -> Result<Endpoint, ConfigError> {
        let target = match self.targets.len() {
            0 => {
                return Err(ConfigError::MissingTarget {
                    endpoint: self.name,
                    method: self.method.to_string(),
                    path: self.path,
                })
            }
            1 => self.targets.remove(0),
            count => {
                return Err(ConfigError::MultipleTargets {
                    endpoint: self.name,
                    count,
                })
            }
        };

        let content_type = match self.content_type {
            Some(raw) => Some(HeaderValue::from_str(&raw).map_err(|_| {
                ConfigError::InvalidContentType {
                    endpoint: self.name.clone(),
                    content_type: raw.clone(),
                }
            })?),
            None => None,
        };

        Ok(Endpoint {
            method: self.method,
            path: self.path,
            name: self.name,
            middleware: self.middleware,
            description: self.description,
            hidden: self.hidden,
            content_type,
            input: self.input,
            output: self.output,
            status: self.status,
            target,
        })
    }
}

fn json_handler<F, Fut, T>(f: F) -> JsonHandlerFn
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    T: Serialize + 'static,
{
    Arc::new(move |ctx| {
        let fut = f(ctx);
        Box::pin(async move {
            let value = fut.await?;
            serde_json::to_value(value)
                .map_err(|e| ApiError::internal_with_source("Failed to serialize response", e))
        })
    })
}

/// A checked, immutable endpoint description.
#[derive(Debug, Clone)]
pub struct Endpoint {
    method: Method,
    path: String,
    name: String,
    middleware: Vec<Arc<MiddlewareUnit>>,
    description: Option<String>,
    hidden: bool,
    content_type: Option<HeaderValue>,
    input: Option<InputSpec>,
    output: Option<Schema>,
    status: StatusCode,
    target: Target,
}

impl Endpoint {
    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the path relative to the controller.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the logical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the endpoint-level middleware.
    pub fn middleware(&self) -> &[Arc<MiddlewareUnit>] {
        &self.middleware
    }

    /// Returns the description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns `true` if the endpoint is left out of the API documentation.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Returns the content type override.
    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.content_type.as_ref()
    }

    /// Returns the declared input.
    pub fn input(&self) -> Option<&InputSpec> {
        self.input.as_ref()
    }

    /// Returns the documented output schema.
    pub fn output(&self) -> Option<&Schema> {
        self.output.as_ref()
    }

    /// Returns the success status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the target.
    pub fn target(&self) -> &Target {
        &self.target
    }
}
