//! OpenAPI document generation from registered endpoints.
//!
//! The server describes each visible endpoint as an [`OperationSpec`]; the
//! [`OpenApiGenerator`] turns the list into one [`OpenApi`] document.
//!
//! Inputs of `GET` and `DELETE` operations become query parameters, inputs of
//! every other method become a JSON request body. Path parameters are read
//! from `{name}` segments. JSON outputs are wrapped in the `{data, meta}`
//! envelope, and every operation documents the `{error}` body as its default
//! response.

use std::sync::OnceLock;

use http::Method;
use indexmap::IndexMap;
use regex::Regex;

use crate::error::{DocsError, DocsResult};
use crate::openapi::{
    Info, MediaType, OpenApi, Operation, Parameter, ParameterIn, PathItem, RequestBody, Response,
    Server, Tag,
};
use crate::schema::Schema;

const JSON: &str = "application/json";

/// Description of one documented endpoint.
#[derive(Debug, Clone)]
pub struct OperationSpec {
    /// HTTP method.
    pub method: Method,
    /// Full path template, e.g. `/api/v1/albums/{id}`.
    pub path: String,
    /// Operation ID.
    pub operation_id: String,
    /// Description.
    pub description: Option<String>,
    /// Tag of the owning controller.
    pub tag: Option<Tag>,
    /// Input schema, if the endpoint validates input.
    pub input: Option<Schema>,
    /// Output schema of the `data` field.
    pub output: Option<Schema>,
    /// Success status code.
    pub status: u16,
    /// Response content type, when not JSON.
    pub content_type: Option<String>,
}

impl OperationSpec {
    /// Creates a JSON operation answering 200.
    pub fn new(method: Method, path: impl Into<String>, operation_id: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            operation_id: operation_id.into(),
            description: None,
            tag: None,
            input: None,
            output: None,
            status: 200,
            content_type: None,
        }
    }

    fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map_or(true, |ct| ct.starts_with(JSON))
    }
}

/// Builds OpenAPI documents.
///
/// # Example
///
/// ```
/// use galleria_docs::{OpenApiGenerator, OperationSpec, Schema};
/// use http::Method;
///
/// let mut get = OperationSpec::new(Method::GET, "/albums/{id}", "getAlbum");
/// get.output = Some(Schema::object().required_field("id", Schema::string()));
///
/// let doc = OpenApiGenerator::new().title("Galleria").generate(&[get]).unwrap();
/// let op = doc.operation("get", "/albums/{id}").unwrap();
/// assert_eq!(op.parameters[0].name, "id");
/// ```
#[derive(Debug, Clone)]
pub struct OpenApiGenerator {
    title: String,
    version: String,
    description: Option<String>,
    servers: Vec<Server>,
}

impl Default for OpenApiGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenApiGenerator {
    /// Create a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            title: "API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            servers: Vec::new(),
        }
    }

    /// Set the API title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the API version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the API description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a server.
    #[must_use]
    pub fn server(mut self, url: impl Into<String>, description: Option<String>) -> Self {
        self.servers.push(Server {
            url: url.into(),
            description,
        });
        self
    }

    /// Generate a document for `operations`.
    pub fn generate(&self, operations: &[OperationSpec]) -> DocsResult<OpenApi> {
        let mut paths: IndexMap<String, PathItem> = IndexMap::new();
        let mut tags: IndexMap<String, Tag> = IndexMap::new();

        for spec in operations {
            let method = spec.method.as_str().to_ascii_lowercase();
            let operation = convert_operation(spec);

            let slot = paths
                .entry(spec.path.clone())
                .or_default()
                .method_slot(&method)
                .ok_or_else(|| DocsError::InvalidOperation {
                    operation_id: spec.operation_id.clone(),
                    reason: format!("unsupported HTTP method: {}", spec.method),
                })?;
            if slot.is_some() {
                return Err(DocsError::DuplicateOperation {
                    method: spec.method.to_string(),
                    path: spec.path.clone(),
                });
            }
            *slot = Some(operation);

            if let Some(tag) = &spec.tag {
                tags.entry(tag.name.clone()).or_insert_with(|| tag.clone());
            }
        }

        Ok(OpenApi {
            openapi: "3.1.0".to_string(),
            info: Info {
                title: self.title.clone(),
                version: self.version.clone(),
                description: self.description.clone(),
            },
            servers: self.servers.clone(),
            paths,
            components: None,
            tags: tags.into_values().collect(),
        })
    }

    /// Generate the document as pretty-printed JSON.
    pub fn generate_json(&self, operations: &[OperationSpec]) -> DocsResult<String> {
        let doc = self.generate(operations)?;
        serde_json::to_string_pretty(&doc).map_err(DocsError::from)
    }
}

fn convert_operation(spec: &OperationSpec) -> Operation {
    let path_names = path_parameter_names(&spec.path);
    let input = spec.input.clone();

    let mut parameters: Vec<Parameter> = path_names
        .iter()
        .map(|name| Parameter {
            name: name.clone(),
            location: ParameterIn::Path,
            description: None,
            required: true,
            schema: Some(
                input
                    .as_ref()
                    .and_then(|s| s.properties.get(name).cloned())
                    .unwrap_or_else(Schema::string),
            ),
        })
        .collect();

    let mut request_body = None;
    if let Some(mut input) = input {
        for name in &path_names {
            input.properties.shift_remove(name);
            input.required.retain(|r| r != name);
        }

        if spec.method == Method::GET || spec.method == Method::DELETE {
            parameters.extend(input.properties.iter().map(|(name, schema)| Parameter {
                name: name.clone(),
                location: ParameterIn::Query,
                description: schema.description.clone(),
                required: input.is_required(name),
                schema: Some(schema.clone()),
            }));
        } else {
            let mut content = IndexMap::new();
            content.insert(JSON.to_string(), MediaType { schema: Some(input) });
            request_body = Some(RequestBody {
                required: true,
                content,
            });
        }
    }

    let success = if spec.is_json() {
        Response::with_content(
            "Successful response",
            spec.content_type.clone().unwrap_or_else(|| JSON.to_string()),
            Some(envelope_schema(spec.output.clone())),
        )
    } else {
        Response::with_content(
            "Successful response",
            spec.content_type.clone().unwrap_or_default(),
            None,
        )
    };

    let mut responses = IndexMap::new();
    responses.insert(spec.status.to_string(), success);
    responses.insert(
        "default".to_string(),
        Response::with_content("Error", JSON, Some(error_schema())),
    );

    Operation {
        operation_id: spec.operation_id.clone(),
        description: spec.description.clone(),
        tags: spec.tag.iter().map(|t| t.name.clone()).collect(),
        parameters,
        request_body,
        responses,
    }
}

/// Wraps a payload schema in the `{data, meta}` envelope.
#[must_use]
pub fn envelope_schema(data: Option<Schema>) -> Schema {
    Schema::object()
        .required_field("data", data.unwrap_or_default())
        .required_field(
            "meta",
            Schema::object().required_field("serverTime", Schema::string().with_format("date-time")),
        )
}

/// Schema of the `{error: {message, details?}}` body.
#[must_use]
pub fn error_schema() -> Schema {
    Schema::object().required_field(
        "error",
        Schema::object()
            .required_field("message", Schema::string())
            .property("details", Schema::default()),
    )
}

/// Extract parameter names from a path template like `/albums/{id}`.
fn path_parameter_names(path: &str) -> Vec<String> {
    static PARAM: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(regex) = PARAM.get_or_init(|| Regex::new(r"\{([^}]+)\}").ok()) else {
        return Vec::new();
    };

    regex
        .captures_iter(path)
        .filter_map(|cap| cap.get(1))
        .map(|name| name.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_query() -> Schema {
        Schema::object()
            .property("page", Schema::integer())
            .required_field("search", Schema::string())
    }

    #[test]
    fn test_extract_path_parameters() {
        assert_eq!(path_parameter_names("/users/{userId}/orders/{orderId}"), vec!["userId", "orderId"]);
        assert!(path_parameter_names("/users").is_empty());
    }

    #[test]
    fn test_get_input_becomes_query_parameters() {
        let mut spec = OperationSpec::new(Method::GET, "/albums", "listAlbums");
        spec.input = Some(list_query());

        let doc = OpenApiGenerator::new().generate(&[spec]).unwrap();
        let op = doc.operation("get", "/albums").unwrap();

        assert!(op.request_body.is_none());
        assert_eq!(op.parameters.len(), 2);
        assert_eq!(op.parameters[0].location, ParameterIn::Query);
        assert!(!op.parameters[0].required);
        assert!(op.parameters[1].required);
    }

    #[test]
    fn test_post_input_becomes_body_without_path_params() {
        let mut spec = OperationSpec::new(Method::PATCH, "/albums/{id}", "updateAlbum");
        spec.input = Some(
            Schema::object()
                .required_field("id", Schema::string().with_format("uuid"))
                .property("name", Schema::string()),
        );

        let doc = OpenApiGenerator::new().generate(&[spec]).unwrap();
        let op = doc.operation("patch", "/albums/{id}").unwrap();

        assert_eq!(op.parameters.len(), 1);
        assert_eq!(op.parameters[0].schema.as_ref().unwrap().format.as_deref(), Some("uuid"));

        let body = op.request_body.as_ref().unwrap().content[JSON].schema.as_ref().unwrap();
        assert!(body.properties.contains_key("name"));
        assert!(!body.properties.contains_key("id"));
        assert!(!body.is_required("id"));
    }

    #[test]
    fn test_output_is_enveloped() {
        let mut spec = OperationSpec::new(Method::POST, "/albums", "createAlbum");
        spec.status = 201;
        spec.output = Some(Schema::object().required_field("id", Schema::string()));

        let doc = OpenApiGenerator::new().generate(&[spec]).unwrap();
        let op = doc.operation("post", "/albums").unwrap();
        let schema = op.responses["201"].content[JSON].schema.as_ref().unwrap();

        assert!(schema.is_required("data"));
        assert!(schema.properties["data"].is_required("id"));
        assert!(schema.properties["meta"].is_required("serverTime"));
        assert!(op.responses.contains_key("default"));
    }

    #[test]
    fn test_html_response_has_no_schema() {
        let mut spec = OperationSpec::new(Method::GET, "/dashboard", "dashboard");
        spec.content_type = Some("text/html; charset=utf-8".to_string());

        let doc = OpenApiGenerator::new().generate(&[spec]).unwrap();
        let response = &doc.operation("get", "/dashboard").unwrap().responses["200"];
        assert!(response.content["text/html; charset=utf-8"].schema.is_none());
    }

    #[test]
    fn test_duplicate_operation_rejected() {
        let a = OperationSpec::new(Method::GET, "/albums", "a");
        let b = OperationSpec::new(Method::GET, "/albums", "b");

        let err = OpenApiGenerator::new().generate(&[a, b]).unwrap_err();
        assert!(matches!(err, DocsError::DuplicateOperation { .. }));
    }

    #[test]
    fn test_tags_collected_once() {
        let tag = Tag {
            name: "Albums".to_string(),
            description: Some("Photo albums".to_string()),
        };
        let mut a = OperationSpec::new(Method::GET, "/albums", "listAlbums");
        a.tag = Some(tag.clone());
        let mut b = OperationSpec::new(Method::POST, "/albums", "createAlbum");
        b.tag = Some(tag);

        let doc = OpenApiGenerator::new()
            .title("Galleria")
            .version("0.1.0")
            .generate(&[a, b])
            .unwrap();
        assert_eq!(doc.tags.len(), 1);
        assert_eq!(doc.info.title, "Galleria");
        assert_eq!(doc.operation("get", "/albums").unwrap().tags, vec!["Albums"]);
    }

    #[test]
    fn test_generate_json() {
        let json = OpenApiGenerator::new()
            .generate_json(&[OperationSpec::new(Method::GET, "/", "home")])
            .unwrap();
        assert!(json.contains("\"openapi\": \"3.1.0\""));
    }
}
