//! Server-rendered views.
//!
//! View endpoints hand a JSON value to a [`TemplateRenderer`]. The default
//! implementation, [`MiniJinjaRenderer`], loads templates from a directory
//! with HTML auto-escaping for `.html` files.

use std::path::Path;

use minijinja::Environment;
use serde_json::Value;
use thiserror::Error;

/// Errors from template rendering.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The template does not exist.
    #[error("template not found: {0}")]
    NotFound(String),

    /// The template failed to compile or render.
    #[error("failed to render template '{name}': {source}")]
    Render {
        /// Template name.
        name: String,
        /// Engine error.
        #[source]
        source: minijinja::Error,
    },
}

/// Renders named templates.
pub trait TemplateRenderer: Send + Sync + 'static {
    /// Renders `name` with `data` as its context.
    fn render(&self, name: &str, data: &Value) -> Result<String, ViewError>;
}

/// [`TemplateRenderer`] backed by MiniJinja.
///
/// # Example
///
/// ```
/// use galleria_server::{MiniJinjaRenderer, TemplateRenderer};
/// use serde_json::json;
///
/// let renderer = MiniJinjaRenderer::from_templates([("hello.html", "Hi {{ name }}")]).unwrap();
/// assert_eq!(renderer.render("hello.html", &json!({"name": "<b>"})).unwrap(), "Hi &lt;b&gt;");
/// ```
#[derive(Debug)]
pub struct MiniJinjaRenderer {
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    /// Loads templates lazily from `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(dir.as_ref()));
        Self { env }
    }

    /// Compiles the given `(name, source)` pairs.
    pub fn from_templates<I, N, S>(templates: I) -> Result<Self, ViewError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let mut env = Environment::new();
        for (name, source) in templates {
            let name = name.into();
            env.add_template_owned(name.clone(), source.into())
                .map_err(|source| ViewError::Render { name, source })?;
        }
        Ok(Self { env })
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(&self, name: &str, data: &Value) -> Result<String, ViewError> {
        let template = self.env.get_template(name).map_err(|err| {
            if err.kind() == minijinja::ErrorKind::TemplateNotFound {
                ViewError::NotFound(name.to_string())
            } else {
                ViewError::Render {
                    name: name.to_string(),
                    source: err,
                }
            }
        })?;

        template.render(data).map_err(|source| ViewError::Render {
            name: name.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("dashboard.html"),
            "{% for a in albums %}<li>{{ a }}</li>{% endfor %}",
        )
        .unwrap();

        let renderer = MiniJinjaRenderer::new(dir.path());
        let html = renderer
            .render("dashboard.html", &json!({"albums": ["Summer", "Winter"]}))
            .unwrap();
        assert_eq!(html, "<li>Summer</li><li>Winter</li>");
    }

    #[test]
    fn test_missing_template() {
        let renderer = MiniJinjaRenderer::from_templates(Vec::<(String, String)>::new()).unwrap();
        let err = renderer.render("nope.html", &json!({})).unwrap_err();
        assert!(matches!(err, ViewError::NotFound(name) if name == "nope.html"));
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = MiniJinjaRenderer::from_templates([("broken.html", "{% if %}")]).unwrap_err();
        assert!(matches!(err, ViewError::Render { name, .. } if name == "broken.html"));
    }
}
