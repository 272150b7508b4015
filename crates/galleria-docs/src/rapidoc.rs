//! RapiDoc documentation page.
//!
//! The page is a static HTML shell: it loads the RapiDoc web component from
//! a locally served script and points it at the OpenAPI document URL, so no
//! CDN is contacted and the document is never inlined.

/// Default URL of the OpenAPI document.
pub const DEFAULT_SPEC_URL: &str = "/openapi.json";
/// Default URL of the RapiDoc script.
pub const DEFAULT_SCRIPT_URL: &str = "/assets/rapidoc-min.js";

/// RapiDoc page configuration and HTML generation.
///
/// # Example
///
/// ```
/// use galleria_docs::RapiDoc;
///
/// let html = RapiDoc::new("Galleria API").html();
/// assert!(html.contains(r#"spec-url="/openapi.json""#));
/// assert!(html.contains(r#"src="/assets/rapidoc-min.js""#));
/// ```
#[derive(Debug, Clone)]
pub struct RapiDoc {
    title: String,
    spec_url: String,
    script_url: String,
    theme: RapiDocTheme,
    render_style: RenderStyle,
    allow_try: bool,
}

/// Color theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RapiDocTheme {
    /// Light background.
    #[default]
    Light,
    /// Dark background.
    Dark,
}

impl RapiDocTheme {
    fn as_attr(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// Layout of the operation list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderStyle {
    /// Expandable rows.
    View,
    /// Side navigation with one operation per page.
    #[default]
    Focused,
    /// Everything on one page.
    Read,
}

impl RenderStyle {
    fn as_attr(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Focused => "focused",
            Self::Read => "read",
        }
    }
}

impl RapiDoc {
    /// Creates a page with the default document and script URLs.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            spec_url: DEFAULT_SPEC_URL.to_string(),
            script_url: DEFAULT_SCRIPT_URL.to_string(),
            theme: RapiDocTheme::default(),
            render_style: RenderStyle::default(),
            allow_try: true,
        }
    }

    /// Sets the OpenAPI document URL.
    #[must_use]
    pub fn spec_url(mut self, url: impl Into<String>) -> Self {
        self.spec_url = url.into();
        self
    }

    /// Sets the RapiDoc script URL.
    #[must_use]
    pub fn script_url(mut self, url: impl Into<String>) -> Self {
        self.script_url = url.into();
        self
    }

    /// Sets the theme.
    #[must_use]
    pub fn theme(mut self, theme: RapiDocTheme) -> Self {
        self.theme = theme;
        self
    }

    /// Sets the render style.
    #[must_use]
    pub fn render_style(mut self, style: RenderStyle) -> Self {
        self.render_style = style;
        self
    }

    /// Enables or disables the "try it" console.
    #[must_use]
    pub fn allow_try(mut self, allow: bool) -> Self {
        self.allow_try = allow;
        self
    }

    /// Generates the HTML page.
    #[must_use]
    pub fn html(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <script type="module" src="{script_url}"></script>
</head>
<body>
    <rapi-doc
        spec-url="{spec_url}"
        theme="{theme}"
        render-style="{render_style}"
        allow-try="{allow_try}"
        show-header="false"
    ></rapi-doc>
</body>
</html>"#,
            title = html_escape(&self.title),
            script_url = html_escape(&self.script_url),
            spec_url = html_escape(&self.spec_url),
            theme = self.theme.as_attr(),
            render_style = self.render_style.as_attr(),
            allow_try = self.allow_try,
        )
    }
}

/// Simple HTML escape for XSS prevention.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
