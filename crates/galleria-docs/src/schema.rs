//! JSON Schema definitions and self-describing types.
//!
//! [`Schema`] is the subset of JSON Schema used by OpenAPI 3.1 documents.
//! Types that appear as endpoint input or output implement [`ApiSchema`] so
//! the generator can describe them without a separate contract file.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// JSON Schema type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// String type.
    String,
    /// Number type.
    Number,
    /// Integer type.
    Integer,
    /// Boolean type.
    Boolean,
    /// Array type.
    Array,
    /// Object type.
    Object,
    /// Null type.
    Null,
}

/// JSON Schema definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,
    /// Schema format (e.g., "date-time", "uri").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Object properties.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    /// Required properties.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Array item schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Enum values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[serde(rename = "enum")]
    pub enum_values: Vec<serde_json::Value>,
    /// Minimum value (for numbers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Maximum value (for numbers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Minimum length (for strings).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "minLength")]
    pub min_length: Option<u64>,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Whether `null` is accepted.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

impl Schema {
    /// Create a string schema.
    #[must_use]
    pub fn string() -> Self {
        Self::typed(SchemaType::String)
    }

    /// Create an integer schema.
    #[must_use]
    pub fn integer() -> Self {
        Self::typed(SchemaType::Integer)
    }

    /// Create a number schema.
    #[must_use]
    pub fn number() -> Self {
        Self::typed(SchemaType::Number)
    }

    /// Create a boolean schema.
    #[must_use]
    pub fn boolean() -> Self {
        Self::typed(SchemaType::Boolean)
    }

    /// Create an array schema with the given item schema.
    #[must_use]
    pub fn array(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::typed(SchemaType::Array)
        }
    }

    /// Create an object schema.
    #[must_use]
    pub fn object() -> Self {
        Self::typed(SchemaType::Object)
    }

    /// Create a string schema restricted to `values`.
    #[must_use]
    pub fn string_enum<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enum_values: values
                .into_iter()
                .map(|v| serde_json::Value::String(v.into()))
                .collect(),
            ..Self::string()
        }
    }

    fn typed(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Default::default()
        }
    }

    /// Add a description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Set the format.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Set the minimum string length.
    #[must_use]
    pub fn with_min_length(mut self, min: u64) -> Self {
        self.min_length = Some(min);
        self
    }

    /// Set the numeric range.
    #[must_use]
    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.minimum = min;
        self.maximum = max;
        self
    }

    /// Set the default value.
    #[must_use]
    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Mark as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Add a property to an object schema.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Mark a property as required.
    #[must_use]
    pub fn required_property(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    /// Add a property and mark it as required.
    #[must_use]
    pub fn required_field(self, name: impl Into<String>, schema: Schema) -> Self {
        let name = name.into();
        self.property(name.clone(), schema).required_property(name)
    }

    /// Returns `true` if `name` is a required property.
    #[must_use]
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

/// A type that can describe its JSON shape.
///
/// # Example
///
/// ```
/// use galleria_docs::{ApiSchema, Schema};
///
/// struct Tag {
///     label: String,
/// }
///
/// impl ApiSchema for Tag {
///     fn schema() -> Schema {
///         Schema::object().required_field("label", String::schema())
///     }
/// }
///
/// assert!(Tag::schema().is_required("label"));
/// ```
pub trait ApiSchema {
    /// Returns the schema.
    fn schema() -> Schema;
}

impl ApiSchema for String {
    fn schema() -> Schema {
        Schema::string()
    }
}

impl ApiSchema for bool {
    fn schema() -> Schema {
        Schema::boolean()
    }
}

impl ApiSchema for u32 {
    fn schema() -> Schema {
        Schema::integer().with_range(Some(0.0), None)
    }
}

impl ApiSchema for u64 {
    fn schema() -> Schema {
        Schema::integer().with_range(Some(0.0), None)
    }
}

impl ApiSchema for i64 {
    fn schema() -> Schema {
        Schema::integer()
    }
}

impl ApiSchema for f64 {
    fn schema() -> Schema {
        Schema::number()
    }
}

impl ApiSchema for serde_json::Value {
    fn schema() -> Schema {
        Schema::default()
    }
}

impl ApiSchema for () {
    fn schema() -> Schema {
        Schema::typed(SchemaType::Null)
    }
}

impl<T: ApiSchema> ApiSchema for Option<T> {
    fn schema() -> Schema {
        T::schema().nullable()
    }
}

impl<T: ApiSchema> ApiSchema for Vec<T> {
    fn schema() -> Schema {
        Schema::array(T::schema())
    }
}
