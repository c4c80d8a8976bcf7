//! Credential type definitions

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a credential property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyKind {
    String,
    Number,
    Boolean,
    /// One value out of a fixed list of options
    Options,
    /// Arbitrary JSON (object or JSON-encoded string)
    Json,
    /// Internal value, never exported or returned to callers
    Hidden,
}

impl PropertyKind {
    /// JSON-schema `type` for this kind
    pub fn json_type(&self) -> &'static str {
        match self {
            Self::String | Self::Options | Self::Hidden => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Json => "object",
        }
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, Self::Hidden)
    }
}

/// One selectable value of an `options` property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyOption {
    pub name: String,
    pub value: Value,
}

/// Conditions under which a property applies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayOptions {
    /// Other property name -> values that make this property apply
    #[serde(default)]
    pub show: IndexMap<String, Vec<Value>>,
}

/// A single property of a credential type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDefinition {
    pub name: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(rename = "type")]
    pub kind: PropertyKind,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<PropertyOption>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_options: Option<DisplayOptions>,
}

impl PropertyDefinition {
    /// Create a property with no default, description or options
    pub fn new(name: &str, kind: PropertyKind) -> Self {
        Self {
            name: name.to_string(),
            display_name: name.to_string(),
            kind,
            required: false,
            default: None,
            description: None,
            options: Vec::new(),
            display_options: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_options<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.options = values
            .into_iter()
            .map(|v| {
                let value = v.into();
                let name = match &value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                PropertyOption { name, value }
            })
            .collect();
        self
    }

    /// Only apply this property when `property` holds one of `values`
    pub fn shown_when<I, V>(mut self, property: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let display = self.display_options.get_or_insert_with(DisplayOptions::default);
        display.show.insert(
            property.to_string(),
            values.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Values allowed for an `options` property
    pub fn option_values(&self) -> Vec<&Value> {
        self.options.iter().map(|o| &o.value).collect()
    }
}

/// A named credential schema (e.g. "API Key", "OAuth2")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialTypeDefinition {
    /// Unique key, matched case-sensitively
    pub name: String,

    pub display_name: String,

    /// Parent type whose properties this type inherits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,

    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
}

impl CredentialTypeDefinition {
    pub fn new(name: &str, display_name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            extends: None,
            documentation_url: None,
            properties: Vec::new(),
        }
    }

    pub fn extending(mut self, parent: &str) -> Self {
        self.extends = Some(parent.to_string());
        self
    }

    pub fn with_property(mut self, property: PropertyDefinition) -> Self {
        self.properties.push(property);
        self
    }
}
