//! Tool specifications advertised to the planner

use serde::Serialize;
use serde_json::{Map, Value, json};

/// Declared shape of a tool: unique name, description, ordered parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

/// A single declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    pub description: String,
}

/// Parameter value types understood by the builtins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Boolean,
    /// Array of strings
    Array,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a parameter (declaration order is preserved)
    pub fn param(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        required: bool,
        description: impl Into<String>,
    ) -> Self {
        self.parameters.push(ParamSpec {
            name: name.into(),
            param_type,
            required,
            description: description.into(),
        });
        self
    }

    /// JSON Schema object for the parameters
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut schema = match param.param_type {
                ParamType::String => json!({ "type": "string" }),
                ParamType::Integer => json!({ "type": "integer" }),
                ParamType::Boolean => json!({ "type": "boolean" }),
                ParamType::Array => json!({ "type": "array", "items": { "type": "string" } }),
            };
            if !param.description.is_empty() {
                schema["description"] = json!(param.description);
            }
            properties.insert(param.name.clone(), schema);
        }

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}
