//! Tool schema presented to the chat service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Machine-readable description of one callable function: its name, what it
/// does, and a JSON-schema-shaped definition of its parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    /// Function name the model will request.
    pub name: String,
    /// What the function does, for the model's benefit.
    pub description: String,
    /// JSON schema for the function arguments.
    pub parameters: Value,
}

impl ToolSchema {
    /// Build a schema from its parts.
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ToolSchema;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn schema_serializes_parameters_verbatim() {
        let schema = ToolSchema::new(
            "set_city",
            "Set the user's preferred city",
            json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"],
            }),
        );
        let value = serde_json::to_value(&schema).expect("serialize");
        assert_eq!(value["name"], "set_city");
        assert_eq!(value["parameters"]["required"][0], "city");
    }
}
