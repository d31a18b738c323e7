#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    None,
    Required,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum Tool {
    #[serde(rename = "function")]
    Function(FunctionTool),
}

impl Tool {
    pub fn name(&self) -> &str {
        match self {
            Tool::Function(function) => function.name(),
        }
    }
}

impl From<FunctionTool> for Tool {
    fn from(function: FunctionTool) -> Self {
        Tool::Function(function)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FunctionTool {
    /// The name of the function
    name: String,

    /// The description of the function
    description: String,

    /// The parameters of the function in JSON Schema format
    parameters: serde_json::Value,
}

impl FunctionTool {
    pub fn new(name: &str, description: &str, parameters: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    /// An object schema where every listed property is a required string.
    pub fn with_required_strings(name: &str, description: &str, properties: &[(&str, &str)]) -> Self {
        let mut schema_properties = serde_json::Map::new();
        for (property, property_description) in properties {
            schema_properties.insert(
                property.to_string(),
                serde_json::json!({ "type": "string", "description": property_description }),
            );
        }
        let required: Vec<&str> = properties.iter().map(|(property, _)| *property).collect();

        Self::new(
            name,
            description,
            serde_json::json!({
                "type": "object",
                "properties": schema_properties,
                "required": required,
                "additionalProperties": false,
            }),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &serde_json::Value {
        &self.parameters
    }

    /// Names listed under the schema's `required` key.
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(|required| required.as_array())
            .map(|required| required.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }
}
