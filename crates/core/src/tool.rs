//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what let the assistant act: read the clock, list and edit
//! calendar events, search the web. Each tool publishes a `ToolSpec` that
//! is both shown to the model and used to validate arguments before the
//! handler runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{RegistryError, ToolError};
use crate::provider::ToolDefinition;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    /// Whether a JSON value has this type.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: ParamType,

    pub required: bool,

    pub description: String,

    /// Schema of array elements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl ParamSpec {
    pub fn required(name: &str, ty: ParamType, description: &str) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            description: description.into(),
            items: None,
            default: None,
        }
    }

    pub fn optional(name: &str, ty: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty, description)
        }
    }

    pub fn with_items(mut self, items: serde_json::Value) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Declaration of a callable tool. Immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique, case-sensitive name
    pub name: String,

    /// Usage contract read by the model when choosing tools
    pub description: String,

    /// Parameters in declaration order
    pub params: Vec<ParamSpec>,
}

impl ToolSpec {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// JSON Schema of the parameter object.
    pub fn parameters_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        for p in &self.params {
            let mut prop = serde_json::json!({
                "type": p.ty.as_str(),
                "description": p.description,
            });
            if let Some(items) = &p.items {
                prop["items"] = items.clone();
            }
            if let Some(default) = &p.default {
                prop["default"] = default.clone();
            }
            properties.insert(p.name.clone(), prop);
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Convert into the definition sent to the model.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters_schema(),
        }
    }

    /// Check an argument payload against the declared parameters.
    ///
    /// `null` is accepted for optional parameters. Undeclared keys are
    /// ignored.
    pub fn validate(&self, arguments: &serde_json::Value) -> Result<(), String> {
        let Some(obj) = arguments.as_object() else {
            return Err(format!("arguments for '{}' must be a JSON object", self.name));
        };

        for p in &self.params {
            match obj.get(&p.name) {
                None | Some(serde_json::Value::Null) if p.required => {
                    return Err(format!("missing required parameter '{}'", p.name));
                }
                None | Some(serde_json::Value::Null) => {}
                Some(value) if !p.ty.accepts(value) => {
                    return Err(format!(
                        "parameter '{}' must be of type {}",
                        p.name,
                        p.ty.as_str()
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// A request to run a tool, as produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Matches the model's tool_call id
    pub call_id: String,

    pub tool_name: String,

    pub arguments: serde_json::Value,
}

/// Why a tool invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownTool,
    InvalidArguments,
    BackendFailure,
}

/// Outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { payload: serde_json::Value },
    Failure { kind: FailureKind, message: String },
}

impl ToolOutcome {
    pub fn success(payload: serde_json::Value) -> Self {
        ToolOutcome::Success { payload }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        ToolOutcome::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ToolOutcome::Failure { kind, .. } => Some(*kind),
            ToolOutcome::Success { .. } => None,
        }
    }
}

/// The result of a tool execution. Always produced, even on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub outcome: ToolOutcome,
}

/// The core Tool trait.
///
/// Handlers receive arguments that already passed `ToolSpec::validate`
/// and typically deserialize them into a typed struct.
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> &ToolSpec;

    /// Execute the tool and return its success payload.
    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError>;
}

/// Deserialize validated arguments into a handler's typed argument struct.
pub fn parse_args<T: serde::de::DeserializeOwned>(arguments: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// The set of tools exposed to the model.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.spec().name.clone();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&i| self.tools[i].as_ref())
    }

    /// All specs, in registration order.
    pub fn describe_all(&self) -> Vec<&ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// All tool definitions (for sending to the model), in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.spec().to_definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.spec().name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool {
        spec: ToolSpec,
    }

    impl EchoTool {
        fn named(name: &str) -> Self {
            Self {
                spec: ToolSpec::new(name, "Echoes back the input")
                    .param(ParamSpec::required("text", ParamType::String, "Text to echo"))
                    .param(ParamSpec::optional("times", ParamType::Integer, "Repeat count")),
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn spec(&self) -> &ToolSpec {
            &self.spec
        }

        async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
            Ok(arguments["text"].clone())
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool::named("echo"))).unwrap();
        assert!(registry.get("echo").is_some());
        assert!(registry.get("Echo").is_none());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool::named("echo"))).unwrap();
        let err = registry.register(Box::new(EchoTool::named("echo"))).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTool("echo".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn describe_all_keeps_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(Box::new(EchoTool::named(name))).unwrap();
        }
        let names: Vec<_> = registry.describe_all().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.definitions()[1].name, "alpha");
    }

    #[test]
    fn schema_lists_required_params() {
        let tool = EchoTool::named("echo");
        let schema = tool.spec().parameters_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["text"]["type"], "string");
        assert_eq!(schema["required"], serde_json::json!(["text"]));
    }

    #[test]
    fn validate_reports_missing_and_mistyped() {
        let tool = EchoTool::named("echo");
        let spec = tool.spec();

        assert!(spec.validate(&serde_json::json!({"text": "hi"})).is_ok());
        assert!(spec.validate(&serde_json::json!({"text": "hi", "times": null})).is_ok());

        let missing = spec.validate(&serde_json::json!({})).unwrap_err();
        assert!(missing.contains("text"));

        let mistyped = spec
            .validate(&serde_json::json!({"text": "hi", "times": "two"}))
            .unwrap_err();
        assert!(mistyped.contains("integer"));

        assert!(spec.validate(&serde_json::json!("hi")).is_err());
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let failure = ToolOutcome::failure(FailureKind::UnknownTool, "no such tool");
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["kind"], "unknown_tool");
        assert_eq!(json["message"], "no such tool");
    }
}
