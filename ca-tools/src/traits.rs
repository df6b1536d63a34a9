use crate::error::{Result, ToolError};
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
}

pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
    pub risk_level: RiskLevel,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;
    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value>;
}

/// Wire shape advertised to agents that call tools over HTTP.
pub fn to_tool_descriptor(tool: &dyn Tool) -> serde_json::Value {
    let spec = tool.spec();
    serde_json::json!({
        "name": spec.name,
        "description": spec.description,
        "parameters": spec.parameters_schema,
        "risk_level": spec.risk_level,
    })
}

pub(crate) fn require_string(args: &serde_json::Value, key: &str) -> Result<String> {
    let Some(v) = args.get(key) else {
        return Err(ToolError::InvalidArguments(format!("missing key: {key}")));
    };
    match v {
        serde_json::Value::String(s) => Ok(s.clone()),
        other => Err(ToolError::InvalidArguments(format!(
            "key {key} must be string, got {other:?}"
        ))),
    }
}

pub(crate) fn optional_string(args: &serde_json::Value, key: &str) -> Result<Option<String>> {
    let Some(v) = args.get(key) else {
        return Ok(None);
    };
    match v {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s.clone())),
        other => Err(ToolError::InvalidArguments(format!(
            "key {key} must be string, got {other:?}"
        ))),
    }
}

pub(crate) fn require_i64(args: &serde_json::Value, key: &str) -> Result<i64> {
    let Some(v) = args.get(key) else {
        return Err(ToolError::InvalidArguments(format!("missing key: {key}")));
    };
    v.as_i64().ok_or_else(|| {
        ToolError::InvalidArguments(format!("key {key} must be integer, got {v:?}"))
    })
}
