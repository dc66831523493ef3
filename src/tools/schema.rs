//! 工具调用请求及其 JSON Schema（schemars 自动生成）

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 决策产出的工具调用：{"tool": "...", "args": {...}}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ToolCall {
    /// 工具名，如 get_current_time、perform_calculation
    pub tool: String,
    /// 原始参数，调用前由注册表按契约校验
    #[serde(default)]
    pub args: Value,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>, args: Value) -> Self {
        Self {
            tool: tool.into(),
            args,
        }
    }
}

/// 返回工具调用的 JSON Schema 字符串
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCall);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_call_schema_has_fields() {
        let schema: Value = serde_json::from_str(&tool_call_schema_json()).unwrap();
        assert!(schema["properties"].get("tool").is_some());
        assert!(schema["properties"].get("args").is_some());
    }

    #[test]
    fn test_args_default_to_null() {
        let call: ToolCall = serde_json::from_str(r#"{"tool": "get_current_time"}"#).unwrap();
        assert_eq!(call, ToolCall::new("get_current_time", Value::Null));
    }
}
