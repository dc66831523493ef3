//! 当前时间工具

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::tools::{Tool, ToolInput};

/// 返回当前 UTC 时间（RFC 3339）
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current time (UTC, RFC 3339). No arguments."
    }

    fn output_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "current_time": { "type": "string" } },
            "required": ["current_time"]
        })
    }

    async fn execute(&self, _input: ToolInput) -> Result<Value, String> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        Ok(serde_json::json!({ "current_time": now }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_current_time_is_rfc3339() {
        let out = CurrentTimeTool.execute(ToolInput::default()).await.unwrap();
        let text = out["current_time"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(text).is_ok());
    }
}
