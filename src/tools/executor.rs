//! 工具执行器
//!
//! 持有共享的 ToolRegistry 与单次调用超时；超时转为 ToolError::Execution，
//! 每次调用输出结构化审计日志（JSON，含 flow_id）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::timeout;

use crate::core::{FlowContext, ToolError};
use crate::tools::ToolRegistry;

/// 工具执行器：对每次调用施加超时并记录审计日志。可在多个 Task 间共享。
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self::shared(Arc::new(registry), Duration::from_secs(timeout_secs))
    }

    pub fn shared(registry: Arc<ToolRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub async fn execute(
        &self,
        ctx: &FlowContext,
        tool_name: &str,
        args: Value,
    ) -> Result<Value, ToolError> {
        let start = Instant::now();
        let args_preview = args_preview(&args);
        let result = timeout(self.timeout, self.registry.invoke(tool_name, args))
            .await
            .unwrap_or_else(|_| {
                Err(ToolError::Execution {
                    tool: tool_name.to_string(),
                    message: format!("timed out after {}s", self.timeout.as_secs_f64()),
                })
            });

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "flow_id": ctx.flow_id,
            "tool": tool_name,
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit, "tool");

        result
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
