//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / input_contract / execute），由 ToolRegistry 按名注册。
//! invoke(name, raw_args) 依次：查找 -> 契约校验 -> 执行，并把失败（包括 panic）统一转为 ToolError。

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use serde_json::Value;

use crate::core::{RegistryError, ToolError};
use crate::tools::{InputContract, ToolInput};

/// 工具 trait：名称、描述、输入契约、输出形状、异步执行
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（ToolCall 中的 "tool" 字段）
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// 输入契约，注册时读取一次并固定
    fn input_contract(&self) -> InputContract {
        InputContract::new()
    }

    /// 成功输出的 JSON Schema（仅用于展示）
    fn output_schema(&self) -> Value {
        serde_json::json!({ "type": "object" })
    }

    /// 执行工具；Err 为工具自身的错误输出
    async fn execute(&self, input: ToolInput) -> Result<Value, String>;
}

/// 注册后的工具：实现与注册时固定下来的契约
struct ToolDescriptor {
    tool: Arc<dyn Tool>,
    contract: InputContract,
}

/// 工具注册表：构造阶段可变，共享后只读（Arc<ToolRegistry>），可并发 invoke
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；空名、重名、非法契约均为致命错误
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        let contract = tool.input_contract();
        contract
            .check()
            .map_err(|reason| RegistryError::MalformedContract {
                tool: name.clone(),
                reason,
            })?;
        tracing::debug!(tool = %name, "tool registered");
        self.tools.insert(
            name,
            ToolDescriptor {
                tool: Arc::new(tool),
                contract,
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// 校验参数并调用工具。永远返回结果变体，不向调用方传播 panic。
    pub async fn invoke(&self, name: &str, raw_args: Value) -> Result<Value, ToolError> {
        let descriptor = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let args = descriptor
            .contract
            .validate(&raw_args)
            .map_err(|diagnostics| ToolError::InvalidInput {
                tool: name.to_string(),
                diagnostics,
            })?;

        let outcome = AssertUnwindSafe(descriptor.tool.execute(ToolInput::new(args)))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(message)) => Err(ToolError::Execution {
                tool: name.to_string(),
                message,
            }),
            Err(panic) => Err(ToolError::Execution {
                tool: name.to_string(),
                message: format!("tool panicked: {}", panic_message(panic.as_ref())),
            }),
        }
    }

    /// 已注册工具名（排序，便于稳定输出）
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// 返回 (name, description) 列表
    pub fn tool_descriptions(&self) -> Vec<(String, String)> {
        self.tool_names()
            .into_iter()
            .filter_map(|name| {
                let desc = self.tools.get(&name)?.tool.description().to_string();
                Some((name, desc))
            })
            .collect()
    }

    /// 工具清单 JSON：名称、描述、参数 schema、输出 schema
    pub fn to_schema_json(&self) -> String {
        let tools: Vec<Value> = self
            .tool_names()
            .iter()
            .filter_map(|name| self.tools.get(name).map(|d| (name, d)))
            .map(|(name, d)| {
                serde_json::json!({
                    "name": name,
                    "description": d.tool.description(),
                    "parameters": d.contract.to_json_schema(),
                    "output": d.tool.output_schema(),
                })
            })
            .collect();
        serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Constraint, FieldSpec, FieldType};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 计数探针：记录 execute 被调用的次数
    struct SpyTool {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for SpyTool {
        fn name(&self) -> &str {
            "spy"
        }

        fn description(&self) -> &str {
            "Counts invocations"
        }

        fn input_contract(&self) -> InputContract {
            InputContract::new().field(
                FieldSpec::required("location", FieldType::String).with(Constraint::NonEmpty),
            )
        }

        async fn execute(&self, input: ToolInput) -> Result<Value, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "location": input.str("location") }))
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &str {
            "panics"
        }

        fn description(&self) -> &str {
            "Always panics"
        }

        async fn execute(&self, _input: ToolInput) -> Result<Value, String> {
            panic!("index out of range");
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "fails"
        }

        fn description(&self) -> &str {
            "Returns an error output"
        }

        async fn execute(&self, _input: ToolInput) -> Result<Value, String> {
            Err("upstream unavailable".to_string())
        }
    }

    struct MalformedTool;

    #[async_trait]
    impl Tool for MalformedTool {
        fn name(&self) -> &str {
            "malformed"
        }

        fn description(&self) -> &str {
            "Declares an impossible contract"
        }

        fn input_contract(&self) -> InputContract {
            InputContract::new()
                .field(FieldSpec::required("n", FieldType::Integer).with(Constraint::NonEmpty))
        }

        async fn execute(&self, _input: ToolInput) -> Result<Value, String> {
            Ok(Value::Null)
        }
    }

    fn spy_registry() -> (ToolRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry
            .register(SpyTool {
                calls: calls.clone(),
            })
            .unwrap();
        (registry, calls)
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_tool() {
        let (registry, calls) = spy_registry();

        for bad in [json!({}), json!({"location": ""}), json!({"location": 7}), json!("Paris")] {
            let err = registry.invoke("spy", bad).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidInput { .. }), "{err:?}");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let out = registry.invoke("spy", json!({"location": "Paris"})).await.unwrap();
        assert_eq!(out, json!({"location": "Paris"}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (registry, _) = spy_registry();
        let err = registry.invoke("non_existent_tool", json!({})).await.unwrap_err();
        assert_eq!(err, ToolError::NotFound("non_existent_tool".to_string()));
    }

    #[tokio::test]
    async fn test_panic_becomes_execution_error() {
        let mut registry = ToolRegistry::new();
        registry.register(PanickingTool).unwrap();
        let err = registry.invoke("panics", Value::Null).await.unwrap_err();
        match err {
            ToolError::Execution { tool, message } => {
                assert_eq!(tool, "panics");
                assert!(message.contains("index out of range"));
            }
            other => panic!("Expected Execution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_output_becomes_execution_error() {
        let mut registry = ToolRegistry::new();
        registry.register(FailingTool).unwrap();
        let err = registry.invoke("fails", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("upstream unavailable"));
    }

    #[test]
    fn test_registration_errors() {
        let (mut registry, calls) = spy_registry();
        let dup = registry.register(SpyTool { calls });
        assert_eq!(dup, Err(RegistryError::DuplicateTool("spy".to_string())));

        let malformed = registry.register(MalformedTool);
        assert!(matches!(malformed, Err(RegistryError::MalformedContract { .. })));
        assert_eq!(registry.tool_names(), vec!["spy".to_string()]);
        assert!(registry.contains("spy"));
        assert!(!registry.contains("malformed"));
    }

    #[test]
    fn test_schema_json_lists_contracts() {
        let (registry, _) = spy_registry();
        let schema: Value = serde_json::from_str(&registry.to_schema_json()).unwrap();
        assert_eq!(schema[0]["name"], "spy");
        assert_eq!(schema[0]["parameters"]["required"], json!(["location"]));
        assert_eq!(registry.tool_descriptions()[0].1, "Counts invocations");
    }
}
