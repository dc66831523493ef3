//! 错误类型：工具调用错误、注册期错误、状态机错误
//!
//! 工具层错误（ToolError）在注册表边界被转为值，编排循环只观察结果变体；
//! 只有构造期错误（RegistryError / MachineError / 配置）才会以 AgentError 形式返回给调用方。

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// 单个字段的校验诊断
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiagnostic {
    pub field: String,
    pub message: String,
}

impl FieldDiagnostic {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_diagnostics(diagnostics: &[FieldDiagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// 工具调用结果中的错误变体（invoke 永不 panic，所有失败都落到这里）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid input for tool '{tool}': {}", join_diagnostics(.diagnostics))]
    InvalidInput {
        tool: String,
        diagnostics: Vec<FieldDiagnostic>,
    },

    #[error("Tool '{tool}' failed: {message}")]
    Execution { tool: String, message: String },
}

impl ToolError {
    /// 错误分类名，写入执行记录
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::NotFound(_) => "tool_not_found",
            ToolError::InvalidInput { .. } => "invalid_input",
            ToolError::Execution { .. } => "tool_execution_error",
        }
    }

    /// 面向用户的错误描述：执行错误只保留工具给出的原文
    pub fn reason(&self) -> String {
        match self {
            ToolError::Execution { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// 执行记录中保存的结构化错误
    pub fn to_value(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        if let ToolError::InvalidInput { diagnostics, .. } = self {
            value["diagnostics"] = serde_json::to_value(diagnostics).unwrap_or_default();
        }
        value
    }
}

/// 注册期错误：视为致命的编程错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Tool name must not be empty")]
    EmptyName,

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Malformed contract for tool '{tool}': {reason}")]
    MalformedContract { tool: String, reason: String },
}

/// 状态机构造错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MachineError {
    #[error("Conflicting transition for ({from}, {event}): {existing} vs {requested}")]
    ConflictingTransition {
        from: String,
        event: String,
        existing: String,
        requested: String,
    },
}

/// 顶层错误：只在构造编排器 / 加载配置时出现
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Config error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Machine(#[from] MachineError),
}
