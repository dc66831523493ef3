//! 编排过程事件：用于流式展示步数、工具调用、观察结果与终止状态

use serde::Serialize;

use crate::core::TaskStatus;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEvent {
    /// 当前第几步
    StepUpdate { step: usize, max_steps: usize },
    /// 调用工具
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览）
    Observation { tool: String, preview: String },
    ToolFailure { tool: String, reason: String },
    /// Task 终止
    Finished {
        status: TaskStatus,
        final_answer: String,
    },
}
