//! 执行记录：单个 Task 内只追加的步骤日志

use serde::Serialize;
use serde_json::Value;

/// 步骤类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// 决策选中了工具
    ToolSelection,
    ToolExecution,
    ToolExecutionError,
    /// 任务状态转移（终止条目）
    Transition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepEntry {
    /// 在记录中的序号
    pub index: usize,
    /// 所属的循环步（从 0 开始）
    pub step: usize,
    pub kind: StepKind,
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// 只追加的执行记录；由单个 Task 独占
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExecutionRecord {
    entries: Vec<StepEntry>,
}

impl ExecutionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: usize, kind: StepKind, payload: Value, result: Option<Value>) {
        let entry = StepEntry {
            index: self.entries.len(),
            step,
            kind,
            payload,
            result,
        };
        tracing::debug!(index = entry.index, step, kind = ?kind, "record step");
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[StepEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&StepEntry> {
        self.entries.last()
    }

    pub fn kinds(&self) -> Vec<StepKind> {
        self.entries.iter().map(|e| e.kind).collect()
    }

    /// 按类型计数
    pub fn count(&self, kind: StepKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append_only_indices() {
        let mut record = ExecutionRecord::new();
        assert!(record.is_empty());
        assert!(record.last().is_none());
        record.push(0, StepKind::ToolSelection, json!({"tool": "get_current_time"}), None);
        record.push(0, StepKind::ToolExecution, json!({"tool": "get_current_time"}), Some(json!({})));

        assert_eq!(record.len(), 2);
        assert!(!record.is_empty());
        assert_eq!(record.last().map(|e| e.kind), Some(StepKind::ToolExecution));
        assert_eq!(record.entries()[1].index, 1);
        assert_eq!(record.count(StepKind::ToolExecution), 1);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value[0]["kind"], "tool_selection");
        assert!(value[0].get("result").is_none());
    }
}
