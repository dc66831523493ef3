//! 任务上下文：每个 Task 独立的 flow_id，随调用链显式传递
//!
//! 日志通过 span("flow", flow_id) 关联到具体任务，并发任务之间互不干扰。

use tracing::Span;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct FlowContext {
    pub flow_id: String,
    pub goal: String,
}

impl FlowContext {
    pub fn new(goal: impl Into<String>) -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self {
            flow_id: id[..8].to_string(),
            goal: goal.into(),
        }
    }

    /// 任务级 span，loop / executor 的日志都在其中输出
    pub fn span(&self) -> Span {
        tracing::info_span!("flow", flow_id = %self.flow_id)
    }
}
