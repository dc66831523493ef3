//! 编排主循环
//!
//! 每步：decide(goal, last_result) -> 无动作则终止 / 有动作则记录 tool_selection -> 执行工具 ->
//! 记录 tool_execution 或 tool_execution_error。工具失败立即终止（不自动重试），
//! 步数预算是防止死循环的唯一硬性保障。步骤严格串行。

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;
use tracing::Instrument;

use crate::core::{task_lifecycle, FlowContext, TaskEvent, TaskLifecycle, TaskStatus, ToolError};
use crate::flow::{DecisionPolicy, ExecutionRecord, FlowEvent, StepKind};
use crate::tools::registry::panic_message;
use crate::tools::ToolExecutor;

/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 单个 Task 的结果
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub flow_id: String,
    pub goal: String,
    pub status: TaskStatus,
    pub final_answer: String,
    /// 实际执行的工具调用次数
    pub steps_executed: usize,
    pub history: ExecutionRecord,
}

/// 一次循环所需的协作者
pub struct FlowSession<'a> {
    pub policy: &'a dyn DecisionPolicy,
    pub executor: &'a ToolExecutor,
    /// 可选：事件推送通道
    pub event_tx: Option<&'a UnboundedSender<FlowEvent>>,
}

impl<'a> FlowSession<'a> {
    pub fn new(policy: &'a dyn DecisionPolicy, executor: &'a ToolExecutor) -> Self {
        Self {
            policy,
            executor,
            event_tx: None,
        }
    }

    pub fn with_event_tx(mut self, tx: &'a UnboundedSender<FlowEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn send(&self, ev: FlowEvent) {
        if let Some(tx) = self.event_tx {
            let _ = tx.send(ev);
        }
    }
}

/// 运行一个 Task；所有工具层失败都体现为结果中的状态，不会返回错误
pub async fn run_flow(session: &FlowSession<'_>, ctx: &FlowContext, max_steps: usize) -> TaskResult {
    let span = ctx.span();
    run_flow_impl(session, ctx, max_steps).instrument(span).await
}

/// 终止时的簿记：推进生命周期、写终止条目、发送 Finished
struct Finisher<'s, 'a> {
    session: &'s FlowSession<'a>,
    ctx: &'s FlowContext,
    record: ExecutionRecord,
    lifecycle: TaskLifecycle,
}

impl Finisher<'_, '_> {
    fn finish(
        mut self,
        step: usize,
        event: TaskEvent,
        final_answer: String,
        steps_executed: usize,
    ) -> TaskResult {
        let from = self.lifecycle.current();
        if let Err(e) = self.lifecycle.transition(event, &()) {
            tracing::warn!(error = %e, "task lifecycle action failed");
        }
        let status = self.lifecycle.current();
        if !status.is_terminal() {
            tracing::warn!(status = status.as_str(), event = ?event, "task ended in a non-terminal state");
        }
        self.record.push(
            step,
            StepKind::Transition,
            json!({
                "from": from,
                "event": event,
                "to": status,
                "final_answer": preview(&final_answer, 100),
            }),
            None,
        );
        tracing::info!(status = status.as_str(), steps = steps_executed, "task finished");
        self.session.send(FlowEvent::Finished {
            status,
            final_answer: final_answer.clone(),
        });
        TaskResult {
            flow_id: self.ctx.flow_id.clone(),
            goal: self.ctx.goal.clone(),
            status,
            final_answer,
            steps_executed,
            history: self.record,
        }
    }
}

async fn run_flow_impl(session: &FlowSession<'_>, ctx: &FlowContext, max_steps: usize) -> TaskResult {
    let goal = ctx.goal.as_str();
    tracing::info!(goal = %goal, max_steps, "task started");

    let lifecycle = match task_lifecycle() {
        Ok(l) => l,
        Err(e) => {
            return TaskResult {
                flow_id: ctx.flow_id.clone(),
                goal: ctx.goal.clone(),
                status: TaskStatus::DoneFailure,
                final_answer: format!("Task lifecycle misconfigured: {e}"),
                steps_executed: 0,
                history: ExecutionRecord::new(),
            }
        }
    };
    let mut finisher = Finisher {
        session,
        ctx,
        record: ExecutionRecord::new(),
        lifecycle,
    };
    let mut last_result: Option<Value> = None;

    for step in 0..max_steps {
        session.send(FlowEvent::StepUpdate {
            step: step + 1,
            max_steps,
        });

        let Some(call) = session.policy.decide(goal, last_result.as_ref()) else {
            let (event, answer) = match &last_result {
                Some(result) => (
                    TaskEvent::GoalReached,
                    format!("Based on the information gathered: {result}"),
                ),
                None => (
                    TaskEvent::GoalUnmet,
                    format!("Could not complete the task: no action could be decided for goal '{goal}'"),
                ),
            };
            return finisher.finish(step, event, answer, step);
        };

        tracing::info!(step = step + 1, tool = %call.tool, "tool selected");
        finisher.record.push(
            step,
            StepKind::ToolSelection,
            json!({ "tool": call.tool, "arguments": call.args }),
            None,
        );
        session.send(FlowEvent::ToolCall {
            tool: call.tool.clone(),
            args: call.args.clone(),
        });

        // 注册表已把工具 panic 转为错误；这里兜住执行器自身的 panic
        let outcome = contain_panic(
            &call.tool,
            session.executor.execute(ctx, &call.tool, call.args.clone()),
        )
        .await;

        match outcome {
            Ok(output) => {
                session.send(FlowEvent::Observation {
                    tool: call.tool.clone(),
                    preview: preview(&output.to_string(), OBSERVATION_PREVIEW_CHARS),
                });
                finisher.record.push(
                    step,
                    StepKind::ToolExecution,
                    json!({ "tool": call.tool }),
                    Some(output.clone()),
                );
                last_result = Some(output);
            }
            Err(err) => {
                tracing::warn!(tool = %call.tool, error = %err, "tool failed");
                session.send(FlowEvent::ToolFailure {
                    tool: call.tool.clone(),
                    reason: err.to_string(),
                });
                finisher.record.push(
                    step,
                    StepKind::ToolExecutionError,
                    json!({ "tool": call.tool }),
                    Some(err.to_value()),
                );
                let answer = format!("An error occurred while using {}: {}", call.tool, err.reason());
                return finisher.finish(step, TaskEvent::ToolFailed, answer, step + 1);
            }
        }
    }

    let answer = match &last_result {
        Some(result) => format!("After {max_steps} steps, the result is: {result}"),
        None => "Task took too many steps to complete. Last known info: None".to_string(),
    };
    finisher.finish(max_steps, TaskEvent::BudgetExhausted, answer, max_steps)
}

/// 把 future 中的 panic 转为 ToolError::Execution
async fn contain_panic<F>(tool: &str, fut: F) -> Result<Value, ToolError>
where
    F: Future<Output = Result<Value, ToolError>>,
{
    AssertUnwindSafe(fut).catch_unwind().await.unwrap_or_else(|panic| {
        Err(ToolError::Execution {
            tool: tool.to_string(),
            message: format!("orchestrator caught panic: {}", panic_message(panic.as_ref())),
        })
    })
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{CalculationTool, CurrentTimeTool, ToolCall, ToolRegistry};

    fn executor() -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(CurrentTimeTool).unwrap();
        registry.register(CalculationTool).unwrap();
        ToolExecutor::new(registry, 5)
    }

    fn time_once(_: &str, last: Option<&Value>) -> Option<ToolCall> {
        match last {
            None => Some(ToolCall::new("get_current_time", json!({}))),
            Some(_) => None,
        }
    }

    #[tokio::test]
    async fn test_time_goal_succeeds() {
        let executor = executor();
        let session = FlowSession::new(&time_once, &executor);
        let ctx = FlowContext::new("What is the time?");

        let result = run_flow(&session, &ctx, 5).await;

        assert_eq!(result.status, TaskStatus::DoneSuccess);
        assert_eq!(result.steps_executed, 1);
        assert_eq!(
            result.history.kinds(),
            vec![StepKind::ToolSelection, StepKind::ToolExecution, StepKind::Transition]
        );
        assert!(result.final_answer.contains("current_time"));
        assert_eq!(result.flow_id, ctx.flow_id);
    }

    #[tokio::test]
    async fn test_no_action_without_result_fails() {
        let executor = executor();
        let never = |_: &str, _: Option<&Value>| -> Option<ToolCall> { None };
        let session = FlowSession::new(&never, &executor);

        let result = run_flow(&session, &FlowContext::new("Tell me a joke."), 5).await;

        assert_eq!(result.status, TaskStatus::DoneFailure);
        assert_eq!(result.steps_executed, 0);
        assert_eq!(result.history.kinds(), vec![StepKind::Transition]);
        assert!(result.final_answer.contains("Tell me a joke."));
    }

    #[tokio::test]
    async fn test_zero_budget_hits_step_limit() {
        let executor = executor();
        let session = FlowSession::new(&time_once, &executor);
        let result = run_flow(&session, &FlowContext::new("What is the time?"), 0).await;
        assert_eq!(result.status, TaskStatus::DoneStepLimit);
        assert_eq!(result.steps_executed, 0);
        assert!(result.final_answer.contains("Last known info: None"));
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_task() {
        let executor = executor();
        let ghost = |_: &str, _: Option<&Value>| Some(ToolCall::new("ghost", json!({})));
        let session = FlowSession::new(&ghost, &executor);

        let result = run_flow(&session, &FlowContext::new("haunt"), 5).await;

        assert_eq!(result.status, TaskStatus::DoneFailure);
        let entry = &result.history.entries()[1];
        assert_eq!(entry.kind, StepKind::ToolExecutionError);
        assert_eq!(entry.result.as_ref().unwrap()["kind"], "tool_not_found");
    }

    async fn exploding_execute() -> Result<Value, ToolError> {
        panic!("audit sink exploded")
    }

    #[tokio::test]
    async fn test_panic_outside_registry_is_contained() {
        let err = contain_panic("get_current_time", exploding_execute())
            .await
            .unwrap_err();
        match err {
            ToolError::Execution { tool, message } => {
                assert_eq!(tool, "get_current_time");
                assert!(message.contains("audit sink exploded"), "{message}");
            }
            other => panic!("Expected Execution, got {other:?}"),
        }

        let ok = contain_panic("get_current_time", async { Ok::<_, ToolError>(json!({ "ok": true })) }).await;
        assert_eq!(ok.unwrap(), json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_events_are_streamed() {
        let executor = executor();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let session = FlowSession::new(&time_once, &executor).with_event_tx(&tx);

        run_flow(&session, &FlowContext::new("What is the time?"), 5).await;
        drop(tx);

        let mut kinds = Vec::new();
        while let Some(ev) = rx.recv().await {
            kinds.push(serde_json::to_value(&ev).unwrap()["type"].as_str().unwrap().to_string());
        }
        assert_eq!(
            kinds,
            vec!["step_update", "tool_call", "observation", "step_update", "finished"]
        );
    }
}
