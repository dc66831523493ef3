//! 编排器：持有共享的工具执行器与决策策略，为每个目标运行一个独立的 Task
//!
//! run_task 单任务；run_tasks 并发运行多个任务（受 TaskScheduler 限流），
//! 每个 Task 拥有独立的 FlowContext 与执行记录。

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::{AppConfig, ToolsSection};
use crate::core::{task_lifecycle, AgentError, FlowContext, TaskScheduler};
use crate::flow::{run_flow, DecisionPolicy, FlowEvent, FlowSession, RulePolicy, TaskResult};
use crate::tools::{default_registry, ToolExecutor, ToolRegistry};

pub struct Orchestrator {
    executor: Arc<ToolExecutor>,
    policy: Arc<dyn DecisionPolicy>,
    max_steps: usize,
    scheduler: TaskScheduler,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// 内置工具 + 内置规则策略
    pub fn from_config(cfg: &AppConfig) -> Result<Self, AgentError> {
        Self::builder().config(cfg).build()
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.executor.tool_names()
    }

    /// 使用默认步数预算
    pub async fn run(&self, goal: &str) -> TaskResult {
        self.run_task(goal, self.max_steps).await
    }

    pub async fn run_task(&self, goal: &str, max_steps: usize) -> TaskResult {
        let ctx = FlowContext::new(goal);
        let session = FlowSession::new(self.policy.as_ref(), &self.executor);
        run_flow(&session, &ctx, max_steps).await
    }

    /// 运行并推送过程事件
    pub async fn run_task_with_events(
        &self,
        goal: &str,
        max_steps: usize,
        event_tx: &UnboundedSender<FlowEvent>,
    ) -> TaskResult {
        let ctx = FlowContext::new(goal);
        let session = FlowSession::new(self.policy.as_ref(), &self.executor).with_event_tx(event_tx);
        run_flow(&session, &ctx, max_steps).await
    }

    /// 并发运行多个目标；结果顺序与输入一致
    pub async fn run_tasks<I, S>(&self, goals: I) -> Vec<TaskResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tasks = goals.into_iter().map(|goal| {
            let goal: String = goal.into();
            async move {
                let _permit = self.scheduler.acquire().await;
                self.run(&goal).await
            }
        });
        join_all(tasks).await
    }
}

/// Orchestrator 构造器
pub struct OrchestratorBuilder {
    registry: Option<ToolRegistry>,
    policy: Option<Arc<dyn DecisionPolicy>>,
    max_steps: usize,
    tool_timeout: Duration,
    max_concurrent_tasks: usize,
    tools_cfg: ToolsSection,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        let cfg = AppConfig::default();
        Self {
            registry: None,
            policy: None,
            max_steps: cfg.orchestrator.max_steps,
            tool_timeout: Duration::from_secs(cfg.tools.tool_timeout_secs),
            max_concurrent_tasks: cfg.orchestrator.max_concurrent_tasks,
            tools_cfg: cfg.tools,
        }
    }
}

impl OrchestratorBuilder {
    pub fn config(mut self, cfg: &AppConfig) -> Self {
        self.max_steps = cfg.orchestrator.max_steps;
        self.max_concurrent_tasks = cfg.orchestrator.max_concurrent_tasks;
        self.tool_timeout = Duration::from_secs(cfg.tools.tool_timeout_secs);
        self.tools_cfg = cfg.tools.clone();
        self
    }

    /// 自定义工具集；未设置时注册全部内置工具
    pub fn registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 自定义决策策略；未设置时使用 RulePolicy::standard()
    pub fn policy(mut self, policy: impl DecisionPolicy + 'static) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn max_concurrent_tasks(mut self, n: usize) -> Self {
        self.max_concurrent_tasks = n;
        self
    }

    pub fn build(self) -> Result<Orchestrator, AgentError> {
        // 生命周期转移表在构造时验证一次
        task_lifecycle()?;

        let registry = match self.registry {
            Some(r) => r,
            None => default_registry(&self.tools_cfg)?,
        };
        let policy = self
            .policy
            .unwrap_or_else(|| Arc::new(RulePolicy::standard()));
        tracing::info!(
            tools = ?registry.tool_names(),
            max_steps = self.max_steps,
            "orchestrator ready"
        );

        Ok(Orchestrator {
            executor: Arc::new(ToolExecutor::shared(Arc::new(registry), self.tool_timeout)),
            policy,
            max_steps: self.max_steps,
            scheduler: TaskScheduler::new(self.max_concurrent_tasks),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskStatus;
    use crate::tools::{Tool, ToolCall, ToolInput};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 记录同时在执行的调用数峰值
    struct GaugeTool {
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for GaugeTool {
        fn name(&self) -> &str {
            "gauge"
        }

        fn description(&self) -> &str {
            "Tracks concurrent invocations"
        }

        async fn execute(&self, _input: ToolInput) -> Result<Value, String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(json!({ "done": true }))
        }
    }

    fn gauge_once(_: &str, last: Option<&Value>) -> Option<ToolCall> {
        last.is_none().then(|| ToolCall::new("gauge", json!({})))
    }

    #[tokio::test]
    async fn test_run_tasks_is_concurrent_and_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry
            .register(GaugeTool {
                in_flight,
                peak: peak.clone(),
            })
            .unwrap();

        let orchestrator = Orchestrator::builder()
            .registry(registry)
            .policy(gauge_once)
            .max_concurrent_tasks(2)
            .build()
            .unwrap();

        let goals: Vec<String> = (0..6).map(|i| format!("goal {i}")).collect();
        let results = orchestrator.run_tasks(goals.clone()).await;

        assert_eq!(results.len(), 6);
        for (result, goal) in results.iter().zip(&goals) {
            assert_eq!(&result.goal, goal);
            assert_eq!(result.status, TaskStatus::DoneSuccess);
            assert_eq!(result.history.len(), 3);
        }
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak concurrency {peak}");
        assert!(peak >= 2, "tasks did not overlap");

        // 每个 Task 有自己的 flow_id
        let mut ids: Vec<_> = results.iter().map(|r| r.flow_id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }

    #[tokio::test]
    async fn test_default_build_registers_builtin_tools() {
        let orchestrator = Orchestrator::from_config(&AppConfig::default()).unwrap();
        assert_eq!(orchestrator.max_steps(), 5);
        assert_eq!(
            orchestrator.tool_names(),
            vec![
                "get_current_time",
                "get_weather",
                "perform_calculation",
                "query_knowledge_base",
                "search_information"
            ]
        );
    }

    #[tokio::test]
    async fn test_run_task_with_events_reports_finish() {
        let orchestrator = Orchestrator::builder().build().unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let result = orchestrator
            .run_task_with_events("What is the time?", 5, &tx)
            .await;
        drop(tx);

        let mut last = None;
        while let Some(ev) = rx.recv().await {
            last = Some(ev);
        }
        match last {
            Some(FlowEvent::Finished { status, .. }) => assert_eq!(status, result.status),
            other => panic!("Expected Finished, got {other:?}"),
        }
    }
}
