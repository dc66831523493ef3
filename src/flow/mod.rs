//! 决策层：决策策略、执行记录、编排主循环

pub mod events;
pub mod loop_;
pub mod policy;
pub mod record;

pub use events::FlowEvent;
pub use loop_::{run_flow, FlowSession, TaskResult};
pub use policy::{DecisionPolicy, Rule, RulePolicy};
pub use record::{ExecutionRecord, StepEntry, StepKind};
