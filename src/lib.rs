//! agentflow - 目标驱动的智能体编排
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、任务上下文与生命周期、任务调度、编排器
//! - **flow**: 决策策略、执行记录、编排主循环
//! - **machine**: 状态寄存器（转移表 + 进入/退出动作）与订单处理示例
//! - **observability**: 日志初始化
//! - **tools**: 工具注册表、输入契约、执行器与内置工具

pub mod config;
pub mod core;
pub mod flow;
pub mod machine;
pub mod observability;
pub mod tools;

pub use crate::core::{Orchestrator, TaskStatus};
pub use flow::{DecisionPolicy, RulePolicy, TaskResult};
