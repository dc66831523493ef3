//! Task 生命周期：RUNNING -> DONE_SUCCESS / DONE_FAILURE / DONE_STEP_LIMIT
//!
//! 生命周期本身也是一个 StateRegister：所有终止状态都没有出边。

use serde::Serialize;

use crate::core::MachineError;
use crate::machine::StateRegister;

/// Task 状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Running,
    DoneSuccess,
    DoneFailure,
    DoneStepLimit,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Running => "RUNNING",
            TaskStatus::DoneSuccess => "DONE_SUCCESS",
            TaskStatus::DoneFailure => "DONE_FAILURE",
            TaskStatus::DoneStepLimit => "DONE_STEP_LIMIT",
        }
    }
}

/// 驱动 Task 终止的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEvent {
    /// 无后续动作且上一步成功
    GoalReached,
    /// 无后续动作且没有可用结果
    GoalUnmet,
    ToolFailed,
    BudgetExhausted,
}

pub type TaskLifecycle = StateRegister<TaskStatus, TaskEvent, ()>;

pub fn task_lifecycle() -> Result<TaskLifecycle, MachineError> {
    StateRegister::builder(TaskStatus::Running)
        .transition(TaskStatus::Running, TaskEvent::GoalReached, TaskStatus::DoneSuccess)
        .transition(TaskStatus::Running, TaskEvent::GoalUnmet, TaskStatus::DoneFailure)
        .transition(TaskStatus::Running, TaskEvent::ToolFailed, TaskStatus::DoneFailure)
        .transition(TaskStatus::Running, TaskEvent::BudgetExhausted, TaskStatus::DoneStepLimit)
        .build()
}
