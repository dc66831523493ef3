//! 核心编排层：错误、任务上下文、生命周期、任务调度、编排器

pub mod context;
pub mod error;
pub mod orchestrator;
pub mod state;
pub mod task_scheduler;

pub use context::FlowContext;
pub use error::{AgentError, FieldDiagnostic, MachineError, RegistryError, ToolError};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use state::{task_lifecycle, TaskEvent, TaskLifecycle, TaskStatus};
pub use task_scheduler::TaskScheduler;
