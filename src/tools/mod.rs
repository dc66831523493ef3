pub mod calculation;
pub mod contract;
pub mod executor;
pub mod knowledge;
pub mod registry;
pub mod schema;
pub mod search;
pub mod time;
pub mod weather;

pub use calculation::CalculationTool;
pub use contract::{Constraint, FieldSpec, FieldType, InputContract, ToolInput};
pub use executor::ToolExecutor;
pub use knowledge::KnowledgeBaseTool;
pub use registry::{Tool, ToolRegistry};
pub use schema::{tool_call_schema_json, ToolCall};
pub use search::SearchTool;
pub use time::CurrentTimeTool;
pub use weather::WeatherTool;

use crate::config::ToolsSection;
use crate::core::RegistryError;

/// 注册全部内置工具
pub fn default_registry(cfg: &ToolsSection) -> Result<ToolRegistry, RegistryError> {
    let mut tools = ToolRegistry::new();
    tools.register(CurrentTimeTool)?;
    tools.register(KnowledgeBaseTool::new())?;
    tools.register(CalculationTool)?;
    tools.register(WeatherTool)?;
    tools.register(SearchTool::new(
        cfg.search.default_engine.clone(),
        cfg.search.min_query_chars,
    ))?;
    Ok(tools)
}
