//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `AGENTFLOW__*` 覆盖（双下划线表示嵌套，如 `AGENTFLOW__ORCHESTRATOR__MAX_STEPS=8`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub orchestrator: OrchestratorSection,
    pub tools: ToolsSection,
    pub logging: LoggingSection,
}

/// [app] 段
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [orchestrator] 段：步数预算与并发任务上限
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorSection {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
        }
    }
}

fn default_max_steps() -> usize {
    5
}

fn default_max_concurrent_tasks() -> usize {
    4
}

/// [tools] 段：单次工具调用超时、检索工具设置
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default)]
    pub search: SearchSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
            search: SearchSection::default(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    30
}

/// [tools.search] 段
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSection {
    #[serde(default = "default_engine")]
    pub default_engine: String,
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            default_engine: default_engine(),
            min_query_chars: default_min_query_chars(),
        }
    }
}

fn default_engine() -> String {
    "Google".to_string()
}

fn default_min_query_chars() -> usize {
    3
}

/// [logging] 段：默认日志级别，RUST_LOG 优先
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// 加载配置，环境变量 AGENTFLOW__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 AGENTFLOW__*
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        if std::path::Path::new(&format!("{name}.toml")).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("AGENTFLOW")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
