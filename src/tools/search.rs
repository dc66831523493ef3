//! 信息检索工具（模拟）：按查询词生成确定性的结果列表

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{Constraint, FieldSpec, FieldType, InputContract, Tool, ToolInput};

pub struct SearchTool {
    default_engine: String,
    min_query_chars: usize,
}

impl SearchTool {
    pub fn new(default_engine: impl Into<String>, min_query_chars: usize) -> Self {
        Self {
            default_engine: default_engine.into(),
            min_query_chars,
        }
    }
}

impl Default for SearchTool {
    fn default() -> Self {
        Self::new("Google", 3)
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search_information"
    }

    fn description(&self) -> &str {
        "Search for information (simulated). Args: {\"query\": \"...\", \"search_engine\": \"Google\"}"
    }

    fn input_contract(&self) -> InputContract {
        InputContract::new()
            .field(
                FieldSpec::required("query", FieldType::String)
                    .describe("The search query")
                    .with(Constraint::NonEmpty)
                    .with(Constraint::MinLength(self.min_query_chars)),
            )
            .field(
                FieldSpec::optional("search_engine", FieldType::String)
                    .describe("The search engine to use")
                    .default_value(self.default_engine.clone()),
            )
    }

    fn output_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "search_engine": { "type": "string" },
                "results_count": { "type": "integer" },
                "results": { "type": "array" },
                "summary": { "type": "string" }
            }
        })
    }

    async fn execute(&self, input: ToolInput) -> Result<Value, String> {
        let query = input.str("query").unwrap_or_default().trim();
        let engine = input.str("search_engine").unwrap_or(&self.default_engine);
        let slug = query.replace(' ', "_");
        let results = vec![
            serde_json::json!({
                "title": format!("Understanding {query}"),
                "snippet": format!("Detailed explanation of {query}..."),
                "source": format!("https://example.com/{slug}"),
            }),
            serde_json::json!({
                "title": format!("Applications of {query}"),
                "snippet": "Practical uses and examples.",
            }),
        ];
        Ok(serde_json::json!({
            "query": query,
            "search_engine": engine,
            "results_count": results.len(),
            "summary": format!("Found {} promising results for '{}'.", results.len(), query),
            "results": results,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;
    use serde_json::json;

    #[tokio::test]
    async fn test_default_engine_and_short_query() {
        let mut registry = ToolRegistry::new();
        registry.register(SearchTool::new("DuckDuckGo", 3)).unwrap();

        let out = registry
            .invoke("search_information", json!({"query": "FastAPI Pydantic integration"}))
            .await
            .unwrap();
        assert_eq!(out["search_engine"], "DuckDuckGo");
        assert_eq!(out["results_count"], 2);

        let err = registry
            .invoke("search_information", json!({"query": "AI"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }
}
