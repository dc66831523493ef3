//! 知识库查询工具：内置问答表，问题大小写与首尾空白不敏感

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{Constraint, FieldSpec, FieldType, InputContract, Tool, ToolInput};

const FALLBACK_ANSWER: &str = "I don't have information on that specific question.";

pub struct KnowledgeBaseTool {
    entries: HashMap<String, String>,
}

impl KnowledgeBaseTool {
    pub fn new() -> Self {
        Self::with_entries([
            ("What is the capital of France?", "The capital of France is Paris."),
            (
                "What is Python?",
                "Python is a high-level, interpreted programming language.",
            ),
            (
                "What is Rust?",
                "Rust is a systems programming language focused on safety and performance.",
            ),
        ])
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(q, a)| (normalize(q), a.to_string()))
                .collect(),
        }
    }

    pub fn lookup(&self, question: &str) -> &str {
        self.entries
            .get(&normalize(question))
            .map(String::as_str)
            .unwrap_or(FALLBACK_ANSWER)
    }
}

impl Default for KnowledgeBaseTool {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(question: &str) -> String {
    question.trim().to_lowercase()
}

#[async_trait]
impl Tool for KnowledgeBaseTool {
    fn name(&self) -> &str {
        "query_knowledge_base"
    }

    fn description(&self) -> &str {
        "Answer a question from the built-in knowledge base. Args: {\"question\": \"...\"}"
    }

    fn input_contract(&self) -> InputContract {
        InputContract::new().field(
            FieldSpec::required("question", FieldType::String)
                .describe("The question to look up")
                .with(Constraint::NonEmpty),
        )
    }

    fn output_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "question": { "type": "string" },
                "answer": { "type": "string" }
            },
            "required": ["question", "answer"]
        })
    }

    async fn execute(&self, input: ToolInput) -> Result<Value, String> {
        let question = input.str("question").unwrap_or_default();
        Ok(serde_json::json!({
            "question": question,
            "answer": self.lookup(question),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let kb = KnowledgeBaseTool::new();
        assert_eq!(
            kb.lookup("  what is the CAPITAL of france? "),
            "The capital of France is Paris."
        );
        assert_eq!(kb.lookup("Who won?"), FALLBACK_ANSWER);
    }
}
