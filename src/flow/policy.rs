//! 决策策略：(goal, last_result) -> 下一个工具调用 | 停止
//!
//! 策略必须是纯函数：同样的输入得到同样的决策，循环的终止分析依赖这一点。
//! RulePolicy 是基于规则表的实现：按顺序检查规则，第一条命中且尚未满足的规则产出 ToolCall。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::tools::ToolCall;

/// 可插拔的决策策略
pub trait DecisionPolicy: Send + Sync {
    /// 返回 None 表示停止
    fn decide(&self, goal: &str, last_result: Option<&Value>) -> Option<ToolCall>;
}

impl<F> DecisionPolicy for F
where
    F: Fn(&str, Option<&Value>) -> Option<ToolCall> + Send + Sync,
{
    fn decide(&self, goal: &str, last_result: Option<&Value>) -> Option<ToolCall> {
        self(goal, last_result)
    }
}

static EXPRESSION_RE: OnceLock<Regex> = OnceLock::new();
static LOCATION_RE: OnceLock<Regex> = OnceLock::new();
static QUERY_RE: OnceLock<Regex> = OnceLock::new();

fn expression_re() -> &'static Regex {
    EXPRESSION_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:calculate|compute)\s+(.+?)\s*\??\s*$").expect("valid expression pattern")
    })
}

fn location_re() -> &'static Regex {
    LOCATION_RE.get_or_init(|| Regex::new(r"(?i)\b(?:in|for)\s+([^?]+)").expect("valid location pattern"))
}

fn query_re() -> &'static Regex {
    QUERY_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:look up|find information on|search for)\s+(.+?)\s*\??\s*$")
            .expect("valid query pattern")
    })
}

type ArgsBuilder = Box<dyn Fn(&str) -> Option<Value> + Send + Sync>;
type Satisfied = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// 单条规则：goal 含任一关键词，且上一步结果尚未满足该规则时，调用 tool
pub struct Rule {
    tool: String,
    keywords: Vec<String>,
    args: ArgsBuilder,
    satisfied: Satisfied,
    first_step_only: bool,
}

impl Rule {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            keywords: Vec::new(),
            args: Box::new(|_| Some(json!({}))),
            satisfied: Box::new(|_| false),
            first_step_only: false,
        }
    }

    /// 关键词匹配不区分大小写
    pub fn keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| k.to_lowercase()).collect();
        self
    }

    /// 由 goal 构造参数；返回 None 时规则不触发
    pub fn args<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<Value> + Send + Sync + 'static,
    {
        self.args = Box::new(f);
        self
    }

    /// 上一步结果满足该判定时规则视为已完成
    pub fn satisfied_when<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.satisfied = Box::new(f);
        self
    }

    /// 只在第一步（尚无结果时）触发
    pub fn first_step_only(mut self) -> Self {
        self.first_step_only = true;
        self
    }

    fn matches(&self, goal_lower: &str) -> bool {
        self.keywords.iter().any(|k| goal_lower.contains(k.as_str()))
    }

    fn fire(&self, goal: &str, goal_lower: &str, last_result: Option<&Value>) -> Option<ToolCall> {
        if !self.matches(goal_lower) {
            return None;
        }
        match last_result {
            Some(_) if self.first_step_only => return None,
            Some(last) if (self.satisfied)(last) => return None,
            _ => {}
        }
        let args = (self.args)(goal)?;
        Some(ToolCall::new(self.tool.clone(), args))
    }
}

/// 规则表策略
#[derive(Default)]
pub struct RulePolicy {
    rules: Vec<Rule>,
}

impl RulePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 内置规则：时间、法国首都、Python 定义、计算、天气、检索
    pub fn standard() -> Self {
        Self::new()
            .rule(
                Rule::new("get_current_time")
                    .keywords(&["time"])
                    .satisfied_when(|last| last.get("current_time").is_some()),
            )
            .rule(
                Rule::new("query_knowledge_base")
                    .keywords(&["capital of france"])
                    .args(|_| Some(json!({ "question": "What is the capital of France?" })))
                    .satisfied_when(|last| answer_contains(last, "Paris")),
            )
            .rule(
                Rule::new("query_knowledge_base")
                    .keywords(&["python definition", "define python", "what is python"])
                    .args(|_| Some(json!({ "question": "What is Python?" })))
                    .satisfied_when(|last| answer_contains(last, "programming language")),
            )
            .rule(
                Rule::new("perform_calculation")
                    .keywords(&["calculate", "compute"])
                    .args(|goal| {
                        let expr = capture(expression_re(), goal)?;
                        Some(json!({ "expression": expr }))
                    })
                    .satisfied_when(|last| last.get("result").is_some()),
            )
            .rule(
                Rule::new("get_weather")
                    .keywords(&["weather", "forecast"])
                    .args(|goal| {
                        let loc = capture(location_re(), goal).unwrap_or_else(|| "unknown".to_string());
                        Some(json!({ "location": loc }))
                    })
                    .satisfied_when(|last| last.get("condition").is_some()),
            )
            .rule(
                Rule::new("search_information")
                    .keywords(&["look up", "find information", "search for"])
                    .args(|goal| {
                        let q = capture(query_re(), goal)?;
                        Some(json!({ "query": q }))
                    })
                    .satisfied_when(|last| last.get("results_count").is_some()),
            )
    }
}

fn answer_contains(last: &Value, needle: &str) -> bool {
    last.get("answer")
        .and_then(Value::as_str)
        .is_some_and(|a| a.contains(needle))
}

fn capture(re: &Regex, goal: &str) -> Option<String> {
    let text = re.captures(goal)?.get(1)?.as_str().trim().to_string();
    (!text.is_empty()).then_some(text)
}

impl DecisionPolicy for RulePolicy {
    fn decide(&self, goal: &str, last_result: Option<&Value>) -> Option<ToolCall> {
        let goal_lower = goal.to_lowercase();
        let decision = self
            .rules
            .iter()
            .find_map(|rule| rule.fire(goal, &goal_lower, last_result));
        tracing::debug!(goal = %goal, decision = ?decision.as_ref().map(|c| c.tool.as_str()), "decide");
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_goal_selects_then_stops() {
        let policy = RulePolicy::standard();
        let call = policy.decide("What is the time?", None).unwrap();
        assert_eq!(call, ToolCall::new("get_current_time", json!({})));

        let last = json!({ "current_time": "2026-10-19T00:00:00Z" });
        assert!(policy.decide("What is the time?", Some(&last)).is_none());
    }

    #[test]
    fn test_extracts_arguments() {
        let policy = RulePolicy::standard();

        let call = policy.decide("calculate 25 * (4 + 1)", None).unwrap();
        assert_eq!(call.args, json!({ "expression": "25 * (4 + 1)" }));

        let call = policy.decide("What's the weather like in Paris?", None).unwrap();
        assert_eq!(call.args, json!({ "location": "Paris" }));

        let call = policy.decide("weather", None).unwrap();
        assert_eq!(call.args, json!({ "location": "unknown" }));

        let call = policy.decide("search for pizza recipes", None).unwrap();
        assert_eq!(call.tool, "search_information");
        assert_eq!(call.args, json!({ "query": "pizza recipes" }));
    }

    #[test]
    fn test_argument_patterns_compile() {
        assert_eq!(capture(expression_re(), "compute 1 + 1?").as_deref(), Some("1 + 1"));
        assert_eq!(capture(location_re(), "forecast for Tokyo").as_deref(), Some("Tokyo"));
        assert_eq!(capture(query_re(), "look up tokio runtime").as_deref(), Some("tokio runtime"));
    }

    #[test]
    fn test_missing_expression_stops() {
        let policy = RulePolicy::standard();
        assert!(policy.decide("calculate", None).is_none());
        assert!(policy.decide("Tell me a joke.", None).is_none());
    }

    #[test]
    fn test_decisions_are_deterministic() {
        let policy = RulePolicy::standard();
        let last = json!({ "answer": "I don't know" });
        let a = policy.decide("Tell me about the capital of France", Some(&last));
        let b = policy.decide("Tell me about the capital of France", Some(&last));
        assert_eq!(a, b);
        assert_eq!(a.unwrap().tool, "query_knowledge_base");
    }

    #[test]
    fn test_first_step_only() {
        let policy = RulePolicy::new().rule(Rule::new("probe").keywords(&["probe"]).first_step_only());
        assert!(policy.decide("probe it", None).is_some());
        assert!(policy.decide("probe it", Some(&json!({}))).is_none());
        assert_eq!(policy.len(), 1);
    }

    #[test]
    fn test_closure_policy() {
        let always = |_: &str, _: Option<&Value>| Some(ToolCall::new("get_current_time", json!({})));
        assert!(always.decide("anything", None).is_some());
    }
}
