//! 算术计算工具：只接受数字、+ - * / ( ) 与空白，递归下降求值（不做任何动态执行）

use std::iter::Peekable;
use std::str::Chars;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{Constraint, FieldSpec, FieldType, InputContract, Tool, ToolInput};

const ALLOWED: &str = "0123456789.+-*/() ";
/// 表达式最大字符数
pub const MAX_EXPRESSION_CHARS: usize = 1024;
/// 括号与一元符号的最大嵌套层数
const MAX_DEPTH: usize = 64;

pub struct CalculationTool;

#[async_trait]
impl Tool for CalculationTool {
    fn name(&self) -> &str {
        "perform_calculation"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression with + - * / and parentheses. Args: {\"expression\": \"2 * (3 + 5)\"}"
    }

    fn input_contract(&self) -> InputContract {
        InputContract::new().field(
            FieldSpec::required("expression", FieldType::String)
                .describe("The arithmetic expression to evaluate, e.g. '2 * (3 + 5)'")
                .with(Constraint::NonEmpty)
                .with(Constraint::MaxLength(MAX_EXPRESSION_CHARS)),
        )
    }

    fn output_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expression": { "type": "string" },
                "result": { "type": "number" }
            },
            "required": ["expression", "result"]
        })
    }

    async fn execute(&self, input: ToolInput) -> Result<Value, String> {
        let expression = input.str("expression").unwrap_or_default();
        let result =
            evaluate(expression).map_err(|e| format!("Calculation error: {e}"))?;
        Ok(serde_json::json!({
            "expression": expression,
            "result": result,
        }))
    }
}

/// 求值；错误信息不带前缀
pub fn evaluate(expression: &str) -> Result<f64, String> {
    if expression.trim().is_empty() {
        return Err("expression cannot be empty".to_string());
    }
    if let Some(c) = expression.chars().find(|c| !ALLOWED.contains(*c)) {
        return Err(format!("invalid character '{c}'"));
    }

    let mut parser = Parser {
        chars: expression.chars().peekable(),
        depth: 0,
    };
    let value = parser.expr()?;
    parser.skip_ws();
    if let Some(c) = parser.chars.peek() {
        return Err(format!("unexpected '{c}'"));
    }
    if !value.is_finite() {
        return Err("result is not a finite number".to_string());
    }
    Ok(value)
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    depth: usize,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn next_op(&mut self, ops: &[char]) -> Option<char> {
        self.skip_ws();
        self.chars.next_if(|c| ops.contains(c))
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut acc = self.term()?;
        while let Some(op) = self.next_op(&['+', '-']) {
            let rhs = self.term()?;
            if op == '+' {
                acc += rhs;
            } else {
                acc -= rhs;
            }
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut acc = self.factor()?;
        while let Some(op) = self.next_op(&['*', '/']) {
            let rhs = self.factor()?;
            if op == '*' {
                acc *= rhs;
            } else {
                if rhs == 0.0 {
                    return Err("division by zero".to_string());
                }
                acc /= rhs;
            }
        }
        Ok(acc)
    }

    fn factor(&mut self) -> Result<f64, String> {
        if self.depth >= MAX_DEPTH {
            return Err("expression nested too deeply".to_string());
        }
        self.depth += 1;
        let value = self.factor_inner();
        self.depth -= 1;
        value
    }

    fn factor_inner(&mut self) -> Result<f64, String> {
        self.skip_ws();
        match self.chars.peek().copied() {
            Some('-') => {
                self.chars.next();
                Ok(-self.factor()?)
            }
            Some('+') => {
                self.chars.next();
                self.factor()
            }
            Some('(') => {
                self.chars.next();
                let value = self.expr()?;
                self.skip_ws();
                match self.chars.next() {
                    Some(')') => Ok(value),
                    _ => Err("missing closing parenthesis".to_string()),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(format!("unexpected '{c}'")),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn number(&mut self) -> Result<f64, String> {
        let mut literal = String::new();
        while let Some(c) = self.chars.next_if(|c| c.is_ascii_digit() || *c == '.') {
            literal.push(c);
        }
        literal
            .parse::<f64>()
            .map_err(|_| format!("invalid number '{literal}'"))
    }
}
