//! 工具输入契约：字段类型、必填 / 默认值、约束
//!
//! 注册时 check() 检查契约本身是否合法（非法契约是致命的编程错误）；
//! 调用时 validate() 在工具执行之前校验原始参数，返回强制转换后的参数或逐字段诊断。

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::core::FieldDiagnostic;

/// 字段的基本类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    fn json_type(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }

    /// 类型匹配时返回强制转换后的值（Number 统一为 f64，Integer 必须落在 i64 范围内）
    fn coerce(self, value: &Value) -> Result<Value, String> {
        let mismatch = || format!("expected {}", self.json_type());
        match (self, value) {
            (FieldType::String, Value::String(_))
            | (FieldType::Boolean, Value::Bool(_))
            | (FieldType::Array, Value::Array(_))
            | (FieldType::Object, Value::Object(_)) => Ok(value.clone()),
            (FieldType::Integer, Value::Number(n)) => {
                if n.is_i64() {
                    return Ok(value.clone());
                }
                if n.is_u64() {
                    return Err("integer out of range".to_string());
                }
                let f = n.as_f64().ok_or_else(mismatch)?;
                if !f.is_finite() || f.fract() != 0.0 {
                    return Err(mismatch());
                }
                // i64::MAX as f64 向上取整为 2^63，必须严格小于它
                if f < i64::MIN as f64 || f >= i64::MAX as f64 {
                    return Err("integer out of range".to_string());
                }
                Ok(Value::from(f as i64))
            }
            (FieldType::Number, Value::Number(n)) => n.as_f64().map(Value::from).ok_or_else(mismatch),
            _ => Err(mismatch()),
        }
    }
}

/// 字段约束
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// 去掉首尾空白后非空（字符串 / 数组）
    NonEmpty,
    MinLength(usize),
    MaxLength(usize),
    Minimum(f64),
    Maximum(f64),
    OneOf(Vec<String>),
}

impl Constraint {
    fn applies_to(&self, ty: FieldType) -> bool {
        match self {
            Constraint::NonEmpty | Constraint::MinLength(_) | Constraint::MaxLength(_) => {
                matches!(ty, FieldType::String | FieldType::Array)
            }
            Constraint::Minimum(_) | Constraint::Maximum(_) => {
                matches!(ty, FieldType::Integer | FieldType::Number)
            }
            Constraint::OneOf(_) => ty == FieldType::String,
        }
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        let len = match value {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(a) => Some(a.len()),
            _ => None,
        };
        match self {
            Constraint::NonEmpty => {
                let empty = match value {
                    Value::String(s) => s.trim().is_empty(),
                    Value::Array(a) => a.is_empty(),
                    _ => false,
                };
                if empty {
                    return Err("must not be empty".to_string());
                }
            }
            Constraint::MinLength(min) => {
                if len.is_some_and(|l| l < *min) {
                    return Err(format!("must have at least {min} characters"));
                }
            }
            Constraint::MaxLength(max) => {
                if len.is_some_and(|l| l > *max) {
                    return Err(format!("must have at most {max} characters"));
                }
            }
            Constraint::Minimum(min) => {
                if value.as_f64().is_some_and(|v| v < *min) {
                    return Err(format!("must be >= {min}"));
                }
            }
            Constraint::Maximum(max) => {
                if value.as_f64().is_some_and(|v| v > *max) {
                    return Err(format!("must be <= {max}"));
                }
            }
            Constraint::OneOf(choices) => {
                if let Some(s) = value.as_str() {
                    if !choices.iter().any(|c| c == s) {
                        return Err(format!("must be one of: {}", choices.join(", ")));
                    }
                }
            }
        }
        Ok(())
    }

    fn write_schema(&self, schema: &mut Map<String, Value>) {
        match self {
            Constraint::NonEmpty => {
                schema.insert("minLength".into(), Value::from(1));
            }
            Constraint::MinLength(n) => {
                schema.insert("minLength".into(), Value::from(*n));
            }
            Constraint::MaxLength(n) => {
                schema.insert("maxLength".into(), Value::from(*n));
            }
            Constraint::Minimum(n) => {
                schema.insert("minimum".into(), Value::from(*n));
            }
            Constraint::Maximum(n) => {
                schema.insert("maximum".into(), Value::from(*n));
            }
            Constraint::OneOf(choices) => {
                schema.insert("enum".into(), Value::from(choices.clone()));
            }
        }
    }
}

/// 单个字段定义
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub ty: FieldType,
    pub required: bool,
    pub default: Option<Value>,
    pub description: String,
    pub constraints: Vec<Constraint>,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            default: None,
            description: String::new(),
            constraints: Vec::new(),
        }
    }

    pub fn optional(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty)
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// 缺省值（仅对可选字段有意义）
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    fn validate_value(&self, value: &Value) -> Result<Value, String> {
        let coerced = self.ty.coerce(value)?;
        for constraint in &self.constraints {
            constraint.check(&coerced)?;
        }
        Ok(coerced)
    }
}

/// 工具输入契约：有序字段列表
#[derive(Debug, Clone, Default)]
pub struct InputContract {
    fields: Vec<FieldSpec>,
}

impl InputContract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// 契约自身的合法性检查，在注册时调用
    pub fn check(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err("field name must not be empty".to_string());
            }
            if !seen.insert(field.name.as_str()) {
                return Err(format!("duplicate field '{}'", field.name));
            }
            if let Some(c) = field.constraints.iter().find(|c| !c.applies_to(field.ty)) {
                return Err(format!(
                    "constraint {:?} does not apply to {} field '{}'",
                    c,
                    field.ty.json_type(),
                    field.name
                ));
            }
            if let Some(default) = &field.default {
                if field.required {
                    return Err(format!("required field '{}' cannot have a default", field.name));
                }
                field
                    .validate_value(default)
                    .map_err(|e| format!("default for '{}' is invalid: {}", field.name, e))?;
            }
        }
        Ok(())
    }

    /// 校验原始参数：null 视为空对象，未知字段被丢弃
    pub fn validate(&self, raw: &Value) -> Result<Map<String, Value>, Vec<FieldDiagnostic>> {
        let empty = Map::new();
        let obj = match raw {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(vec![FieldDiagnostic::new(
                    "$",
                    format!("arguments must be an object, got {}", type_name(other)),
                )])
            }
        };

        let mut validated = Map::new();
        let mut diagnostics = Vec::new();
        for field in &self.fields {
            match obj.get(&field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        diagnostics.push(FieldDiagnostic::new(&field.name, "field required"));
                    } else if let Some(default) = &field.default {
                        validated.insert(field.name.clone(), default.clone());
                    }
                }
                Some(value) => match field.validate_value(value) {
                    Ok(v) => {
                        validated.insert(field.name.clone(), v);
                    }
                    Err(message) => diagnostics.push(FieldDiagnostic::new(&field.name, message)),
                },
            }
        }

        if diagnostics.is_empty() {
            Ok(validated)
        } else {
            Err(diagnostics)
        }
    }

    /// 以 JSON Schema 描述参数，供工具清单展示
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let mut schema = Map::new();
            schema.insert("type".into(), Value::from(field.ty.json_type()));
            if !field.description.is_empty() {
                schema.insert("description".into(), Value::from(field.description.clone()));
            }
            if let Some(default) = &field.default {
                schema.insert("default".into(), default.clone());
            }
            for c in &field.constraints {
                c.write_schema(&mut schema);
            }
            properties.insert(field.name.clone(), Value::Object(schema));
            if field.required {
                required.push(Value::from(field.name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 已通过校验的参数
#[derive(Debug, Clone, Default)]
pub struct ToolInput {
    args: Map<String, Value>,
}

impl ToolInput {
    pub fn new(args: Map<String, Value>) -> Self {
        Self { args }
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }
}
