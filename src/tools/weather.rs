//! 天气工具（模拟）：由地点名的哈希确定性地生成天气，同一输入总是同一输出

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{Constraint, FieldSpec, FieldType, InputContract, Tool, ToolInput};

const CONDITIONS: &[&str] = &["Sunny", "Cloudy", "Rainy", "Snowy", "Windy"];
/// 视为查无此地的地点名
const UNKNOWN_LOCATIONS: &[&str] = &["unknown", "unknown_city"];

pub struct WeatherTool;

/// FNV-1a，跨进程稳定
fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the (simulated) weather for a location. Args: {\"location\": \"San Francisco, CA\"}"
    }

    fn input_contract(&self) -> InputContract {
        InputContract::new().field(
            FieldSpec::required("location", FieldType::String)
                .describe("The city and state, e.g. San Francisco, CA")
                .with(Constraint::NonEmpty),
        )
    }

    fn output_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "location": { "type": "string" },
                "temperature_celsius": { "type": "integer" },
                "condition": { "type": "string" },
                "humidity_percent": { "type": "integer" },
                "forecast": { "type": "string" }
            }
        })
    }

    async fn execute(&self, input: ToolInput) -> Result<Value, String> {
        let location = input.str("location").unwrap_or_default().trim();
        let key = location.to_lowercase();
        if UNKNOWN_LOCATIONS.contains(&key.as_str()) {
            return Err(format!("Could not find weather for an unknown location: {location}"));
        }

        let h = fnv1a(&key);
        let condition = CONDITIONS[(h % CONDITIONS.len() as u64) as usize];
        let tomorrow = CONDITIONS[((h >> 8) % CONDITIONS.len() as u64) as usize];
        let temperature = ((h >> 16) % 46) as i64 - 10;
        let humidity = 30 + ((h >> 24) % 61) as i64;

        Ok(serde_json::json!({
            "location": location,
            "temperature_celsius": temperature,
            "condition": condition,
            "humidity_percent": humidity,
            "forecast": format!("It will be {tomorrow} tomorrow."),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(location: &str) -> ToolInput {
        let mut args = serde_json::Map::new();
        args.insert("location".into(), Value::from(location));
        ToolInput::new(args)
    }

    #[tokio::test]
    async fn test_weather_is_deterministic() {
        let a = WeatherTool.execute(input("Paris")).await.unwrap();
        let b = WeatherTool.execute(input("Paris")).await.unwrap();
        assert_eq!(a, b);
        let t = a["temperature_celsius"].as_i64().unwrap();
        assert!((-10..=35).contains(&t));
        let h = a["humidity_percent"].as_i64().unwrap();
        assert!((30..=90).contains(&h));
    }

    #[tokio::test]
    async fn test_unknown_city_is_error() {
        let err = WeatherTool.execute(input("unknown_city")).await.unwrap_err();
        assert!(err.contains("unknown location"));
    }
}
