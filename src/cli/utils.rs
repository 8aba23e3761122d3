use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Pretty-printed JSON on stdout.
pub fn output_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// A confirmation plus any extra fields; text mode prints only the message.
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({ "message": message });
            if let (Some(Value::Object(extra)), Some(object)) = (data, response.as_object_mut()) {
                object.extend(extra);
            }
            output_json(&response)
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
            Ok(())
        }
    }
}

/// Empty results stay valid JSON (`[]`) so scripts can parse them.
pub fn output_empty_collection(output_format: &OutputFormat, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => output_json(&json!([])),
        OutputFormat::Text => {
            println!("{}", message);
            Ok(())
        }
    }
}

/// Text rendering of a stats field: `-` for the empty sentinel, lists joined.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) if s.is_empty() => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
