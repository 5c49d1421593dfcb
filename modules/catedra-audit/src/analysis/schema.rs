use schemars::{schema_for, JsonSchema};

/// JSON schema for a tool's `input_schema`: no meta keys, no extra properties.
pub(crate) fn tool_input_schema<T: JsonSchema>() -> serde_json::Value {
    let schema = schema_for!(T);
    let mut value = serde_json::to_value(schema).unwrap_or_default();

    if let serde_json::Value::Object(map) = &mut value {
        map.remove("$schema");
        map.remove("title");
        map.remove("definitions");
        map.insert(
            "additionalProperties".to_string(),
            serde_json::Value::Bool(false),
        );
    }

    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisResult;

    #[test]
    fn analysis_schema_lists_every_field_as_required() {
        let schema = tool_input_schema::<AnalysisResult>();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);
        assert!(schema.get("$schema").is_none());

        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        for field in [
            "department_name",
            "recommendation_summary",
            "sentiment",
            "confidence",
        ] {
            assert!(required.contains(&field), "missing {field}");
        }
    }
}
