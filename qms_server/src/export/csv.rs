//! Flat CSV rendering of JSON rows.

use serde_json::Value;

fn cell(value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(nested @ (Value::Array(_) | Value::Object(_))) => nested.to_string(),
        Some(other) => other.to_string(),
    };
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// Render objects as CSV. The header is the first row's keys; every value
/// is quoted and nested values are JSON-encoded. No rows gives `""`.
pub fn to_csv(rows: &[Value]) -> String {
    let Some(headers) = rows.first().and_then(Value::as_object) else {
        return String::new();
    };
    let headers: Vec<&String> = headers.keys().collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(headers.iter().map(|h| h.as_str()).collect::<Vec<_>>().join(","));
    for row in rows {
        let line: Vec<String> = headers.iter().map(|h| cell(row.get(h.as_str()))).collect();
        lines.push(line.join(","));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn quotes_every_value() {
        let rows = vec![
            json!({"id": 1, "title": "Forklift \"near miss\"", "owner": null}),
            json!({"id": 2, "title": "Spill", "owner": "Ops", "extra": true}),
        ];
        assert_eq!(
            to_csv(&rows),
            "id,title,owner\n\"1\",\"Forklift \"\"near miss\"\"\",\"\"\n\"2\",\"Spill\",\"Ops\""
        );
    }

    #[test]
    fn nested_values_are_json() {
        let rows = vec![json!({"controls": ["guarding", "PPE"], "meta": {"k": 1}})];
        assert_eq!(
            to_csv(&rows),
            "controls,meta\n\"[\"\"guarding\"\",\"\"PPE\"\"]\",\"{\"\"k\"\":1}\""
        );
    }

    #[test]
    fn missing_keys_and_empty_input() {
        let rows = vec![json!({"a": "x", "b": "y"}), json!({"a": "z"})];
        assert_eq!(to_csv(&rows), "a,b\n\"x\",\"y\"\n\"z\",\"\"");
        assert_eq!(to_csv(&[]), "");
    }
}
