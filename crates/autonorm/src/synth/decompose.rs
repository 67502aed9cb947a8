//! 1NF cell decomposition: exploding repeating groups and splitting
//! structured fields into their components.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::core::Value;
use crate::profile::StructuredField;

/// Split a multivalued cell into its non-empty atomic tokens.
pub fn explode_cell(value: &Value, delimiter: char) -> Vec<String> {
    let text = match value {
        Value::Text(s) => s.as_str(),
        Value::Null => return Vec::new(),
        other => {
            let owned = other.key();
            return if owned.is_empty() { Vec::new() } else { vec![owned] };
        }
    };
    text.split(delimiter)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decompose a structured cell into one value per component.
///
/// Components the cell does not cover come back as NULL; a cell that resists
/// decomposition lands whole in the first component so no data is dropped.
pub fn decompose_cell(value: &Value, field: &StructuredField) -> Vec<Value> {
    let components = field.components();
    let text = match value.as_text() {
        Some(s) => s,
        None => return vec![Value::Null; components.len()],
    };

    match field {
        StructuredField::FullName(_) => decompose_name(text, components.len()),
        StructuredField::JsonLike(_) => decompose_json(text, components),
        StructuredField::Address(_) => decompose_address(text, components),
    }
}

fn decompose_name(text: &str, component_count: usize) -> Vec<Value> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return vec![Value::Null; component_count];
    }
    if tokens.len() == 1 {
        let mut out = vec![Value::Text(tokens[0].to_string())];
        out.resize(component_count, Value::Null);
        return out;
    }

    let first = Value::Text(tokens[0].to_string());
    let last = Value::Text(tokens[tokens.len() - 1].to_string());
    if component_count == 3 {
        let middle = if tokens.len() > 2 {
            Value::Text(tokens[1..tokens.len() - 1].join(" "))
        } else {
            Value::Null
        };
        vec![first, middle, last]
    } else {
        vec![first, last]
    }
}

fn decompose_json(text: &str, components: &[String]) -> Vec<Value> {
    let object = match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => {
            let mut out = vec![Value::Text(text.to_string())];
            out.resize(components.len(), Value::Null);
            return out;
        }
    };
    components
        .iter()
        .map(|key| match object.get(key) {
            None | Some(serde_json::Value::Null) => Value::Null,
            Some(serde_json::Value::Bool(b)) => Value::Bool(*b),
            Some(serde_json::Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(d) = n.as_f64().and_then(Decimal::from_f64) {
                    Value::Decimal(d)
                } else {
                    Value::Text(n.to_string())
                }
            }
            Some(serde_json::Value::String(s)) => Value::Text(s.clone()),
            Some(other) => Value::Text(other.to_string()),
        })
        .collect()
}

fn decompose_address(text: &str, components: &[String]) -> Vec<Value> {
    let mut parts: Vec<String> = text.split(',').map(|p| p.trim().to_string()).collect();

    // "IL 62704" style trailing part covers both state and zip_code.
    let wants_state = components.iter().any(|c| c == "state");
    let wants_zip = components.iter().any(|c| c == "zip_code");
    if wants_state && wants_zip && parts.len() == components.len() - 1 {
        if let Some(last) = parts.last().cloned() {
            let tokens: Vec<&str> = last.split_whitespace().collect();
            if tokens.len() == 2
                && tokens[0].len() == 2
                && tokens[0].chars().all(|c| c.is_ascii_uppercase())
                && tokens[1].chars().all(|c| c.is_ascii_digit() || c == '-')
            {
                parts.pop();
                parts.push(tokens[0].to_string());
                parts.push(tokens[1].to_string());
            }
        }
    }

    components
        .iter()
        .enumerate()
        .map(|(i, _)| match parts.get(i) {
            Some(p) if !p.is_empty() => Value::Text(p.clone()),
            _ => Value::Null,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explode_cell() {
        let v = Value::Text("red, green ,blue,".into());
        assert_eq!(explode_cell(&v, ','), vec!["red", "green", "blue"]);
        assert!(explode_cell(&Value::Null, ',').is_empty());
        assert_eq!(explode_cell(&Value::Text("solo".into()), ','), vec!["solo"]);
    }

    #[test]
    fn test_decompose_full_name() {
        let field = StructuredField::FullName(vec!["first_name".into(), "last_name".into()]);
        assert_eq!(
            decompose_cell(&Value::Text("Ada Lovelace".into()), &field),
            vec![Value::Text("Ada".into()), Value::Text("Lovelace".into())]
        );

        let with_middle = StructuredField::FullName(vec![
            "first_name".into(),
            "middle_name".into(),
            "last_name".into(),
        ]);
        assert_eq!(
            decompose_cell(&Value::Text("Ada King Lovelace".into()), &with_middle),
            vec![
                Value::Text("Ada".into()),
                Value::Text("King".into()),
                Value::Text("Lovelace".into())
            ]
        );
    }

    #[test]
    fn test_decompose_json() {
        let field = StructuredField::JsonLike(vec!["kind".into(), "x".into()]);
        assert_eq!(
            decompose_cell(&Value::Text(r#"{"kind":"click","x":3}"#.into()), &field),
            vec![Value::Text("click".into()), Value::Int(3)]
        );
        // Unparsable payloads keep their full text in the first component.
        assert_eq!(
            decompose_cell(&Value::Text("not json".into()), &field),
            vec![Value::Text("not json".into()), Value::Null]
        );
    }

    #[test]
    fn test_decompose_address_with_state_zip() {
        let field = StructuredField::Address(vec![
            "street".into(),
            "city".into(),
            "state".into(),
            "zip_code".into(),
        ]);
        assert_eq!(
            decompose_cell(
                &Value::Text("12 Main Street, Springfield, IL 62704".into()),
                &field
            ),
            vec![
                Value::Text("12 Main Street".into()),
                Value::Text("Springfield".into()),
                Value::Text("IL".into()),
                Value::Text("62704".into()),
            ]
        );
    }

    #[test]
    fn test_decompose_null() {
        let field = StructuredField::Address(vec!["street".into(), "city".into()]);
        assert_eq!(
            decompose_cell(&Value::Null, &field),
            vec![Value::Null, Value::Null]
        );
    }
}
