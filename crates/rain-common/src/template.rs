//! `${path}` interpolation of URL templates against catalog JSON.
//!
//! Paths are dotted keys with optional bracket indices, e.g.
//! `radar.past[-1].path`. Negative indices count from the end of an array.
//! Anything outside `${...}` (including the host's `{z}/{x}/{y}`
//! placeholders) is copied through untouched.

use serde_json::Value;

use crate::error::{RainError, RainResult};

#[derive(Debug, Clone, PartialEq)]
enum Segment<'a> {
    Key(&'a str),
    Index(i64),
}

fn parse_path(path: &str) -> Option<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut rest = path;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('[') {
            let end = after.find(']')?;
            let index = after[..end].trim().parse::<i64>().ok()?;
            segments.push(Segment::Index(index));
            rest = &after[end + 1..];
        } else {
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            if end > 0 {
                segments.push(Segment::Key(&rest[..end]));
            }
            rest = &rest[end..];
        }
        rest = rest.strip_prefix('.').unwrap_or(rest);
    }

    Some(segments)
}

fn array_index(len: usize, index: i64) -> Option<usize> {
    let resolved = if index < 0 { len as i64 + index } else { index };
    (0..len as i64).contains(&resolved).then_some(resolved as usize)
}

/// Resolve a dotted/bracket path inside a JSON value.
pub fn resolve_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    let segments = parse_path(path)?;
    let mut current = value;

    for segment in segments {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key)?,
            (Segment::Key(key), Value::Array(items)) => {
                let index = key.parse::<i64>().ok()?;
                items.get(array_index(items.len(), index)?)?
            }
            (Segment::Index(index), Value::Array(items)) => {
                items.get(array_index(items.len(), index)?)?
            }
            _ => return None,
        };
    }

    Some(current)
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Replace every `${path}` in `text` with the value it resolves to in `catalog`.
pub fn format_template(text: &str, catalog: &Value) -> RainResult<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated expression, keep it verbatim
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        let path = &after[..end];
        let value = resolve_path(catalog, path)
            .filter(|v| !v.is_null())
            .ok_or_else(|| RainError::TemplateField(path.to_string()))?;
        out.push_str(&value_to_text(value));
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> Value {
        json!({
            "host": "https://tiles.example.com",
            "radar": {
                "past": [
                    {"time": 1700000000, "path": "/v2/radar/1700000000"},
                    {"time": 1700000600, "path": "/v2/radar/1700000600"}
                ]
            }
        })
    }

    #[test]
    fn test_resolve_nested_and_negative_index() {
        let c = catalog();
        assert_eq!(resolve_path(&c, "host").unwrap(), "https://tiles.example.com");
        assert_eq!(resolve_path(&c, "radar.past[0].time").unwrap(), 1700000000);
        assert_eq!(resolve_path(&c, "radar.past[-1].time").unwrap(), 1700000600);
        assert_eq!(resolve_path(&c, "radar.past.1.time").unwrap(), 1700000600);
        assert!(resolve_path(&c, "radar.past[2]").is_none());
        assert!(resolve_path(&c, "radar.future").is_none());
        assert!(resolve_path(&c, "host[0]").is_none());
    }

    #[test]
    fn test_resolve_top_level_array() {
        let c = json!([{"basetime": "20240101000000"}]);
        assert_eq!(resolve_path(&c, "[0].basetime").unwrap(), "20240101000000");
    }

    #[test]
    fn test_format_keeps_host_placeholders() {
        let url = format_template(
            "${host}${radar.past[-1].path}/256/{z}/{x}/{y}/0/0_1.png",
            &catalog(),
        )
        .unwrap();
        assert_eq!(
            url,
            "https://tiles.example.com/v2/radar/1700000600/256/{z}/{x}/{y}/0/0_1.png"
        );
    }

    #[test]
    fn test_format_numbers_and_missing_fields() {
        assert_eq!(
            format_template("${radar.past[-1].time}", &catalog()).unwrap(),
            "1700000600"
        );
        let err = format_template("${radar.nowcast[0].path}", &catalog()).unwrap_err();
        assert!(matches!(err, RainError::TemplateField(p) if p == "radar.nowcast[0].path"));
    }
}
