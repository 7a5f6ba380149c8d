//! Minimal `<%= Path.To.Field %>` interpolation over a JSON value.
//!
//! Missing paths render as an empty string. Evaluation tags (`<% ... %>`) are not supported.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated tag at byte {0}")]
    Unterminated(usize),
    #[error("unsupported tag: {0}")]
    Unsupported(String),
    #[error("invalid expression: {0}")]
    InvalidExpression(String),
}

fn path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_$][\w$]*(\.[\w$]+)*$").unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(data, |cur, key| match cur {
        Value::Object(m) => m.get(key),
        Value::Array(a) => key.parse::<usize>().ok().and_then(|i| a.get(i)),
        _ => None,
    })
}

fn display(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => v.to_string(),
        other => other.to_string(),
    }
}

pub fn render(template: &str, data: &Value) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0usize;
    while let Some(start) = rest.find("<%") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("%>")
            .ok_or(TemplateError::Unterminated(offset + start))?;
        let tag = &after[..end];
        let expr = tag
            .strip_prefix('=')
            .ok_or_else(|| TemplateError::Unsupported(tag.trim().to_string()))?
            .trim();
        if !path_pattern().is_match(expr) {
            return Err(TemplateError::InvalidExpression(expr.to_string()));
        }
        if let Some(v) = lookup(data, expr) {
            out.push_str(&display(v));
        }
        let consumed = start + 2 + end + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_nested_paths() {
        let data = json!({ "Record": { "IDBook": 4, "Title": "Dune", "Tags": ["a", "b"] } });
        assert_eq!(
            render("Book #<%= Record.IDBook %>: <%=Record.Title%> <%= Record.Tags.1 %>", &data).unwrap(),
            "Book #4: Dune b"
        );
    }

    #[test]
    fn missing_paths_render_empty() {
        assert_eq!(render("[<%= Record.Nope %>]", &json!({})).unwrap(), "[]");
    }

    #[test]
    fn rejects_malformed_templates() {
        assert_eq!(render("abc <%= Record", &json!({})), Err(TemplateError::Unterminated(4)));
        assert!(matches!(render("<% if (x) { %>", &json!({})), Err(TemplateError::Unsupported(_))));
        assert!(matches!(render("<%= a + b %>", &json!({})), Err(TemplateError::InvalidExpression(_))));
    }
}
