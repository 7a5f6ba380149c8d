//! Record validation against an entity's per-column rules.

use crate::config::ValidationRule;
use crate::error::AppError;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub struct RecordValidator;

impl RecordValidator {
    /// Every rule violation in `record`, sorted by column. Empty means valid.
    pub fn errors(record: &Map<String, Value>, rules: &HashMap<String, ValidationRule>) -> Vec<String> {
        let mut columns: Vec<&String> = rules.keys().collect();
        columns.sort();
        let mut errors = Vec::new();
        for col in columns {
            let rule = &rules[col];
            match record.get(col.as_str()) {
                None | Some(Value::Null) if rule.required == Some(true) => {
                    errors.push(format!("{} is required", col));
                }
                Some(v) => {
                    if let Err(e) = check_field(col, v, rule) {
                        errors.push(e);
                    }
                }
                None => {}
            }
        }
        errors
    }

    /// Reject the record with the first violation.
    pub fn validate(record: &Map<String, Value>, rules: &HashMap<String, ValidationRule>) -> Result<(), AppError> {
        match Self::errors(record, rules).into_iter().next() {
            Some(e) => Err(AppError::Validation(e)),
            None => Ok(()),
        }
    }

    /// Check only the columns present in `record`; missing required columns are not an error.
    pub fn validate_partial(record: &Map<String, Value>, rules: &HashMap<String, ValidationRule>) -> Result<(), AppError> {
        for (col, v) in record {
            if let Some(rule) = rules.get(col) {
                check_field(col, v, rule).map_err(AppError::Validation)?;
            }
        }
        Ok(())
    }
}

fn check_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), String> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        check_format(col, v, format)?;
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(format!("{} must be at most {} characters", col, max));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(format!("{} must be at least {} characters", col, min));
            }
        }
        if let Some(pattern) = &rule.pattern {
            let re = Regex::new(pattern).map_err(|_| format!("invalid pattern for {}", col))?;
            if !re.is_match(s) {
                return Err(format!("{} does not match required pattern", col));
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| loose_eq(v, a)) {
            return Err(format!("{} must be one of the allowed values", col));
        }
    }
    if let Some(n) = v.as_f64() {
        if rule.minimum.is_some_and(|min| n < min) {
            return Err(format!("{} must be at least {}", col, rule.minimum.unwrap_or_default()));
        }
        if rule.maximum.is_some_and(|max| n > max) {
            return Err(format!("{} must be at most {}", col, rule.maximum.unwrap_or_default()));
        }
    }
    Ok(())
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn check_format(col: &str, v: &Value, format: &str) -> Result<(), String> {
    let Some(s) = v.as_str() else {
        return Ok(());
    };
    match format.to_lowercase().as_str() {
        "email" if !s.contains('@') || s.len() < 3 => Err(format!("{} must be a valid email", col)),
        "uuid" if uuid::Uuid::parse_str(s).is_err() => Err(format!("{} must be a valid UUID", col)),
        "date-time" if chrono::DateTime::parse_from_rfc3339(s).is_err() => {
            Err(format!("{} must be an RFC 3339 date-time", col))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules() -> HashMap<String, ValidationRule> {
        serde_json::from_value(json!({
            "Title": { "required": true, "max_length": 5 },
            "PublicationYear": { "minimum": 1450, "maximum": 2100 },
            "Type": { "allowed": ["Novel", "Poetry"] }
        }))
        .unwrap()
    }

    fn record(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn collects_every_violation() {
        let errors = RecordValidator::errors(&record(json!({ "PublicationYear": 1200, "Type": "Comic" })), &rules());
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0], "PublicationYear must be at least 1450");
        assert_eq!(errors[1], "Title is required");
    }

    #[test]
    fn valid_record_passes() {
        let ok = record(json!({ "Title": "Dune", "PublicationYear": 1965, "Type": "Novel" }));
        assert!(RecordValidator::validate(&ok, &rules()).is_ok());
    }

    #[test]
    fn partial_ignores_missing_required() {
        let patch = record(json!({ "PublicationYear": 2000 }));
        assert!(RecordValidator::validate_partial(&patch, &rules()).is_ok());
        let bad = record(json!({ "Title": "Too long title" }));
        assert!(RecordValidator::validate_partial(&bad, &rules()).is_err());
    }
}
