//! Filter string parser: `~`-separated groups of four tokens applied to a [`Query`].
//!
//! `FBV~Title~LK~%25Gatsby%25~FSF~Title~DESC~0` filters on title and sorts descending.
//!
//! | instruction | tokens                  |
//! |-------------|-------------------------|
//! | FBV, FBVOR  | field, operator, value  |
//! | FBL, FBLOR  | field, IN or NI, a,b,c  |
//! | FSF, FSFD   | field, ASC or DESC, _   |
//! | FOP, FCP    | _, _, _                 |

use crate::dal::query::{Connector, FilterOperator, Query, SortDirection};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("incomplete filter group at token {0}")]
    Incomplete(usize),
    #[error("unknown filter instruction: {0}")]
    UnknownInstruction(String),
    #[error("unknown filter operator: {0}")]
    UnknownOperator(String),
}

fn operator(token: &str) -> Result<FilterOperator, FilterError> {
    Ok(match token.to_uppercase().as_str() {
        "EQ" => FilterOperator::Eq,
        "NE" => FilterOperator::Ne,
        "GT" => FilterOperator::Gt,
        "GE" => FilterOperator::Ge,
        "LT" => FilterOperator::Lt,
        "LE" => FilterOperator::Le,
        "LK" => FilterOperator::Like,
        "NLK" => FilterOperator::NotLike,
        "IN" => FilterOperator::In,
        "NI" => FilterOperator::NotIn,
        "IS" => FilterOperator::IsNull,
        "INN" => FilterOperator::IsNotNull,
        other => return Err(FilterError::UnknownOperator(other.to_string())),
    })
}

fn list(value: &str) -> Value {
    Value::Array(
        value
            .split(',')
            .map(|v| Value::String(v.to_string()))
            .collect(),
    )
}

/// Apply a filter expression to `query`. The query is left untouched when parsing fails.
pub fn parse(filter: &str, query: &mut Query) -> Result<(), FilterError> {
    if filter.trim().is_empty() {
        return Ok(());
    }
    let tokens: Vec<&str> = filter.split('~').collect();
    if tokens.len() % 4 != 0 {
        return Err(FilterError::Incomplete(tokens.len() - tokens.len() % 4));
    }

    let mut staged = query.clone();
    for group in tokens.chunks(4) {
        let (instruction, field, op, value) = (group[0], group[1], group[2], group[3]);
        match instruction.to_uppercase().as_str() {
            "FBV" | "FBVOR" => {
                let connector = if instruction.eq_ignore_ascii_case("FBVOR") {
                    Connector::Or
                } else {
                    Connector::And
                };
                let operator = operator(op)?;
                let value = match operator {
                    FilterOperator::In | FilterOperator::NotIn => list(value),
                    FilterOperator::IsNull | FilterOperator::IsNotNull => Value::Null,
                    _ => Value::String(value.to_string()),
                };
                staged.add_filter(field, value, operator, connector, field);
            }
            "FBL" | "FBLOR" => {
                let connector = if instruction.eq_ignore_ascii_case("FBLOR") {
                    Connector::Or
                } else {
                    Connector::And
                };
                let operator = match operator(op)? {
                    FilterOperator::NotIn => FilterOperator::NotIn,
                    _ => FilterOperator::In,
                };
                staged.add_filter(field, list(value), operator, connector, field);
            }
            "FSF" | "FSFD" => {
                let direction = if instruction.eq_ignore_ascii_case("FSFD") || op.eq_ignore_ascii_case("DESC") {
                    SortDirection::Descending
                } else {
                    SortDirection::Ascending
                };
                staged.add_sort(field, direction);
            }
            "FOP" => {
                staged.add_filter("", Value::Null, FilterOperator::OpenParen, Connector::And, "");
            }
            "FOPOR" => {
                staged.add_filter("", Value::Null, FilterOperator::OpenParen, Connector::Or, "");
            }
            "FCP" => {
                staged.add_filter("", Value::Null, FilterOperator::CloseParen, Connector::And, "");
            }
            other => return Err(FilterError::UnknownInstruction(other.to_string())),
        }
    }
    *query = staged;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_value_filters_and_sorts() {
        let mut q = Query::new();
        parse("FBV~Type~EQ~Novel~FBVOR~Genre~LK~%Fic%~FSFD~Title~0~0", &mut q).unwrap();
        assert_eq!(q.filters.len(), 2);
        assert_eq!(q.filters[0].field, "Type");
        assert_eq!(q.filters[0].value, json!("Novel"));
        assert_eq!(q.filters[1].operator, FilterOperator::Like);
        assert_eq!(q.filters[1].connector, Connector::Or);
        assert_eq!(q.sort[0].direction, SortDirection::Descending);
    }

    #[test]
    fn parses_lists_and_parens() {
        let mut q = Query::new();
        parse("FOP~0~(~0~FBL~IDBook~IN~1,2,3~FCP~0~)~0", &mut q).unwrap();
        assert_eq!(q.filters[0].operator, FilterOperator::OpenParen);
        assert_eq!(q.filters[1].value, json!(["1", "2", "3"]));
        assert_eq!(q.filters[2].operator, FilterOperator::CloseParen);
    }

    #[test]
    fn rejects_bad_input_without_touching_query() {
        let mut q = Query::new();
        q.add_filter("Keep", json!(1), FilterOperator::Eq, Connector::And, "Keep");
        assert_eq!(
            parse("FBV~Type~EQ~Novel~FXX~a~b~c", &mut q),
            Err(FilterError::UnknownInstruction("FXX".into()))
        );
        assert_eq!(parse("FBV~Type~EQ", &mut q), Err(FilterError::Incomplete(0)));
        assert_eq!(
            parse("FBV~Type~ZZ~Novel", &mut q),
            Err(FilterError::UnknownOperator("ZZ".into()))
        );
        assert_eq!(q.filters.len(), 1);
    }
}
