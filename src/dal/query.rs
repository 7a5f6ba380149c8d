//! Query value object handed to a DAL: paging, filters, sorts and projection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "NOT LIKE")]
    NotLike,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "IS NULL")]
    IsNull,
    #[serde(rename = "IS NOT NULL")]
    IsNotNull,
    #[serde(rename = "(")]
    OpenParen,
    #[serde(rename = ")")]
    CloseParen,
}

impl FilterOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Ne => "!=",
            FilterOperator::Gt => ">",
            FilterOperator::Ge => ">=",
            FilterOperator::Lt => "<",
            FilterOperator::Le => "<=",
            FilterOperator::Like => "LIKE",
            FilterOperator::NotLike => "NOT LIKE",
            FilterOperator::In => "IN",
            FilterOperator::NotIn => "NOT IN",
            FilterOperator::IsNull => "IS NULL",
            FilterOperator::IsNotNull => "IS NOT NULL",
            FilterOperator::OpenParen => "(",
            FilterOperator::CloseParen => ")",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connector {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl Connector {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// One filter predicate. Serialized with the field names callers use for pre-built filters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(rename = "Column")]
    pub field: String,
    #[serde(rename = "Value", default)]
    pub value: Value,
    #[serde(rename = "Operator")]
    pub operator: FilterOperator,
    #[serde(rename = "Connector", default)]
    pub connector: Connector,
    #[serde(rename = "Parameter", default)]
    pub tag: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct Query {
    pub begin: Option<u64>,
    pub cap: Option<u64>,
    pub distinct: bool,
    /// Projected columns; empty means every column.
    pub data_elements: Vec<String>,
    pub filters: Vec<Filter>,
    pub sort: Vec<Sort>,
    pub log_level: u8,
    /// User stamped into audit columns on writes.
    pub id_user: i64,
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    pub fn set_cap(&mut self, cap: Option<u64>) -> &mut Self {
        self.cap = cap;
        self
    }

    pub fn set_begin(&mut self, begin: Option<u64>) -> &mut Self {
        self.begin = begin;
        self
    }

    pub fn set_distinct(&mut self, distinct: bool) -> &mut Self {
        self.distinct = distinct;
        self
    }

    pub fn set_data_elements(&mut self, columns: Vec<String>) -> &mut Self {
        self.data_elements = columns;
        self
    }

    pub fn add_filter(
        &mut self,
        field: &str,
        value: Value,
        operator: FilterOperator,
        connector: Connector,
        tag: &str,
    ) -> &mut Self {
        self.filters.push(Filter {
            field: field.to_string(),
            value,
            operator,
            connector,
            tag: tag.to_string(),
        });
        self
    }

    /// Replace all filters with a pre-built list.
    pub fn set_filter(&mut self, filters: Vec<Filter>) -> &mut Self {
        self.filters = filters;
        self
    }

    pub fn add_sort(&mut self, column: &str, direction: SortDirection) -> &mut Self {
        self.sort.push(Sort {
            column: column.to_string(),
            direction,
        });
        self
    }

    pub fn set_log_level(&mut self, level: u8) -> &mut Self {
        self.log_level = level;
        self
    }

    pub fn set_id_user(&mut self, id_user: i64) -> &mut Self {
        self.id_user = id_user;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_chains() {
        let mut q = Query::new();
        q.set_cap(Some(10))
            .set_begin(Some(20))
            .set_distinct(true)
            .add_filter("Type", json!("Novel"), FilterOperator::Eq, Connector::And, "Type");
        assert_eq!(q.cap, Some(10));
        assert_eq!(q.begin, Some(20));
        assert!(q.distinct);
        assert_eq!(q.filters.len(), 1);
        assert_eq!(q.filters[0].operator.as_sql(), "=");
    }

    #[test]
    fn prebuilt_filters_deserialize() {
        let filters: Vec<Filter> = serde_json::from_value(json!([
            { "Column": "Genre", "Operator": "LIKE", "Value": "%Fic%" },
            { "Column": "PublicationYear", "Operator": ">", "Value": 1950, "Connector": "OR" }
        ]))
        .unwrap();
        assert_eq!(filters[0].connector, Connector::And);
        assert_eq!(filters[1].operator, FilterOperator::Gt);
        assert_eq!(filters[1].connector, Connector::Or);
    }
}
