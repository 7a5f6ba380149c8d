//! Data access layer contract consumed by the endpoint pipeline, plus the bundled implementations.

pub mod filter;
mod memory;
mod postgres;
pub mod query;

pub use filter::{parse as parse_filter, FilterError};
pub use memory::MemoryDal;
pub use postgres::PgDal;
pub use query::{Connector, Filter, FilterOperator, Query, Sort, SortDirection};

use crate::config::ResolvedEntity;
use crate::error::DalError;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A record store for one entity scope.
///
/// Reads return `None` or an empty list when nothing matches; neither is an error.
#[async_trait]
pub trait Dal: Send + Sync {
    /// Schema metadata: columns, identifiers, role names and authorizer tables.
    fn entity(&self) -> &ResolvedEntity;

    fn scope(&self) -> &str {
        &self.entity().scope
    }

    fn default_identifier(&self) -> &str {
        &self.entity().default_identifier
    }

    fn default_guid_identifier(&self) -> Option<&str> {
        self.entity().guid_identifier.as_deref()
    }

    fn role_name(&self, role_index: i64) -> &str {
        self.entity().role_name(role_index)
    }

    /// A fresh query for this scope.
    fn query(&self) -> Query {
        Query::new()
    }

    async fn do_create(&self, query: &Query, record: Map<String, Value>) -> Result<Value, DalError>;

    async fn do_read(&self, query: &Query) -> Result<Option<Value>, DalError>;

    async fn do_reads(&self, query: &Query) -> Result<Option<Vec<Value>>, DalError>;

    /// Update the record whose default identifier is carried in `record`.
    async fn do_update(&self, query: &Query, record: Map<String, Value>) -> Result<Option<Value>, DalError>;

    /// Delete every record matching the query filters; returns how many were removed.
    async fn do_delete(&self, query: &Query) -> Result<u64, DalError>;

    async fn do_count(&self, query: &Query) -> Result<u64, DalError>;
}
