//! Per-request state threaded through every pipeline stage.

use crate::dal::{Dal, Query};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Who is calling. Resolved once per request by a [`crate::extractors::SessionResolver`].
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct UserSession {
    pub session_id: String,
    pub logged_in: bool,
    pub user_id: i64,
    pub role_index: i64,
    pub customer_id: i64,
}

/// Mutable request state. Hooks and authorizers receive it by `&mut` and may change anything public.
///
/// The authorization flag starts true and can only be cleared through [`RequestContext::deny`].
pub struct RequestContext {
    pub session: UserSession,
    pub request_id: String,
    pub url: String,
    pub dal: Arc<dyn Dal>,
    pub query: Query,
    /// Merged path and query-string parameters.
    pub params: Map<String, Value>,
    pub body: Option<Value>,
    /// The record under consideration: the fetched record, or the current one during a record-set scan.
    pub record: Option<Value>,
    pub records: Option<Vec<Value>>,
    /// Non-record payload for schema and validation endpoints.
    pub result: Option<Value>,
    /// Operation name set by `authorize_request`, for authorizers that need it.
    pub endpoint_hash: Option<String>,
    /// Minimum role index for the endpoint being served.
    pub required_level: i64,
    /// Skips every authorizer predicate. Trust boundary: only set this for privileged internal callers.
    pub authorize_override: bool,
    authorized: bool,
}

impl RequestContext {
    pub fn new(dal: Arc<dyn Dal>, session: UserSession, request_id: String, url: String) -> Self {
        let query = dal.query();
        RequestContext {
            session,
            request_id,
            url,
            dal,
            query,
            params: Map::new(),
            body: None,
            record: None,
            records: None,
            result: None,
            endpoint_hash: None,
            required_level: 0,
            authorize_override: false,
            authorized: true,
        }
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    /// Mark the request unauthorized for the rest of its life.
    pub fn deny(&mut self) {
        self.authorized = false;
    }

    /// Field of the current record, if any.
    pub fn record_field(&self, field: &str) -> Option<&Value> {
        self.record.as_ref().and_then(|r| r.get(field))
    }

    /// Drop record references once the response payload has been produced or the request failed.
    pub fn clear_records(&mut self) {
        self.record = None;
        self.records = None;
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_from_str, resolve};
    use crate::dal::MemoryDal;

    pub(crate) fn context() -> RequestContext {
        let config = load_from_str(
            r#"{ "scope": "Book", "default_identifier": "IDBook",
                 "schema": [{ "column": "IDBook", "type": "AutoIdentity" }] }"#,
        )
        .unwrap();
        let dal = Arc::new(MemoryDal::new(resolve(&config).unwrap()));
        RequestContext::new(dal, UserSession::default(), "req-1".into(), "/1.0/Books".into())
    }

    #[test]
    fn deny_is_sticky() {
        let mut ctx = context();
        assert!(ctx.is_authorized());
        ctx.deny();
        ctx.deny();
        assert!(!ctx.is_authorized());
    }

    #[test]
    fn clear_records_drops_both_references() {
        let mut ctx = context();
        ctx.record = Some(serde_json::json!({ "IDBook": 1 }));
        ctx.records = Some(vec![serde_json::json!({ "IDBook": 1 })]);
        ctx.clear_records();
        assert!(ctx.record.is_none());
        assert!(ctx.records.is_none());
    }
}
