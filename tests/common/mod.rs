//! Bookstore fixture and request helpers shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use endpoint_sdk::{
    app, load_from_str, resolve, AuthorizationMode, Dal, DalError, Endpoints, MemoryDal, Query, ResolvedEntity,
    Settings,
};
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const BOOK_ENTITY: &str = r#"{
    "scope": "Book",
    "default_identifier": "IDBook",
    "guid_identifier": "GUIDBook",
    "schema": [
        { "column": "IDBook", "type": "AutoIdentity" },
        { "column": "GUIDBook", "type": "AutoGUID" },
        { "column": "CreateDate", "type": "CreateDate" },
        { "column": "CreatingIDUser", "type": "CreateIDUser" },
        { "column": "UpdateDate", "type": "UpdateDate" },
        { "column": "UpdatingIDUser", "type": "UpdateIDUser" },
        { "column": "Deleted", "type": "Deleted" },
        { "column": "Title", "type": "String", "size": 200 },
        { "column": "Type", "type": "String" },
        { "column": "Genre", "type": "String" },
        { "column": "PublicationYear", "type": "Integer" },
        { "column": "IDCustomer", "type": "Integer" }
    ],
    "validation": {
        "Title": { "required": true },
        "PublicationYear": { "minimum": 1450, "maximum": 2100 }
    },
    "default_object": { "Type": "Book", "IDCustomer": 0 },
    "authorizer": {
        "__DefaultAPISecurity": {
            "Reads": "RequireManager",
            "Read": "RequireManager",
            "Update": "Mine"
        }
    }
}"#;

pub fn book_entity() -> ResolvedEntity {
    resolve(&load_from_str(BOOK_ENTITY).expect("fixture parses")).expect("fixture resolves")
}

/// Six books, inserted in id order by user 1.
pub fn bookstore() -> MemoryDal {
    let dal = MemoryDal::new(book_entity());
    dal.seed(
        vec![
            json!({ "Title": "The Hunger Games", "Type": "Novel", "Genre": "Dystopia", "PublicationYear": 2008 }),
            json!({ "Title": "Dune", "Type": "Novel", "Genre": "Science Fiction", "PublicationYear": 1965 }),
            json!({ "Title": "Leaves of Grass", "Type": "Poetry", "Genre": "Poetry", "PublicationYear": 1855 }),
            json!({ "Title": "Emma", "Type": "Novel", "Genre": "Romance", "PublicationYear": 1815 }),
            json!({ "Title": "The Raven", "Type": "Poetry", "Genre": "Poetry", "PublicationYear": 1845 }),
            json!({ "Title": "Foundation", "Type": "Novel", "Genre": "Science Fiction", "PublicationYear": 1951 }),
        ],
        1,
    )
    .expect("seed");
    dal
}

pub fn endpoints(mode: AuthorizationMode) -> Arc<Endpoints> {
    endpoints_over(Arc::new(bookstore()), mode)
}

/// Routes pipeline logs to the test writer; set `RUST_LOG=endpoint_sdk=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn endpoints_over(dal: Arc<dyn Dal>, mode: AuthorizationMode) -> Arc<Endpoints> {
    init_tracing();
    Arc::new(Endpoints::new(dal, Settings::default().with_authorization_mode(mode)))
}

pub fn router(endpoints: &Arc<Endpoints>) -> Router {
    app([endpoints.clone()])
}

/// Caller identity sent as headers. `None` means anonymous.
#[derive(Clone, Copy)]
pub struct Caller {
    pub user_id: i64,
    pub role_index: i64,
}

pub const USER: Caller = Caller { user_id: 1, role_index: 1 };
pub const OTHER_USER: Caller = Caller { user_id: 2, role_index: 1 };
pub const MANAGER: Caller = Caller { user_id: 3, role_index: 2 };

pub async fn call(
    router: &Router,
    method: Method,
    uri: &str,
    caller: Option<Caller>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Session-ID", "test-session");
    if let Some(c) = caller {
        builder = builder
            .header("X-User-ID", c.user_id.to_string())
            .header("X-User-Role-Index", c.role_index.to_string());
    }
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = router.clone().oneshot(request).await.expect("infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    call(router, Method::GET, uri, Some(USER), None).await
}

pub fn ids(records: &Value) -> Vec<i64> {
    records
        .as_array()
        .map(|a| a.iter().filter_map(|r| r["IDBook"].as_i64()).collect())
        .unwrap_or_default()
}

/// Wraps the bookstore and records every query the pipeline hands to `do_reads`.
pub struct RecordingDal {
    pub inner: MemoryDal,
    pub reads: Mutex<Vec<Query>>,
}

impl RecordingDal {
    pub fn new() -> Self {
        RecordingDal {
            inner: bookstore(),
            reads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Dal for RecordingDal {
    fn entity(&self) -> &ResolvedEntity {
        self.inner.entity()
    }

    async fn do_create(&self, query: &Query, record: Map<String, Value>) -> Result<Value, DalError> {
        self.inner.do_create(query, record).await
    }

    async fn do_read(&self, query: &Query) -> Result<Option<Value>, DalError> {
        self.inner.do_read(query).await
    }

    async fn do_reads(&self, query: &Query) -> Result<Option<Vec<Value>>, DalError> {
        self.reads.lock().expect("lock").push(query.clone());
        self.inner.do_reads(query).await
    }

    async fn do_update(&self, query: &Query, record: Map<String, Value>) -> Result<Option<Value>, DalError> {
        self.inner.do_update(query, record).await
    }

    async fn do_delete(&self, query: &Query) -> Result<u64, DalError> {
        self.inner.do_delete(query).await
    }

    async fn do_count(&self, query: &Query) -> Result<u64, DalError> {
        self.inner.do_count(query).await
    }
}
