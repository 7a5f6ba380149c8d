//! Path parameters merged over the query string.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, Query},
    http::request::Parts,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// All request parameters as JSON strings. Path segments win over query-string keys of the same name.
#[derive(Clone, Debug, Default)]
pub struct RequestParams(pub Map<String, Value>);

#[async_trait]
impl<S> FromRequestParts<S> for RequestParams
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let mut params = Map::new();
        if let Ok(Query(query)) = Query::<HashMap<String, String>>::from_request_parts(parts, state).await {
            params.extend(query.into_iter().map(|(k, v)| (k, Value::String(v))));
        }
        if let Ok(Path(path)) = Path::<HashMap<String, String>>::from_request_parts(parts, state).await {
            params.extend(path.into_iter().map(|(k, v)| (k, Value::String(v))));
        }
        Ok(RequestParams(params))
    }
}
