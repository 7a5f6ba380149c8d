//! Resolve the caller's session and request identity from request headers.

use crate::context::UserSession;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

pub const SESSION_ID_HEADER: &str = "X-Session-ID";
pub const USER_ID_HEADER: &str = "X-User-ID";
pub const ROLE_INDEX_HEADER: &str = "X-User-Role-Index";
pub const CUSTOMER_ID_HEADER: &str = "X-Customer-ID";
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Turns request headers into a [`UserSession`]. Plug in your own to read cookies or tokens.
pub trait SessionResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> UserSession;
}

/// Trusts identity headers set by an upstream gateway. A request without `X-User-ID` is anonymous.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeaderSessionResolver;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    header(headers, name).and_then(|s| s.parse().ok())
}

impl SessionResolver for HeaderSessionResolver {
    fn resolve(&self, headers: &HeaderMap) -> UserSession {
        let Some(user_id) = header_i64(headers, USER_ID_HEADER) else {
            return UserSession {
                session_id: header(headers, SESSION_ID_HEADER).unwrap_or_default().to_string(),
                ..UserSession::default()
            };
        };
        UserSession {
            session_id: header(headers, SESSION_ID_HEADER).unwrap_or_default().to_string(),
            logged_in: true,
            user_id,
            role_index: header_i64(headers, ROLE_INDEX_HEADER).unwrap_or(0),
            customer_id: header_i64(headers, CUSTOMER_ID_HEADER).unwrap_or(0),
        }
    }
}

/// Request id, URL and headers captured for the pipeline and its logs.
#[derive(Clone, Debug)]
pub struct RequestMeta {
    pub request_id: String,
    pub url: String,
    pub headers: HeaderMap,
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = header(&parts.headers, REQUEST_ID_HEADER)
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Ok(RequestMeta {
            request_id,
            url: parts.uri.to_string(),
            headers: parts.headers.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn anonymous_without_user_header() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_ID_HEADER, HeaderValue::from_static("abc"));
        let session = HeaderSessionResolver.resolve(&headers);
        assert!(!session.logged_in);
        assert_eq!(session.session_id, "abc");
    }

    #[test]
    fn reads_identity_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("12"));
        headers.insert(ROLE_INDEX_HEADER, HeaderValue::from_static("3"));
        headers.insert(CUSTOMER_ID_HEADER, HeaderValue::from_static(" 40 "));
        let session = HeaderSessionResolver.resolve(&headers);
        assert!(session.logged_in);
        assert_eq!((session.user_id, session.role_index, session.customer_id), (12, 3, 40));
    }
}
