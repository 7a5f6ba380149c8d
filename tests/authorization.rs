//! Authorizer tables, built-in ownership checks and the 405 short-circuit, end to end.

mod common;

use axum::http::{Method, StatusCode};
use common::*;
use endpoint_sdk::{AppError, AuthorizationMode, RequestContext, UNAUTHORIZED_MESSAGE};
use serde_json::json;
use std::sync::Arc;

fn require_manager(books: &Arc<endpoint_sdk::Endpoints>) {
    books.set_authorizer("RequireManager", |ctx: &mut RequestContext| -> Result<(), AppError> {
        if ctx.session.role_index < 2 {
            ctx.deny();
        }
        Ok(())
    });
}

#[tokio::test]
async fn insufficient_role_index_is_refused_with_fixed_error() {
    let books = endpoints(AuthorizationMode::SimpleOwnership);
    require_manager(&books);
    let router = router(&books);

    let (status, body) = get(&router, "/1.0/Books").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        body,
        json!({ "Code": 405, "Message": UNAUTHORIZED_MESSAGE, "Error": "Error retrieving a recordset." })
    );

    let (status, body) = get(&router, "/1.0/Book/1").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["Message"], UNAUTHORIZED_MESSAGE);

    let (status, records) = call(&router, Method::GET, "/1.0/Books", Some(MANAGER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&records), vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn disabled_mode_ignores_the_authorizer_table() {
    let books = endpoints(AuthorizationMode::Disabled);
    require_manager(&books);
    let router = router(&books);

    let (status, records) = get(&router, "/1.0/Books").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&records).len(), 6);
}

#[tokio::test]
async fn one_denied_record_fails_the_whole_set() {
    let books = endpoints(AuthorizationMode::SimpleOwnership);
    books.set_authorizer("RequireManager", |ctx: &mut RequestContext| -> Result<(), AppError> {
        let year = ctx.record_field("PublicationYear").and_then(|v| v.as_i64()).unwrap_or(0);
        if year < 1850 {
            ctx.deny();
        }
        Ok(())
    });
    let router = router(&books);

    let (status, _) = get(&router, "/1.0/Books/0/3").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&router, "/1.0/Books").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["Message"], UNAUTHORIZED_MESSAGE);
}

#[tokio::test]
async fn post_operation_hook_cannot_restore_authorization() {
    let books = endpoints(AuthorizationMode::SimpleOwnership);
    require_manager(&books);
    books.set_behavior("Reads-PostOperation", |ctx: &mut RequestContext| -> Result<(), AppError> {
        ctx.records = Some(Vec::new());
        Ok(())
    });
    let router = router(&books);

    let (status, _) = get(&router, "/1.0/Books").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn post_operation_hook_can_deny() {
    let books = endpoints(AuthorizationMode::Disabled);
    books.set_behavior("Read-PostOperation", |ctx: &mut RequestContext| -> Result<(), AppError> {
        if ctx.record_field("Type").and_then(|v| v.as_str()) == Some("Poetry") {
            ctx.deny();
        }
        Ok(())
    });
    let router = router(&books);

    assert_eq!(get(&router, "/1.0/Book/1").await.0, StatusCode::OK);
    let (status, body) = get(&router, "/1.0/Book/3").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["Error"], "Error retrieving a record.");
}

#[tokio::test]
async fn update_requires_ownership() {
    let books = endpoints(AuthorizationMode::SimpleOwnership);
    let router = router(&books);

    let (status, body) = call(
        &router,
        Method::PUT,
        "/1.0/Book",
        Some(OTHER_USER),
        Some(json!({ "IDBook": 1, "Title": "Mockingjay" })),
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["Error"], "Error updating a record.");

    let (status, updated) = call(
        &router,
        Method::PUT,
        "/1.0/Book",
        Some(USER),
        Some(json!({ "IDBook": 1, "Title": "Mockingjay" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["Title"], "Mockingjay");
}

#[tokio::test]
async fn override_skips_predicates() {
    let books = endpoints(AuthorizationMode::SimpleOwnership);
    require_manager(&books);
    books.set_behavior("Reads-QueryConfiguration", |ctx: &mut RequestContext| -> Result<(), AppError> {
        // trusted internal caller
        if ctx.session.session_id == "test-session" {
            ctx.authorize_override = true;
        }
        Ok(())
    });
    let router = router(&books);

    let (status, records) = get(&router, "/1.0/Books").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&records).len(), 6);
}
