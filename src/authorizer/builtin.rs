//! Authorizers registered in simple-ownership mode.

use super::Authorizer;
use crate::config::ColumnType;
use crate::context::RequestContext;
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

const DEFAULT_OWNER_COLUMN: &str = "CreatingIDUser";
const CUSTOMER_COLUMN: &str = "IDCustomer";

fn as_id(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Deny unless `ctx.record[column]` equals `expected`. No record means nothing to check.
fn require_match(ctx: &mut RequestContext, column: &str, expected: i64) {
    if ctx.record.is_none() {
        return;
    }
    if ctx.record_field(column).and_then(as_id) != Some(expected) {
        ctx.deny();
    }
}

pub struct Allow;

#[async_trait]
impl Authorizer for Allow {
    async fn authorize(&self, _ctx: &mut RequestContext) -> Result<(), AppError> {
        Ok(())
    }
}

pub struct Deny;

#[async_trait]
impl Authorizer for Deny {
    async fn authorize(&self, ctx: &mut RequestContext) -> Result<(), AppError> {
        ctx.deny();
        Ok(())
    }
}

/// The record was created by the calling user.
pub struct Mine;

#[async_trait]
impl Authorizer for Mine {
    async fn authorize(&self, ctx: &mut RequestContext) -> Result<(), AppError> {
        let column = ctx
            .dal
            .entity()
            .column_of_type(ColumnType::CreateIdUser)
            .unwrap_or(DEFAULT_OWNER_COLUMN)
            .to_string();
        let user = ctx.session.user_id;
        require_match(ctx, &column, user);
        Ok(())
    }
}

/// The record belongs to the caller's customer.
pub struct MyCustomer;

#[async_trait]
impl Authorizer for MyCustomer {
    async fn authorize(&self, ctx: &mut RequestContext) -> Result<(), AppError> {
        let customer = ctx.session.customer_id;
        require_match(ctx, CUSTOMER_COLUMN, customer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_from_str, resolve};
    use crate::context::UserSession;
    use crate::dal::MemoryDal;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx(user_id: i64, customer_id: i64) -> RequestContext {
        let config = load_from_str(
            r#"{ "scope": "Book", "default_identifier": "IDBook",
                 "schema": [{ "column": "IDBook", "type": "AutoIdentity" },
                            { "column": "Owner", "type": "CreateIDUser" },
                            { "column": "IDCustomer", "type": "Integer" }] }"#,
        )
        .unwrap();
        let dal = Arc::new(MemoryDal::new(resolve(&config).unwrap()));
        let session = UserSession {
            user_id,
            customer_id,
            logged_in: true,
            ..UserSession::default()
        };
        RequestContext::new(dal, session, "r".into(), "/".into())
    }

    #[tokio::test]
    async fn mine_uses_the_creating_user_column() {
        let mut c = ctx(5, 0);
        c.record = Some(json!({ "IDBook": 1, "Owner": "5" }));
        Mine.authorize(&mut c).await.unwrap();
        assert!(c.is_authorized());

        c.record = Some(json!({ "IDBook": 2, "Owner": 6 }));
        Mine.authorize(&mut c).await.unwrap();
        assert!(!c.is_authorized());
    }

    #[tokio::test]
    async fn my_customer_compares_customer_ids() {
        let mut c = ctx(5, 3);
        c.record = Some(json!({ "IDBook": 1, "IDCustomer": 4 }));
        MyCustomer.authorize(&mut c).await.unwrap();
        assert!(!c.is_authorized());
    }

    #[tokio::test]
    async fn ownership_without_a_record_is_not_checked() {
        let mut c = ctx(5, 3);
        Mine.authorize(&mut c).await.unwrap();
        MyCustomer.authorize(&mut c).await.unwrap();
        assert!(c.is_authorized());
    }
}
