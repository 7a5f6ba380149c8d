//! Delete one record by path identifier or by the identifier in the body.

use super::common::{authorize_endpoint, ensure_authorized, filter_by_identifier, finish};
use crate::context::RequestContext;
use crate::error::{AppError, EndpointError};
use crate::extractors::{RequestMeta, RequestParams};
use crate::response::Payload;
use crate::state::{AppState, Endpoints};
use axum::{extract::State, response::Response, Json};
use serde_json::{json, Value};

const DELETE_FAILED: &str = "Error deleting a record.";

/// The response body is whatever `Delete-PostOperation` leaves in `ctx.result`, `{"Count": n}` by default.
async fn delete_record(endpoints: &Endpoints, ctx: &mut RequestContext) -> Result<Value, AppError> {
    authorize_endpoint(endpoints, ctx, "Delete")?;

    let id_col = ctx.dal.default_identifier().to_string();
    let raw = ctx
        .param("IDRecord")
        .cloned()
        .or_else(|| ctx.body.as_ref().and_then(|b| b.get(&id_col)).cloned())
        .unwrap_or(Value::Null);
    filter_by_identifier(ctx, &raw, "You must pass an ID to delete a record.")?;
    ctx.query.set_id_user(ctx.session.user_id);

    let original = ctx
        .dal
        .do_read(&ctx.query)
        .await?
        .ok_or_else(|| AppError::NotFound("Record not found for delete.".into()))?;
    ctx.record = Some(original);
    endpoints.behaviors.run_behavior("Delete-PreOperation", ctx).await?;

    endpoints.authorizers.authorize_request("Delete", ctx).await?;
    ensure_authorized(ctx)?;

    let count = ctx.dal.do_delete(&ctx.query).await?;
    ctx.result = Some(json!({ "Count": count }));
    endpoints.behaviors.run_behavior("Delete-PostOperation", ctx).await?;
    Ok(ctx.result.take().unwrap_or_else(|| json!({ "Count": count })))
}

pub async fn delete(
    State(endpoints): State<AppState>,
    meta: RequestMeta,
    RequestParams(params): RequestParams,
    body: Option<Json<Value>>,
) -> Result<Response, EndpointError> {
    let mut ctx = endpoints.context(meta, params, body.map(|Json(v)| v));
    let result = delete_record(&endpoints, &mut ctx).await;
    finish(&endpoints, &mut ctx, "Delete", DELETE_FAILED, result.map(Payload::Record))
}
