//! Single-record read by default identifier or GUID.

use super::common::{authorize_endpoint, ensure_authorized, filter_by_identifier, finish};
use crate::context::RequestContext;
use crate::error::{AppError, EndpointError};
use crate::extractors::{RequestMeta, RequestParams};
use crate::response::Payload;
use crate::state::{AppState, Endpoints};
use axum::{extract::State, response::Response};
use serde_json::{Map, Value};

const READ_FAILED: &str = "Error retrieving a record.";

/// `Ok(None)` when nothing matches; the caller answers with an empty object.
async fn read_record(endpoints: &Endpoints, ctx: &mut RequestContext) -> Result<Option<Value>, AppError> {
    authorize_endpoint(endpoints, ctx, "Read")?;

    let raw = ctx.param("IDRecord").cloned().unwrap_or(Value::Null);
    filter_by_identifier(ctx, &raw, "A valid record identifier must be provided.")?;
    endpoints.behaviors.run_behavior("Read-QueryConfiguration", ctx).await?;
    endpoints.behaviors.run_behavior("Read-PreAuth", ctx).await?;

    let Some(record) = ctx.dal.do_read(&ctx.query).await? else {
        tracing::debug!(request_id = %ctx.request_id, "record not found");
        return Ok(None);
    };
    ctx.record = Some(record);

    endpoints.authorizers.authorize_request("Read", ctx).await?;
    endpoints.behaviors.run_behavior("Read-PostOperation", ctx).await?;
    ensure_authorized(ctx)?;

    Ok(ctx.record.take())
}

pub async fn read(
    State(endpoints): State<AppState>,
    meta: RequestMeta,
    RequestParams(params): RequestParams,
) -> Result<Response, EndpointError> {
    let mut ctx = endpoints.context(meta, params, None);
    let result = read_record(&endpoints, &mut ctx)
        .await
        .map(|record| Payload::Record(record.unwrap_or_else(|| Value::Object(Map::new()))));
    finish(&endpoints, &mut ctx, "Read", READ_FAILED, result)
}
