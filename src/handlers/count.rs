//! Count and CountBy.

use super::common::{apply_by_fields, apply_filter, authorize_endpoint, ensure_authorized, finish};
use crate::context::RequestContext;
use crate::error::{AppError, EndpointError};
use crate::extractors::{RequestMeta, RequestParams};
use crate::response::Payload;
use crate::state::{AppState, Endpoints};
use axum::{extract::State, response::Response};

const COUNT_FAILED: &str = "Error retrieving a count.";

async fn count_records<F>(
    endpoints: &Endpoints,
    ctx: &mut RequestContext,
    operation: &str,
    configure: F,
) -> Result<u64, AppError>
where
    F: FnOnce(&mut RequestContext) -> Result<(), AppError>,
{
    authorize_endpoint(endpoints, ctx, "Count")?;
    apply_filter(ctx)?;
    configure(ctx)?;
    endpoints.behaviors.run_behavior("Count-QueryConfiguration", ctx).await?;

    endpoints.authorizers.authorize_request(operation, ctx).await?;
    ensure_authorized(ctx)?;

    Ok(ctx.dal.do_count(&ctx.query).await?)
}

pub async fn count(
    State(endpoints): State<AppState>,
    meta: RequestMeta,
    RequestParams(params): RequestParams,
) -> Result<Response, EndpointError> {
    let mut ctx = endpoints.context(meta, params, None);
    let result = count_records(&endpoints, &mut ctx, "Count", |_| Ok(())).await;
    finish(&endpoints, &mut ctx, "Count", COUNT_FAILED, result.map(Payload::Count))
}

pub async fn count_by(
    State(endpoints): State<AppState>,
    meta: RequestMeta,
    RequestParams(params): RequestParams,
) -> Result<Response, EndpointError> {
    let mut ctx = endpoints.context(meta, params, None);
    let result = count_records(&endpoints, &mut ctx, "CountBy", apply_by_fields).await;
    finish(&endpoints, &mut ctx, "CountBy", COUNT_FAILED, result.map(Payload::Count))
}
