//! Update an existing record identified by its default identifier.

use super::common::{as_identifier, authorize_endpoint, ensure_authorized, finish};
use crate::context::RequestContext;
use crate::dal::{Connector, FilterOperator};
use crate::error::{AppError, EndpointError};
use crate::extractors::{RequestMeta, RequestParams};
use crate::response::Payload;
use crate::service::RecordValidator;
use crate::state::{AppState, Endpoints};
use axum::{extract::State, response::Response, Json};
use serde_json::{Map, Value};

const UPDATE_FAILED: &str = "Error updating a record.";

/// Load the target, run hooks and authorizers against it, then apply the incoming changes.
///
/// The loaded record sits in `ctx.record` and the incoming changes in `ctx.body` while hooks run.
pub(crate) async fn update_record(
    endpoints: &Endpoints,
    ctx: &mut RequestContext,
    changes: Map<String, Value>,
) -> Result<Value, AppError> {
    let id_col = ctx.dal.default_identifier().to_string();
    let Some(id) = changes.get(&id_col).and_then(as_identifier).filter(|id| *id > 0) else {
        return Err(AppError::BadRequest(format!(
            "You must pass a valid record with a {} to update.",
            id_col
        )));
    };
    RecordValidator::validate_partial(&changes, &ctx.dal.entity().validation)?;

    ctx.query
        .add_filter(&id_col, Value::from(id), FilterOperator::Eq, Connector::And, &id_col)
        .set_id_user(ctx.session.user_id);
    endpoints.behaviors.run_behavior("Update-QueryConfiguration", ctx).await?;

    let original = ctx
        .dal
        .do_read(&ctx.query)
        .await?
        .ok_or_else(|| AppError::NotFound("No record found to update.".into()))?;
    ctx.record = Some(original);
    ctx.body = Some(Value::Object(changes));
    endpoints.behaviors.run_behavior("Update-PreOperation", ctx).await?;

    endpoints.authorizers.authorize_request("Update", ctx).await?;
    ensure_authorized(ctx)?;

    let Some(Value::Object(mut changes)) = ctx.body.take() else {
        return Err(AppError::BadRequest("Update changes must be a record.".into()));
    };
    changes.insert(id_col, Value::from(id));
    let updated = ctx
        .dal
        .do_update(&ctx.query, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("No record found to update.".into()))?;
    ctx.record = Some(updated);
    endpoints.behaviors.run_behavior("Update-PostOperation", ctx).await?;
    ensure_authorized(ctx)?;

    Ok(ctx.record.take().unwrap_or(Value::Null))
}

pub async fn update(
    State(endpoints): State<AppState>,
    meta: RequestMeta,
    RequestParams(params): RequestParams,
    body: Option<Json<Value>>,
) -> Result<Response, EndpointError> {
    let mut ctx = endpoints.context(meta, params, body.map(|Json(v)| v));
    let result = async {
        authorize_endpoint(&endpoints, &mut ctx, "Update")?;
        let Some(Value::Object(changes)) = ctx.body.take() else {
            return Err(AppError::BadRequest("You must pass a valid record to update.".into()));
        };
        update_record(&endpoints, &mut ctx, changes).await
    }
    .await;
    finish(&endpoints, &mut ctx, "Update", UPDATE_FAILED, result.map(Payload::Record))
}
