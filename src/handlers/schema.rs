//! Schema, New (default record) and Validate.

use super::common::{authorize_endpoint, ensure_authorized, finish};
use crate::context::RequestContext;
use crate::error::{AppError, EndpointError};
use crate::extractors::{RequestMeta, RequestParams};
use crate::response::Payload;
use crate::service::RecordValidator;
use crate::state::{AppState, Endpoints};
use axum::{extract::State, response::Response, Json};
use serde_json::{json, Map, Value};

async fn describe(endpoints: &Endpoints, ctx: &mut RequestContext) -> Result<Value, AppError> {
    authorize_endpoint(endpoints, ctx, "Schema")?;
    ctx.result = Some(ctx.dal.entity().json_schema());
    endpoints.behaviors.run_behavior("Schema-PreOperation", ctx).await?;
    endpoints.authorizers.authorize_request("Schema", ctx).await?;
    endpoints.behaviors.run_behavior("Schema-PostOperation", ctx).await?;
    ensure_authorized(ctx)?;
    Ok(ctx.result.take().unwrap_or(Value::Null))
}

pub async fn schema(
    State(endpoints): State<AppState>,
    meta: RequestMeta,
    RequestParams(params): RequestParams,
) -> Result<Response, EndpointError> {
    let mut ctx = endpoints.context(meta, params, None);
    let result = describe(&endpoints, &mut ctx).await;
    finish(&endpoints, &mut ctx, "Schema", "Error retrieving the schema.", result.map(Payload::Record))
}

/// The configured default object, with every other column present as null.
fn default_record(ctx: &RequestContext) -> Value {
    let entity = ctx.dal.entity();
    let mut record: Map<String, Value> = entity
        .columns
        .iter()
        .map(|c| (c.name.clone(), Value::Null))
        .collect();
    record.extend(entity.default_object.clone());
    Value::Object(record)
}

async fn new_record(endpoints: &Endpoints, ctx: &mut RequestContext) -> Result<Value, AppError> {
    authorize_endpoint(endpoints, ctx, "New")?;
    ctx.record = Some(default_record(ctx));
    endpoints.behaviors.run_behavior("New-PreOperation", ctx).await?;
    endpoints.authorizers.authorize_request("New", ctx).await?;
    endpoints.behaviors.run_behavior("New-PostOperation", ctx).await?;
    ensure_authorized(ctx)?;
    Ok(ctx.record.take().unwrap_or(Value::Null))
}

pub async fn new(
    State(endpoints): State<AppState>,
    meta: RequestMeta,
    RequestParams(params): RequestParams,
) -> Result<Response, EndpointError> {
    let mut ctx = endpoints.context(meta, params, None);
    let result = new_record(&endpoints, &mut ctx).await;
    finish(&endpoints, &mut ctx, "New", "Error creating a new default record.", result.map(Payload::Record))
}

async fn validate_record(endpoints: &Endpoints, ctx: &mut RequestContext) -> Result<Value, AppError> {
    authorize_endpoint(endpoints, ctx, "Validate")?;
    let Some(record @ Value::Object(_)) = ctx.body.take() else {
        return Err(AppError::BadRequest("You must pass a valid record to validate.".into()));
    };
    ctx.record = Some(record);
    endpoints.behaviors.run_behavior("Validate-PreOperation", ctx).await?;
    endpoints.authorizers.authorize_request("Validate", ctx).await?;
    ensure_authorized(ctx)?;

    let errors = match ctx.record.as_ref() {
        Some(Value::Object(record)) => RecordValidator::errors(record, &ctx.dal.entity().validation),
        _ => vec!["record is not an object".to_string()],
    };
    ctx.result = Some(json!({ "Valid": errors.is_empty(), "Errors": errors }));
    endpoints.behaviors.run_behavior("Validate-PostOperation", ctx).await?;
    ensure_authorized(ctx)?;
    Ok(ctx.result.take().unwrap_or(Value::Null))
}

pub async fn validate(
    State(endpoints): State<AppState>,
    meta: RequestMeta,
    RequestParams(params): RequestParams,
    body: Option<Json<Value>>,
) -> Result<Response, EndpointError> {
    let mut ctx = endpoints.context(meta, params, body.map(|Json(v)| v));
    let result = validate_record(&endpoints, &mut ctx).await;
    finish(&endpoints, &mut ctx, "Validate", "Error validating a record.", result.map(Payload::Record))
}
