//! Create and Upsert.

use super::common::{as_identifier, authorize_endpoint, ensure_authorized, finish};
use super::update::update_record;
use crate::context::RequestContext;
use crate::dal::{Connector, FilterOperator};
use crate::error::{AppError, EndpointError};
use crate::extractors::{RequestMeta, RequestParams};
use crate::response::Payload;
use crate::service::RecordValidator;
use crate::state::{AppState, Endpoints};
use axum::{extract::State, response::Response, Json};
use serde_json::{Map, Value};

const CREATE_FAILED: &str = "Error creating a record.";
const UPSERT_FAILED: &str = "Error upserting a record.";
const INVALID_RECORD: &str = "You must pass a valid record to create.";

fn take_record(ctx: &mut RequestContext) -> Result<Map<String, Value>, AppError> {
    match ctx.body.take() {
        Some(Value::Object(record)) => Ok(record),
        _ => Err(AppError::BadRequest(INVALID_RECORD.into())),
    }
}

/// Hooks, validation, authorization and the DAL create for one incoming record.
pub(crate) async fn create_record(
    endpoints: &Endpoints,
    ctx: &mut RequestContext,
    record: Map<String, Value>,
) -> Result<Value, AppError> {
    ctx.query.set_id_user(ctx.session.user_id);
    ctx.record = Some(Value::Object(record));
    endpoints.behaviors.run_behavior("Create-PreOperation", ctx).await?;

    let Some(Value::Object(record)) = ctx.record.clone() else {
        return Err(AppError::BadRequest(INVALID_RECORD.into()));
    };
    RecordValidator::validate(&record, &ctx.dal.entity().validation)?;

    endpoints.authorizers.authorize_request("Create", ctx).await?;
    ensure_authorized(ctx)?;

    let created = ctx.dal.do_create(&ctx.query, record).await?;
    ctx.record = Some(created);
    endpoints.behaviors.run_behavior("Create-PostOperation", ctx).await?;
    ensure_authorized(ctx)?;

    Ok(ctx.record.take().unwrap_or(Value::Null))
}

pub async fn create(
    State(endpoints): State<AppState>,
    meta: RequestMeta,
    RequestParams(params): RequestParams,
    body: Option<Json<Value>>,
) -> Result<Response, EndpointError> {
    let mut ctx = endpoints.context(meta, params, body.map(|Json(v)| v));
    let result = async {
        authorize_endpoint(&endpoints, &mut ctx, "Create")?;
        let record = take_record(&mut ctx)?;
        create_record(&endpoints, &mut ctx, record).await
    }
    .await;
    finish(&endpoints, &mut ctx, "Create", CREATE_FAILED, result.map(Payload::Record))
}

/// Identifier of an existing live record matching the incoming one by default identifier, then GUID.
async fn existing_identifier(ctx: &RequestContext, record: &Map<String, Value>) -> Result<Option<Value>, AppError> {
    let id_col = ctx.dal.default_identifier();
    let mut lookup = ctx.dal.query();
    if let Some(id) = record.get(id_col).and_then(as_identifier).filter(|id| *id > 0) {
        lookup.add_filter(id_col, Value::from(id), FilterOperator::Eq, Connector::And, id_col);
    } else if let Some((guid_col, guid)) = ctx
        .dal
        .default_guid_identifier()
        .and_then(|g| record.get(g).and_then(Value::as_str).filter(|s| !s.is_empty()).map(|s| (g, s)))
    {
        lookup.add_filter(guid_col, Value::String(guid.to_string()), FilterOperator::Eq, Connector::And, guid_col);
    } else {
        return Ok(None);
    }
    Ok(ctx
        .dal
        .do_read(&lookup)
        .await?
        .and_then(|existing| existing.get(id_col).cloned()))
}

pub async fn upsert(
    State(endpoints): State<AppState>,
    meta: RequestMeta,
    RequestParams(params): RequestParams,
    body: Option<Json<Value>>,
) -> Result<Response, EndpointError> {
    let mut ctx = endpoints.context(meta, params, body.map(|Json(v)| v));
    let result = async {
        authorize_endpoint(&endpoints, &mut ctx, "Upsert")?;
        let mut record = take_record(&mut ctx)?;
        match existing_identifier(&ctx, &record).await? {
            Some(id) => {
                record.insert(ctx.dal.default_identifier().to_string(), id);
                update_record(&endpoints, &mut ctx, record).await
            }
            None => create_record(&endpoints, &mut ctx, record).await,
        }
    }
    .await;
    finish(&endpoints, &mut ctx, "Upsert", UPSERT_FAILED, result.map(Payload::Record))
}
