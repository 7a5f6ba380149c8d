//! Record-set endpoints: Reads, ReadsBy, ReadLite, ReadDistinct and ReadSelectList.

use super::common::{apply_by_fields, apply_filter, apply_paging, authorize_endpoint, ensure_authorized, finish};
use crate::context::RequestContext;
use crate::error::{AppError, EndpointError};
use crate::extractors::{RequestMeta, RequestParams};
use crate::response::{distinct_list, lite_list, select_list, Payload};
use crate::state::{AppState, Endpoints};
use axum::{extract::State, response::Response};
use serde_json::Value;

const READS_FAILED: &str = "Error retrieving a recordset.";
const READS_BY_FAILED: &str = "Error retrieving records by value.";

/// Which optional lifecycle hooks a list variant runs around the read.
#[derive(Clone, Copy)]
enum Hooks {
    /// QueryConfiguration, PreAuth and PostOperation.
    Full,
    /// QueryConfiguration and PreAuth; projected rows are never handed to PostOperation.
    NoPostOperation,
    /// QueryConfiguration only.
    QueryOnly,
}

/// The filtered-list pipeline. `configure` adds variant-specific query settings after paging and filtering.
async fn read_records<F>(
    endpoints: &Endpoints,
    ctx: &mut RequestContext,
    operation: &str,
    hooks: Hooks,
    configure: F,
) -> Result<Vec<Value>, AppError>
where
    F: FnOnce(&mut RequestContext) -> Result<(), AppError>,
{
    authorize_endpoint(endpoints, ctx, "Reads")?;

    apply_paging(ctx, endpoints.settings.default_max_cap);
    apply_filter(ctx)?;
    configure(ctx)?;

    endpoints.behaviors.run_behavior("Reads-QueryConfiguration", ctx).await?;
    if let Hooks::Full | Hooks::NoPostOperation = hooks {
        endpoints.behaviors.run_behavior("Reads-PreAuth", ctx).await?;
    }

    let records = ctx.dal.do_reads(&ctx.query).await?.unwrap_or_default();
    ctx.record = None;
    ctx.records = Some(records);

    endpoints.authorizers.authorize_request(operation, ctx).await?;
    if let Hooks::Full = hooks {
        endpoints.behaviors.run_behavior("Reads-PostOperation", ctx).await?;
    }
    ensure_authorized(ctx)?;

    Ok(ctx.records.take().unwrap_or_default())
}

pub async fn reads(
    State(endpoints): State<AppState>,
    meta: RequestMeta,
    RequestParams(params): RequestParams,
) -> Result<Response, EndpointError> {
    let mut ctx = endpoints.context(meta, params, None);
    let result = read_records(&endpoints, &mut ctx, "Reads", Hooks::Full, |_| Ok(())).await;
    finish(&endpoints, &mut ctx, "Reads", READS_FAILED, result.map(Payload::Records))
}

pub async fn reads_by(
    State(endpoints): State<AppState>,
    meta: RequestMeta,
    RequestParams(params): RequestParams,
) -> Result<Response, EndpointError> {
    let mut ctx = endpoints.context(meta, params, None);
    let result = read_records(&endpoints, &mut ctx, "ReadsBy", Hooks::Full, apply_by_fields).await;
    finish(&endpoints, &mut ctx, "ReadsBy", READS_BY_FAILED, result.map(Payload::Records))
}

pub async fn read_lite(
    State(endpoints): State<AppState>,
    meta: RequestMeta,
    RequestParams(params): RequestParams,
) -> Result<Response, EndpointError> {
    let mut ctx = endpoints.context(meta, params, None);
    let result = read_records(&endpoints, &mut ctx, "ReadLite", Hooks::QueryOnly, |_| Ok(()))
        .await
        .map(|records| lite_list(ctx.dal.entity(), &endpoints.behaviors, &records));
    finish(&endpoints, &mut ctx, "ReadLite", READS_FAILED, result.map(Payload::Records))
}

fn distinct_columns(ctx: &RequestContext) -> Result<Vec<String>, AppError> {
    let columns: Vec<String> = ctx
        .param_str("Columns")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err(AppError::BadRequest("Columns to distinct on must be provided.".into()));
    }
    if let Some(unknown) = columns.iter().find(|c| !ctx.dal.entity().has_column(c)) {
        return Err(AppError::BadRequest(format!("Unknown column to distinct on: {}", unknown)));
    }
    Ok(columns)
}

pub async fn read_distinct(
    State(endpoints): State<AppState>,
    meta: RequestMeta,
    RequestParams(params): RequestParams,
) -> Result<Response, EndpointError> {
    let mut ctx = endpoints.context(meta, params, None);
    let result = match distinct_columns(&ctx) {
        Ok(columns) => {
            let projection = columns.clone();
            read_records(&endpoints, &mut ctx, "Reads", Hooks::NoPostOperation, move |ctx| {
                ctx.query.set_distinct(true).set_data_elements(projection);
                Ok(())
            })
            .await
            .map(|records| distinct_list(&columns, &records))
        }
        Err(e) => Err(e),
    };
    finish(&endpoints, &mut ctx, "ReadDistinct", READS_FAILED, result.map(Payload::Records))
}

pub async fn read_select_list(
    State(endpoints): State<AppState>,
    meta: RequestMeta,
    RequestParams(params): RequestParams,
) -> Result<Response, EndpointError> {
    let mut ctx = endpoints.context(meta, params, None);
    let result = read_records(&endpoints, &mut ctx, "ReadSelectList", Hooks::QueryOnly, |_| Ok(()))
        .await
        .map(|records| select_list(ctx.dal.entity(), &endpoints.behaviors, &records));
    finish(&endpoints, &mut ctx, "ReadSelectList", READS_FAILED, result.map(Payload::Records))
}
