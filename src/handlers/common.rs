//! Stages shared by every endpoint: endpoint authorization, query building, the unauthorized
//! short-circuit, and the final log-and-respond step.

use crate::context::RequestContext;
use crate::dal::{parse_filter, Connector, Filter, FilterOperator};
use crate::error::{AppError, EndpointError};
use crate::response::Payload;
use crate::state::Endpoints;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

/// Require a logged-in session whose role index meets the operation's level. Level 0 or below is public.
pub(crate) fn authorize_endpoint(endpoints: &Endpoints, ctx: &mut RequestContext, operation: &str) -> Result<(), AppError> {
    let level = endpoints.settings.endpoint_level(operation);
    ctx.required_level = level;
    if level <= 0 {
        return Ok(());
    }
    if !ctx.session.logged_in {
        return Err(AppError::Unauthenticated(
            "You must be appropriately authenticated to access this resource.".into(),
        ));
    }
    if ctx.session.role_index < level {
        return Err(AppError::Unauthenticated(
            "You are not authorized to access this endpoint.".into(),
        ));
    }
    Ok(())
}

/// Abort with the fixed 405 once anything has denied the request.
pub(crate) fn ensure_authorized(ctx: &RequestContext) -> Result<(), AppError> {
    if ctx.is_authorized() {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

/// Leading integer of a string or number, the way lenient URL parameters are read.
pub(crate) fn parse_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim_start();
            let end = s
                .char_indices()
                .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
                .last()
                .map(|(i, c)| i + c.len_utf8())?;
            s[..end].parse().ok()
        }
        _ => None,
    }
}

/// A record identifier: an integer or a string holding only an integer.
pub(crate) fn as_identifier(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `Begin` and `Cap` from the parameters; a missing, zero or unreadable cap uses `default_cap`.
pub(crate) fn apply_paging(ctx: &mut RequestContext, default_cap: u64) {
    let begin = ctx
        .param("Begin")
        .and_then(parse_int)
        .and_then(|b| u64::try_from(b).ok());
    let cap = ctx
        .param("Cap")
        .and_then(parse_int)
        .and_then(|c| u64::try_from(c).ok())
        .filter(|c| *c > 0)
        .unwrap_or(default_cap);
    ctx.query.set_cap(Some(cap)).set_begin(begin);
}

/// Apply the `Filter` parameter: a filter expression, or a JSON array of pre-built filters.
pub(crate) fn apply_filter(ctx: &mut RequestContext) -> Result<(), AppError> {
    let Some(filter) = ctx.param("Filter").cloned() else {
        return Ok(());
    };
    match filter {
        Value::String(s) if s.trim_start().starts_with('[') => {
            let filters: Vec<Filter> =
                serde_json::from_str(&s).map_err(|e| AppError::BadRequest(format!("invalid filter list: {}", e)))?;
            ctx.query.set_filter(filters);
        }
        Value::String(s) => {
            parse_filter(&s, &mut ctx.query).map_err(|e| AppError::BadRequest(e.to_string()))?;
        }
        Value::Array(_) => {
            let filters: Vec<Filter> =
                serde_json::from_value(filter).map_err(|e| AppError::BadRequest(format!("invalid filter list: {}", e)))?;
            ctx.query.set_filter(filters);
        }
        _ => {}
    }
    Ok(())
}

fn add_by_field(ctx: &mut RequestContext, field: &str, value: Value) -> Result<(), AppError> {
    if !ctx.dal.entity().has_column(field) {
        return Err(AppError::BadRequest(format!("Unknown field to filter by: {}", field)));
    }
    let operator = if value.is_array() {
        FilterOperator::In
    } else {
        FilterOperator::Eq
    };
    ctx.query.add_filter(field, value, operator, Connector::And, field);
    Ok(())
}

/// Filter on `ByField`/`ByValue`, or on every `{ByField, ByValue}` pair in a `Filters` list.
pub(crate) fn apply_by_fields(ctx: &mut RequestContext) -> Result<(), AppError> {
    let filters = match ctx.param("Filters").cloned() {
        Some(Value::String(s)) => Some(
            serde_json::from_str::<Value>(&s).map_err(|e| AppError::BadRequest(format!("invalid Filters: {}", e)))?,
        ),
        other => other,
    };
    if let Some(Value::Array(pairs)) = filters {
        for pair in pairs {
            let field = pair.get("ByField").and_then(Value::as_str).unwrap_or_default().to_string();
            let value = pair.get("ByValue").cloned().unwrap_or(Value::Null);
            add_by_field(ctx, &field, value)?;
        }
        return Ok(());
    }
    match (ctx.param_str("ByField").map(str::to_string), ctx.param("ByValue").cloned()) {
        (Some(field), Some(value)) => add_by_field(ctx, &field, value),
        _ => Err(AppError::BadRequest("A field and a value to filter by must be provided.".into())),
    }
}

/// Filter on the default identifier when `raw` is an integer, otherwise on the GUID column.
pub(crate) fn filter_by_identifier(ctx: &mut RequestContext, raw: &Value, missing: &str) -> Result<(), AppError> {
    let id_col = ctx.dal.default_identifier().to_string();
    if let Some(id) = as_identifier(raw).filter(|id| *id > 0) {
        ctx.query
            .add_filter(&id_col, Value::from(id), FilterOperator::Eq, Connector::And, &id_col);
        return Ok(());
    }
    let guid = raw.as_str().map(str::trim).filter(|s| !s.is_empty());
    match (ctx.dal.default_guid_identifier().map(str::to_string), guid) {
        (Some(guid_col), Some(guid)) => {
            ctx.query
                .add_filter(&guid_col, Value::String(guid.to_string()), FilterOperator::Eq, Connector::And, &guid_col);
            Ok(())
        }
        _ => Err(AppError::BadRequest(missing.to_string())),
    }
}

/// Log the outcome and produce exactly one response. Record references are dropped either way.
pub(crate) fn finish(
    endpoints: &Endpoints,
    ctx: &mut RequestContext,
    operation: &str,
    failure: &'static str,
    result: Result<Payload, AppError>,
) -> Result<Response, EndpointError> {
    let action = format!("{}-{}", endpoints.scope(), operation);
    ctx.clear_records();
    match result {
        Ok(payload) => {
            tracing::info!(
                session_id = %ctx.session.session_id,
                request_id = %ctx.request_id,
                url = %ctx.url,
                action = %action,
                count = payload.len(),
                "endpoint completed"
            );
            Ok(payload.into_response())
        }
        Err(error) => {
            match &error {
                AppError::Dal(_) | AppError::Config(_) | AppError::Hook(_) => tracing::error!(
                    session_id = %ctx.session.session_id,
                    request_id = %ctx.request_id,
                    url = %ctx.url,
                    action = %action,
                    error = %error,
                    "{}", failure
                ),
                _ => tracing::warn!(
                    session_id = %ctx.session.session_id,
                    request_id = %ctx.request_id,
                    url = %ctx.url,
                    action = %action,
                    error = %error,
                    "{}", failure
                ),
            }
            Err(EndpointError::new(failure, error))
        }
    }
}
