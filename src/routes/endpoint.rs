//! Route table for one entity scope, mounted under `/1.0`.
//!
//! For scope `Book`: `/1.0/Book` (create, update, delete), `/1.0/Book/:IDRecord`,
//! `/1.0/Books/...` (lists and counts) and `/1.0/BookSelect/...`.

use crate::handlers::{
    count, count_by, create, delete, new, read, read_distinct, read_lite, read_select_list, reads, reads_by, schema,
    update, upsert, validate,
};
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub const API_VERSION_PREFIX: &str = "/1.0";

/// Every endpoint for the state's scope, nested under [`API_VERSION_PREFIX`].
pub fn endpoint_routes(state: AppState) -> Router {
    let scope = state.scope().to_string();
    let one = format!("/{}", scope);
    let many = format!("/{}s", scope);
    let select = format!("/{}Select", scope);

    let routes = Router::new()
        .route(&one, post(create).put(update).delete(delete))
        .route(&format!("{one}/Upsert"), put(upsert))
        .route(&format!("{one}/Schema"), get(schema))
        .route(&format!("{one}/Schema/New"), get(new))
        .route(&format!("{one}/Schema/Validate"), post(validate))
        .route(&format!("{one}/:IDRecord"), get(read).delete(delete))
        .route(&many, get(reads))
        .route(&format!("{many}/:Begin/:Cap"), get(reads))
        .route(&format!("{many}/FilteredTo/:Filter"), get(reads))
        .route(&format!("{many}/FilteredTo/:Filter/:Begin/:Cap"), get(reads))
        .route(&format!("{many}/By/:ByField/:ByValue"), get(reads_by))
        .route(&format!("{many}/By/:ByField/:ByValue/:Begin/:Cap"), get(reads_by))
        .route(&format!("{many}/Lite"), get(read_lite))
        .route(&format!("{many}/Lite/:Begin/:Cap"), get(read_lite))
        .route(&format!("{many}/Lite/FilteredTo/:Filter"), get(read_lite))
        .route(&format!("{many}/Lite/FilteredTo/:Filter/:Begin/:Cap"), get(read_lite))
        .route(&format!("{many}/Distinct/:Columns"), get(read_distinct))
        .route(&format!("{many}/Distinct/:Columns/:Begin/:Cap"), get(read_distinct))
        .route(&format!("{many}/Distinct/:Columns/FilteredTo/:Filter"), get(read_distinct))
        .route(&format!("{many}/Distinct/:Columns/FilteredTo/:Filter/:Begin/:Cap"), get(read_distinct))
        .route(&format!("{many}/Count"), get(count))
        .route(&format!("{many}/Count/FilteredTo/:Filter"), get(count))
        .route(&format!("{many}/Count/By/:ByField/:ByValue"), get(count_by))
        .route(&select, get(read_select_list))
        .route(&format!("{select}/:Begin/:Cap"), get(read_select_list))
        .route(&format!("{select}/FilteredTo/:Filter"), get(read_select_list))
        .route(&format!("{select}/FilteredTo/:Filter/:Begin/:Cap"), get(read_select_list))
        .with_state(state);

    Router::new().nest(API_VERSION_PREFIX, routes)
}
