//! Route tables.

mod common;
mod endpoint;

pub use common::{common_routes, common_routes_with_ready};
pub use endpoint::{endpoint_routes, API_VERSION_PREFIX};

use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Largest request body accepted by [`app`].
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Endpoint routes for every scope behind a request body limit. Merge the common routes separately.
pub fn app(scopes: impl IntoIterator<Item = AppState>) -> Router {
    scopes
        .into_iter()
        .fold(Router::new(), |router, state| router.merge(endpoint_routes(state)))
        .layer(RequestBodyLimitLayer::new(DEFAULT_BODY_LIMIT))
}
