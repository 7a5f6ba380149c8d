//! Endpoint SDK: CRUD REST endpoints bound to a data access layer, with named behavior hooks
//! and table-driven authorizers.

pub mod authorizer;
pub mod behavior;
pub mod config;
pub mod context;
pub mod dal;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use authorizer::{Authorizer, AuthorizerRegistry};
pub use behavior::{Behavior, BehaviorRegistry};
pub use config::{
    load_from_path, load_from_str, resolve, AuthorizationMode, EntityConfig, ResolvedEntity, Settings,
};
pub use context::{RequestContext, UserSession};
pub use dal::{Dal, MemoryDal, PgDal, Query};
pub use error::{AppError, ConfigError, DalError, EndpointError, UNAUTHORIZED_MESSAGE};
pub use extractors::{HeaderSessionResolver, SessionResolver};
pub use routes::{app, common_routes, common_routes_with_ready, endpoint_routes};
pub use state::{AppState, Endpoints};
