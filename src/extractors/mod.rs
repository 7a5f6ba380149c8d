//! Request extractors.

mod params;
mod session;

pub use params::RequestParams;
pub use session::{
    HeaderSessionResolver, RequestMeta, SessionResolver, CUSTOMER_ID_HEADER, REQUEST_ID_HEADER,
    ROLE_INDEX_HEADER, SESSION_ID_HEADER, USER_ID_HEADER,
};
