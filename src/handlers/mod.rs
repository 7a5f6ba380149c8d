//! axum handlers, one per endpoint operation.

mod common;
mod count;
mod create;
mod delete;
mod read;
mod reads;
mod schema;
mod update;

pub use count::{count, count_by};
pub use create::{create, upsert};
pub use delete::delete;
pub use read::read;
pub use reads::{read_distinct, read_lite, read_select_list, reads, reads_by};
pub use schema::{new, schema, validate};
pub use update::update;
