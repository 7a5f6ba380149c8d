//! Record services shared by the endpoint handlers.

mod validation;
pub use validation::RecordValidator;
