//! CrudService: generic CRUD over the store, with request validation.

mod crud;
pub mod validation;
pub use crud::{to_api, CrudService};
pub use validation::RequestValidator;
