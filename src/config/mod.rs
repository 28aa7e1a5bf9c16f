pub mod types;
pub mod catalog;
pub mod loader;
pub mod validator;
pub mod resolved;

pub use types::*;
pub use catalog::catalog;
pub use loader::*;
pub use validator::*;
pub use resolved::*;
