pub mod error;
pub mod pointer;
pub mod validator;

pub use error::{SchemaError, Violation};
pub use validator::{Schema, Validation};
