pub mod domain;
pub mod error;

pub use domain::naming::{application_name, format_name, service_name};
pub use domain::primitive::{validate_params, OperationHandle, PrimitiveParams, PrimitiveStatus};
pub use error::{CoreError, Result};
