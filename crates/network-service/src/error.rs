use juju::JujuError;
use ns_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NsError {
    #[error("Controller connection failed: {0}")]
    Connection(String),

    #[error("Application not found: {0}")]
    ApplicationNotFound(String),

    #[error("Application has no units: {0}")]
    NoUnits(String),

    #[error("Primitive not found: {0}")]
    OperationNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid poll transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Controller error: {0}")]
    Controller(#[from] JujuError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl NsError {
    /// Unknown application, an application without units, or an unknown
    /// primitive handle.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ApplicationNotFound(_) | Self::NoUnits(_) | Self::OperationNotFound(_)
        )
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }
}

impl From<CoreError> for NsError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::InvalidArgument(reason) => Self::InvalidArgument(reason),
        }
    }
}

pub type Result<T> = std::result::Result<T, NsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_kinds() {
        assert!(NsError::ApplicationNotFound("vnf".to_string()).is_not_found());
        assert!(NsError::NoUnits("vnf".to_string()).is_not_found());
        assert!(NsError::OperationNotFound("7".to_string()).is_not_found());
        assert!(!NsError::InvalidArgument("x".to_string()).is_not_found());
    }

    #[test]
    fn test_core_error_maps_to_invalid_argument() {
        let error: NsError = CoreError::InvalidArgument("member index".to_string()).into();
        assert!(matches!(error, NsError::InvalidArgument(reason) if reason == "member index"));
    }
}
