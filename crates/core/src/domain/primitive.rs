use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{CoreError, Result};

/// Parameters passed to a primitive, keyed by parameter name.
pub type PrimitiveParams = Map<String, Value>;

/// Identifier the controller assigned to a dispatched primitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationHandle(String);

impl OperationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OperationHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for OperationHandle {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl PrimitiveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Completed and failed primitives never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for PrimitiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reject parameter values the controller cannot pass to a primitive.
///
/// Primitive parameters are flat: strings, numbers, booleans and null are
/// accepted, nested arrays and objects are not.
pub fn validate_params(params: &PrimitiveParams) -> Result<()> {
    for (key, value) in params {
        if key.is_empty() {
            return Err(CoreError::InvalidArgument(
                "primitive parameter names must not be empty".to_string(),
            ));
        }
        if value.is_array() || value.is_object() {
            return Err(CoreError::InvalidArgument(format!(
                "primitive parameter '{}' must be a scalar value",
                key
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_round_trip_names() {
        for status in [
            PrimitiveStatus::Pending,
            PrimitiveStatus::Running,
            PrimitiveStatus::Completed,
            PrimitiveStatus::Failed,
        ] {
            assert_eq!(PrimitiveStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PrimitiveStatus::parse("cancelled"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!PrimitiveStatus::Pending.is_terminal());
        assert!(!PrimitiveStatus::Running.is_terminal());
        assert!(PrimitiveStatus::Completed.is_terminal());
        assert!(PrimitiveStatus::Failed.is_terminal());
    }

    #[test]
    fn test_handle_serializes_as_plain_string() {
        let handle = OperationHandle::new("6b1b0f3c");
        assert_eq!(serde_json::to_value(&handle).unwrap(), json!("6b1b0f3c"));
        assert_eq!(handle.to_string(), "6b1b0f3c");
    }

    #[test]
    fn test_validate_params() {
        let ok = json!({"ssh-hostname": "10.0.0.1", "count": 3, "force": true, "note": null});
        assert!(validate_params(ok.as_object().unwrap()).is_ok());

        let nested = json!({"hosts": ["a", "b"]});
        assert!(matches!(
            validate_params(nested.as_object().unwrap()),
            Err(CoreError::InvalidArgument(_))
        ));

        let mut empty_key = PrimitiveParams::new();
        empty_key.insert(String::new(), json!("x"));
        assert!(validate_params(&empty_key).is_err());
    }
}
