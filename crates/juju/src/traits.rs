use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::Result;
use crate::types::{Action, Application, ConnectParams};

/// Opens controller sessions.
#[async_trait]
pub trait ControllerConnector: Send + Sync {
    async fn connect(&self, params: &ConnectParams) -> Result<Box<dyn Controller>>;
}

/// An authenticated session to a controller.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Open a connection to the model called `name`.
    async fn get_model(&self, name: &str) -> Result<Box<dyn Model>>;

    async fn disconnect(&self) -> Result<()>;
}

/// A connection to a single model.
#[async_trait]
pub trait Model: Send + Sync {
    fn name(&self) -> &str;

    /// Applications deployed in the model, keyed by name.
    async fn applications(&self) -> Result<HashMap<String, Application>>;

    /// Enqueue `action` on `unit`. Returns once the controller has assigned
    /// the action an id, not when it finishes.
    async fn run_action(
        &self,
        unit: &str,
        action: &str,
        params: &Map<String, Value>,
    ) -> Result<Action>;

    /// Status of the action `id`, keyed by action id.
    async fn get_action_status(&self, id: &str) -> Result<HashMap<String, String>>;

    /// Output recorded for the action `id`, if it produced any yet.
    async fn get_action_output(&self, id: &str) -> Result<Option<Value>>;

    async fn disconnect(&self) -> Result<()>;
}
