use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{JujuError, Result};
use crate::rpc::RpcConnection;
use crate::traits::{Controller, ControllerConnector, Model};
use crate::types::{
    action_id, action_tag, unit_tag, Action, ActionResult, ActionResults, ActionSpec,
    ActionSpecs, Application, ConnectParams, Entities, Entity, FullStatus, UserModelList,
};

const MODEL_MANAGER_FACADE_VERSION: u32 = 5;
const CLIENT_FACADE_VERSION: u32 = 2;
const ACTION_FACADE_VERSION: u32 = 6;

/// Connects to controllers over the websocket JSON-RPC API.
#[derive(Debug, Clone, Default)]
pub struct JujuConnector;

impl JujuConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ControllerConnector for JujuConnector {
    async fn connect(&self, params: &ConnectParams) -> Result<Box<dyn Controller>> {
        let url = format!("wss://{}/api", params.address());
        let rpc = RpcConnection::open(url, params).await?;

        info!(address = %params.address(), user = %params.username, "Connected to controller");

        Ok(Box::new(JujuController {
            params: params.clone(),
            rpc: Mutex::new(rpc),
        }))
    }
}

pub struct JujuController {
    params: ConnectParams,
    rpc: Mutex<RpcConnection>,
}

impl JujuController {
    async fn model_uuid(&self, name: &str) -> Result<String> {
        let list: UserModelList = self
            .rpc
            .lock()
            .await
            .call(
                "ModelManager",
                MODEL_MANAGER_FACADE_VERSION,
                "ListModels",
                &json!({ "tag": self.params.user_tag() }),
            )
            .await?;

        list.user_models
            .into_iter()
            .find(|entry| entry.model.name == name)
            .map(|entry| entry.model.uuid)
            .ok_or_else(|| JujuError::ModelNotFound(name.to_string()))
    }
}

#[async_trait]
impl Controller for JujuController {
    async fn get_model(&self, name: &str) -> Result<Box<dyn Model>> {
        let uuid = self.model_uuid(name).await?;
        let url = format!("wss://{}/model/{}/api", self.params.address(), uuid);
        let rpc = RpcConnection::open(url, &self.params).await?;

        debug!(model = %name, uuid = %uuid, "Model connection opened");

        Ok(Box::new(JujuModel {
            name: name.to_string(),
            rpc: Mutex::new(rpc),
        }))
    }

    async fn disconnect(&self) -> Result<()> {
        self.rpc.lock().await.close().await
    }
}

pub struct JujuModel {
    name: String,
    rpc: Mutex<RpcConnection>,
}

impl JujuModel {
    async fn action_result(&self, id: &str) -> Result<ActionResult> {
        let request = Entities {
            entities: vec![Entity {
                tag: action_tag(id),
            }],
        };
        let results: ActionResults = self
            .rpc
            .lock()
            .await
            .call("Action", ACTION_FACADE_VERSION, "Actions", &request)
            .await?;

        let result = single_result(results, "Actions")?;
        if let Some(error) = &result.error {
            return Err(JujuError::Rpc {
                facade: "Action".to_string(),
                request: "Actions".to_string(),
                code: error.code.clone().unwrap_or_default(),
                message: error.message.clone(),
            });
        }
        Ok(result)
    }
}

#[async_trait]
impl Model for JujuModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn applications(&self) -> Result<HashMap<String, Application>> {
        let status: FullStatus = self
            .rpc
            .lock()
            .await
            .call(
                "Client",
                CLIENT_FACADE_VERSION,
                "FullStatus",
                &json!({ "patterns": [] }),
            )
            .await?;

        Ok(status.into_applications())
    }

    async fn run_action(
        &self,
        unit: &str,
        action: &str,
        params: &Map<String, Value>,
    ) -> Result<Action> {
        let request = ActionSpecs {
            actions: vec![ActionSpec {
                receiver: unit_tag(unit),
                name: action.to_string(),
                parameters: params.clone(),
            }],
        };
        let results: ActionResults = self
            .rpc
            .lock()
            .await
            .call("Action", ACTION_FACADE_VERSION, "Enqueue", &request)
            .await?;

        let result = single_result(results, "Enqueue")?;
        if let Some(error) = result.error {
            return Err(JujuError::Rpc {
                facade: "Action".to_string(),
                request: "Enqueue".to_string(),
                code: error.code.unwrap_or_default(),
                message: error.message,
            });
        }

        let tag = result.action.map(|info| info.tag).ok_or_else(|| {
            JujuError::InvalidResponse("Enqueue returned no action".to_string())
        })?;

        Ok(Action {
            id: action_id(&tag).to_string(),
            status: result.status.unwrap_or_else(|| "pending".to_string()),
        })
    }

    async fn get_action_status(&self, id: &str) -> Result<HashMap<String, String>> {
        let result = self.action_result(id).await?;
        let status = result.status.ok_or_else(|| {
            JujuError::InvalidResponse(format!("action {} has no status", id))
        })?;

        Ok(HashMap::from([(id.to_string(), status)]))
    }

    async fn get_action_output(&self, id: &str) -> Result<Option<Value>> {
        let result = self.action_result(id).await?;
        Ok(result.output.filter(|output| !output.is_null()))
    }

    async fn disconnect(&self) -> Result<()> {
        self.rpc.lock().await.close().await
    }
}

fn single_result(results: ActionResults, request: &str) -> Result<ActionResult> {
    let count = results.results.len();
    match results.results.into_iter().next() {
        Some(result) if count == 1 => Ok(result),
        _ => Err(JujuError::InvalidResponse(format!(
            "{} returned {} results, expected 1",
            request, count
        ))),
    }
}
