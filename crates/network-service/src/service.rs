//! Primitive dispatch and status/output queries.

use juju::{ControllerConnector, JujuConnector, JujuError, Model};
use ns_core::{validate_params, OperationHandle, PrimitiveParams, PrimitiveStatus};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::connection::ConnectionManager;
use crate::error::{NsError, Result};
use crate::resources::ModelGuard;

/// Client that lets a network service charm run primitives on the VNF
/// applications deployed in its model.
///
/// Every operation takes `&mut self`: one instance issues one controller
/// call at a time. Use separate instances for concurrent work.
pub struct NetworkService {
    connection: ConnectionManager,
}

impl NetworkService {
    /// Service talking to a real controller.
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_connector(config, Arc::new(JujuConnector::new()))
    }

    pub fn with_connector(config: ServiceConfig, connector: Arc<dyn ControllerConnector>) -> Self {
        Self {
            connection: ConnectionManager::new(config, connector),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        self.connection.config()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Connect to the controller. Does nothing when already connected.
    pub async fn login(&mut self) -> Result<()> {
        self.connection.login().await.map(|_| ())
    }

    pub async fn logout(&mut self) -> Result<()> {
        self.connection.logout().await
    }

    /// Name of the application deployed for VNF `member_index` (and
    /// optionally VDU `unit_id`) of the network service this unit belongs to.
    pub fn application_name(&self, member_index: &str, unit_id: Option<&str>) -> Result<String> {
        let unit_name = self
            .config()
            .unit_name
            .as_deref()
            .ok_or_else(|| NsError::configuration("unit name is not configured"))?;

        Ok(ns_core::application_name(unit_name, member_index, unit_id)?)
    }

    async fn acquire_model(&mut self) -> Result<ModelGuard> {
        let model_name = self.config().model_name.clone();
        let controller = self.connection.login().await?;
        ModelGuard::acquire(controller, &model_name).await
    }

    /// Dispatch `primitive` to the first unit of `application`.
    ///
    /// Returns as soon as the controller has queued the primitive; use the
    /// handle to follow its progress.
    pub async fn execute_primitive(
        &mut self,
        application: &str,
        primitive: &str,
        params: &PrimitiveParams,
    ) -> Result<OperationHandle> {
        if application.trim().is_empty() {
            return Err(NsError::InvalidArgument(
                "application name must not be empty".to_string(),
            ));
        }
        if primitive.trim().is_empty() {
            return Err(NsError::InvalidArgument(
                "primitive name must not be empty".to_string(),
            ));
        }
        validate_params(params)?;

        let guard = self.acquire_model().await?;
        let result = dispatch(guard.model(), application, primitive, params).await;
        guard.release().await;
        let handle = result?;

        info!(
            application = %application,
            primitive = %primitive,
            handle = %handle,
            "Executing primitive"
        );
        Ok(handle)
    }

    /// Current status of a dispatched primitive. Never cached.
    pub async fn get_primitive_status(
        &mut self,
        handle: &OperationHandle,
    ) -> Result<PrimitiveStatus> {
        let guard = self.acquire_model().await?;
        let result = guard.model().get_action_status(handle.as_str()).await;
        guard.release().await;

        let statuses = result.map_err(|e| operation_error(handle, e))?;
        let raw = statuses
            .get(handle.as_str())
            .ok_or_else(|| NsError::OperationNotFound(handle.to_string()))?;

        let status = normalize_status(raw)?;
        debug!(handle = %handle, status = %status, "Primitive status");
        Ok(status)
    }

    /// Output of a dispatched primitive, `None` while it has produced none.
    pub async fn get_primitive_output(
        &mut self,
        handle: &OperationHandle,
    ) -> Result<Option<Value>> {
        let guard = self.acquire_model().await?;
        let result = guard.model().get_action_output(handle.as_str()).await;
        guard.release().await;

        result.map_err(|e| operation_error(handle, e))
    }

    /// Names of the applications deployed in the model, sorted.
    pub async fn get_applications(&mut self) -> Result<Vec<String>> {
        let guard = self.acquire_model().await?;
        let result = guard.model().applications().await;
        guard.release().await;

        let mut names: Vec<String> = result?.into_keys().collect();
        names.sort();
        Ok(names)
    }

    /// Workload status of `application` (`"unknown"` when none is reported).
    pub async fn get_application_status(&mut self, application: &str) -> Result<String> {
        let guard = self.acquire_model().await?;
        let result = guard.model().applications().await;
        guard.release().await;

        let applications = result?;
        let app = applications
            .get(application)
            .ok_or_else(|| NsError::ApplicationNotFound(application.to_string()))?;

        Ok(app.status.clone().unwrap_or_else(|| "unknown".to_string()))
    }
}

async fn dispatch(
    model: &dyn Model,
    application: &str,
    primitive: &str,
    params: &PrimitiveParams,
) -> Result<OperationHandle> {
    let applications = model.applications().await?;
    let app = applications
        .get(application)
        .ok_or_else(|| NsError::ApplicationNotFound(application.to_string()))?;
    let unit = app
        .first_unit()
        .ok_or_else(|| NsError::NoUnits(application.to_string()))?;

    debug!(unit = %unit, primitive = %primitive, "Dispatching primitive");
    let action = model.run_action(unit, primitive, params).await?;

    Ok(OperationHandle::new(action.id))
}

fn operation_error(handle: &OperationHandle, error: JujuError) -> NsError {
    if error.is_not_found() {
        NsError::OperationNotFound(handle.to_string())
    } else {
        NsError::Controller(error)
    }
}

/// Map controller action statuses onto [`PrimitiveStatus`].
///
/// Cancelled, aborted and errored actions are finished and count as failed;
/// an action being aborted is still running.
fn normalize_status(raw: &str) -> Result<PrimitiveStatus> {
    if let Some(status) = PrimitiveStatus::parse(raw) {
        return Ok(status);
    }

    match raw {
        "cancelled" | "aborted" | "error" => Ok(PrimitiveStatus::Failed),
        "aborting" => Ok(PrimitiveStatus::Running),
        other => Err(NsError::Controller(JujuError::InvalidResponse(format!(
            "unknown primitive status '{}'",
            other
        )))),
    }
}
