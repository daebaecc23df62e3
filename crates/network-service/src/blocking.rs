//! Synchronous facade for callers without an async runtime.

use juju::{ControllerConnector, JujuConnector};
use ns_core::{OperationHandle, PrimitiveParams, PrimitiveStatus};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::warn;

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::runner::PrimitiveRun;
use crate::service::NetworkService;

/// [`NetworkService`] driven by its own single-threaded runtime.
///
/// Each call parks the calling thread until the controller answers;
/// [`BlockingNetworkService::execute_primitive_get_output`] parks it for the
/// whole poll loop. Must not be used from inside an async context.
pub struct BlockingNetworkService {
    runtime: Runtime,
    inner: NetworkService,
}

impl BlockingNetworkService {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        Self::with_connector(config, Arc::new(JujuConnector::new()))
    }

    pub fn with_connector(
        config: ServiceConfig,
        connector: Arc<dyn ControllerConnector>,
    ) -> Result<Self> {
        Ok(Self {
            runtime: build_runtime()?,
            inner: NetworkService::with_connector(config, connector),
        })
    }

    /// See [`ServiceConfig::from_env`].
    pub fn from_env(username: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        let runtime = build_runtime()?;
        let config = runtime.block_on(ServiceConfig::from_env(username, secret))?;

        Ok(Self {
            runtime,
            inner: NetworkService::new(config),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        self.inner.config()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    pub fn login(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.login())
    }

    pub fn logout(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.logout())
    }

    pub fn application_name(&self, member_index: &str, unit_id: Option<&str>) -> Result<String> {
        self.inner.application_name(member_index, unit_id)
    }

    pub fn execute_primitive(
        &mut self,
        application: &str,
        primitive: &str,
        params: &PrimitiveParams,
    ) -> Result<OperationHandle> {
        self.runtime
            .block_on(self.inner.execute_primitive(application, primitive, params))
    }

    pub fn get_primitive_status(&mut self, handle: &OperationHandle) -> Result<PrimitiveStatus> {
        self.runtime.block_on(self.inner.get_primitive_status(handle))
    }

    pub fn get_primitive_output(&mut self, handle: &OperationHandle) -> Result<Option<Value>> {
        self.runtime.block_on(self.inner.get_primitive_output(handle))
    }

    pub fn execute_primitive_get_output(
        &mut self,
        application: &str,
        primitive: &str,
        params: &PrimitiveParams,
        timeout: Option<Duration>,
    ) -> Result<Option<Value>> {
        self.runtime.block_on(
            self.inner
                .execute_primitive_get_output(application, primitive, params, timeout),
        )
    }

    pub fn run_primitive(
        &mut self,
        application: &str,
        primitive: &str,
        params: &PrimitiveParams,
        timeout: Duration,
    ) -> Result<PrimitiveRun> {
        self.runtime
            .block_on(self.inner.run_primitive(application, primitive, params, timeout))
    }

    pub fn get_applications(&mut self) -> Result<Vec<String>> {
        self.runtime.block_on(self.inner.get_applications())
    }

    pub fn get_application_status(&mut self, application: &str) -> Result<String> {
        self.runtime
            .block_on(self.inner.get_application_status(application))
    }
}

impl Drop for BlockingNetworkService {
    fn drop(&mut self) {
        if !self.inner.is_connected() {
            return;
        }
        if let Err(e) = self.runtime.block_on(self.inner.logout()) {
            warn!(error = %e, "Logout failed while dropping service");
        }
    }
}

fn build_runtime() -> Result<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}
