//! In-memory controller used by the service tests.

#![allow(dead_code)]

use async_trait::async_trait;
use juju::{Action, Application, ConnectParams, Controller, ControllerConnector, JujuError, Model};
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
pub struct FakeState {
    pub applications: HashMap<String, Application>,
    pub statuses: VecDeque<String>,
    pub output: Option<Value>,
    pub fail_connect: bool,

    pub connects: usize,
    pub controller_disconnects: usize,
    pub models_opened: usize,
    pub models_released: usize,
    pub dispatched: Vec<(String, String, Map<String, Value>)>,
    pub status_polls: usize,
    pub output_fetches: usize,
}

impl FakeState {
    fn known_action(&self, id: &str) -> bool {
        id.parse::<usize>()
            .map(|n| n >= 1 && n <= self.dispatched.len())
            .unwrap_or(false)
    }
}

/// Scripted controller. Statuses are handed out in order, the last one
/// repeating forever; with no script every action reports `running`.
#[derive(Clone, Default)]
pub struct FakeController {
    state: Arc<Mutex<FakeState>>,
}

impl FakeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_application(self, name: &str, units: &[&str]) -> Self {
        self.state().applications.insert(
            name.to_string(),
            Application {
                name: name.to_string(),
                status: Some("active".to_string()),
                units: units.iter().map(|u| u.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_statuses(self, statuses: &[&str]) -> Self {
        self.state().statuses = statuses.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_output(self, output: Value) -> Self {
        self.state().output = Some(output);
        self
    }

    pub fn failing_connect(self) -> Self {
        self.state().fail_connect = true;
        self
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn connector(&self) -> Arc<dyn ControllerConnector> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl ControllerConnector for FakeController {
    async fn connect(&self, _params: &ConnectParams) -> juju::Result<Box<dyn Controller>> {
        let mut state = self.state();
        if state.fail_connect {
            return Err(JujuError::Connection("connection refused".to_string()));
        }
        state.connects += 1;
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl Controller for FakeSession {
    async fn get_model(&self, name: &str) -> juju::Result<Box<dyn Model>> {
        self.state.lock().unwrap().models_opened += 1;
        Ok(Box::new(FakeModel {
            name: name.to_string(),
            state: Arc::clone(&self.state),
        }))
    }

    async fn disconnect(&self) -> juju::Result<()> {
        self.state.lock().unwrap().controller_disconnects += 1;
        Ok(())
    }
}

struct FakeModel {
    name: String,
    state: Arc<Mutex<FakeState>>,
}

fn not_found(id: &str) -> JujuError {
    JujuError::Rpc {
        facade: "Action".to_string(),
        request: "Actions".to_string(),
        code: "not found".to_string(),
        message: format!("action {} not found", id),
    }
}

#[async_trait]
impl Model for FakeModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn applications(&self) -> juju::Result<HashMap<String, Application>> {
        Ok(self.state.lock().unwrap().applications.clone())
    }

    async fn run_action(
        &self,
        unit: &str,
        action: &str,
        params: &Map<String, Value>,
    ) -> juju::Result<Action> {
        let mut state = self.state.lock().unwrap();
        state
            .dispatched
            .push((unit.to_string(), action.to_string(), params.clone()));
        Ok(Action {
            id: state.dispatched.len().to_string(),
            status: "pending".to_string(),
        })
    }

    async fn get_action_status(&self, id: &str) -> juju::Result<HashMap<String, String>> {
        let mut state = self.state.lock().unwrap();
        if !state.known_action(id) {
            return Err(not_found(id));
        }
        state.status_polls += 1;

        let status = if state.statuses.len() > 1 {
            state.statuses.pop_front()
        } else {
            state.statuses.front().cloned()
        }
        .unwrap_or_else(|| "running".to_string());

        Ok(HashMap::from([(id.to_string(), status)]))
    }

    async fn get_action_output(&self, id: &str) -> juju::Result<Option<Value>> {
        let mut state = self.state.lock().unwrap();
        if !state.known_action(id) {
            return Err(not_found(id));
        }
        state.output_fetches += 1;
        Ok(state.output.clone())
    }

    async fn disconnect(&self) -> juju::Result<()> {
        self.state.lock().unwrap().models_released += 1;
        Ok(())
    }
}
