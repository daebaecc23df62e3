//! Dispatch a primitive and wait for it to finish.
//!
//! The status is polled at the configured interval until the primitive
//! completes, fails or the deadline passes. Waiting uses the runtime's timer,
//! so a run is cancelled by dropping its future.

use ns_core::{OperationHandle, PrimitiveParams, PrimitiveStatus};
use serde_json::Value;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::service::NetworkService;
use crate::state_machine::{PollState, PollStateMachine};

/// Outcome of [`NetworkService::run_primitive`].
#[derive(Debug, Clone)]
pub struct PrimitiveRun {
    pub handle: OperationHandle,
    /// `Completed`, `Failed` or `TimedOut`.
    pub state: PollState,
    /// Last status read from the controller, if any poll happened.
    pub status: Option<PrimitiveStatus>,
    /// Output fetched once the primitive finished; always `None` on timeout.
    pub output: Option<Value>,
    pub polls: u32,
    pub elapsed: Duration,
}

impl PrimitiveRun {
    pub fn timed_out(&self) -> bool {
        self.state == PollState::TimedOut
    }

    pub fn succeeded(&self) -> bool {
        self.state == PollState::Completed
    }
}

impl NetworkService {
    /// Dispatch `primitive` and poll until it finishes or `timeout` elapses.
    pub async fn run_primitive(
        &mut self,
        application: &str,
        primitive: &str,
        params: &PrimitiveParams,
        timeout: Duration,
    ) -> Result<PrimitiveRun> {
        let handle = self.execute_primitive(application, primitive, params).await?;

        let started = Instant::now();
        let deadline = started + timeout;
        let interval = self.config().poll_interval;

        let mut state = PollState::Dispatched;
        let mut status = None;
        let mut polls = 0u32;

        while Instant::now() < deadline {
            let current = self.get_primitive_status(&handle).await?;
            polls += 1;

            let next = PollState::from_status(current);
            PollStateMachine::validate_transition(&state, &next)?;
            state = next;
            status = Some(current);

            debug!(handle = %handle, status = %current, polls, "Polled primitive");

            if state.is_terminal() {
                break;
            }
            sleep(interval).await;
        }

        if !state.is_terminal() {
            PollStateMachine::validate_transition(&state, &PollState::TimedOut)?;
            state = PollState::TimedOut;
            warn!(
                handle = %handle,
                timeout_secs = timeout.as_secs(),
                polls,
                "Primitive did not finish before the deadline"
            );
        }

        let output = match state {
            PollState::Completed | PollState::Failed => {
                self.get_primitive_output(&handle).await?
            }
            _ => None,
        };

        info!(
            application = %application,
            primitive = %primitive,
            handle = %handle,
            state = %state,
            polls,
            "Primitive run finished"
        );

        Ok(PrimitiveRun {
            handle,
            state,
            status,
            output,
            polls,
            elapsed: started.elapsed(),
        })
    }

    /// Dispatch `primitive`, wait for it and return its output.
    ///
    /// `timeout` defaults to the configured timeout (600 seconds). A
    /// primitive that does not finish in time yields `None`, exactly like one
    /// that finished without output; use [`NetworkService::run_primitive`]
    /// to tell the two apart.
    pub async fn execute_primitive_get_output(
        &mut self,
        application: &str,
        primitive: &str,
        params: &PrimitiveParams,
        timeout: Option<Duration>,
    ) -> Result<Option<Value>> {
        let timeout = timeout.unwrap_or(self.config().timeout);
        let run = self
            .run_primitive(application, primitive, params, timeout)
            .await?;
        Ok(run.output)
    }
}
