//! Clients for the three collaborator services.
//!
//! Each collaborator sits behind a trait so the orchestrator can be driven by
//! in-process mocks in tests. The HTTP implementations share one pooled
//! `reqwest::Client` and map every failure onto [`OrchestrationError`] tagged
//! with the stage it happened in.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{OrchestrationError, Result, Stage};
use crate::model::{Dag, ResetStatus, Resources, ScheduleResponse, SimulatorState};

mod dsl;
mod scheduling;
mod simulation;

pub use dsl::HttpDslService;
pub use scheduling::HttpSchedulingService;
pub use simulation::{HttpSimulationService, SESSION_HEADER};

/// Compiles DSL source into a task graph.
#[async_trait]
pub trait DslService: Send + Sync {
    async fn parse(&self, dsl_text: &str) -> Result<Dag>;
}

/// Places the tasks of a graph onto the given resources.
#[async_trait]
pub trait SchedulingService: Send + Sync {
    async fn schedule(&self, dag: &Dag, resources: &Resources) -> Result<ScheduleResponse>;
}

/// Entry point to the hardware simulator.
#[async_trait]
pub trait SimulationService: Send + Sync {
    /// Open a session, failing if the simulator cannot be reached.
    async fn open_session(&self) -> Result<Box<dyn SimulationSession>>;
}

/// An open connection to the simulator.
#[async_trait]
pub trait SimulationSession: Send + Sync {
    async fn reset(&self) -> Result<ResetStatus>;
    async fn query_state(&self) -> Result<SimulatorState>;
}

/// Build the HTTP client shared by all collaborator clients.
pub fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("vemu-orchestrator/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// POST `body` as JSON and decode a JSON answer. Anything but 200 is an error.
pub(crate) async fn post_json<B, T>(
    client: &reqwest::Client,
    url: &str,
    body: &B,
    stage: Stage,
    timeout: Duration,
) -> Result<T>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    send_json(client.post(url).json(body), stage, timeout).await
}

/// Send a prepared request and decode its JSON answer.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    stage: Stage,
    timeout: Duration,
) -> Result<T> {
    let resp = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| OrchestrationError::from_reqwest(stage, timeout, e))?;

    let status = resp.status();
    if status != reqwest::StatusCode::OK {
        return Err(OrchestrationError::Status { stage, status });
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| OrchestrationError::from_reqwest(stage, timeout, e))?;

    serde_json::from_slice(&bytes).map_err(|e| OrchestrationError::Decode {
        stage,
        message: e.to_string(),
    })
}
