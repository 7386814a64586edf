//! JSON-RPC 2.0 client for the hardware simulator.
//!
//! Every call is an HTTP POST of a JSON-RPC request to the simulator endpoint.
//! Calls made through one session carry the same `X-Session-Id` header and
//! increasing request ids.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use super::{SimulationService, SimulationSession, send_json};
use crate::error::{OrchestrationError, Result, Stage};
use crate::model::{ResetStatus, SimulatorState};

pub const SESSION_HEADER: &str = "X-Session-Id";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Clone)]
pub struct HttpSimulationService {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpSimulationService {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl SimulationService for HttpSimulationService {
    async fn open_session(&self) -> Result<Box<dyn SimulationSession>> {
        // No RPC here: an unreachable simulator surfaces as a transport error on Reset.
        let session = JsonRpcSession {
            client: self.client.clone(),
            url: self.url.clone(),
            timeout: self.timeout,
            session_id: Uuid::new_v4(),
            next_id: AtomicU64::new(1),
        };
        info!("Opened simulation session {} at {}", session.session_id, self.url);

        Ok(Box::new(session))
    }
}

pub(crate) struct JsonRpcSession {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    session_id: Uuid,
    next_id: AtomicU64,
}

impl JsonRpcSession {
    /// Invoke `method` with empty params and return its `result`.
    async fn call(&self, method: &str) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("Simulation RPC {method} (id {id})");

        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params: Value::Object(Default::default()),
        };

        let builder = self
            .client
            .post(&self.url)
            .header(SESSION_HEADER, self.session_id.to_string())
            .json(&request);
        let response: RpcResponse = send_json(builder, Stage::Simulation, self.timeout).await?;

        if let Some(err) = response.error {
            return Err(OrchestrationError::Rejected {
                stage: Stage::Simulation,
                message: format!("{method} failed with code {}: {}", err.code, err.message),
            });
        }

        Ok(response.result)
    }

    fn decode<T: serde::de::DeserializeOwned>(method: &str, value: Value) -> Result<T> {
        serde_json::from_value(value).map_err(|e| OrchestrationError::Decode {
            stage: Stage::Simulation,
            message: format!("{method}: {e}"),
        })
    }
}

#[async_trait]
impl SimulationSession for JsonRpcSession {
    async fn reset(&self) -> Result<ResetStatus> {
        let result = self.call("Reset").await?;
        Self::decode("Reset", result)
    }

    async fn query_state(&self) -> Result<SimulatorState> {
        let result = self.call("QueryState").await?;
        Self::decode("QueryState", result)
    }
}
