//! Wire types exchanged with the client and the collaborator services.
//!
//! Field names follow each contract exactly: the DSL service speaks
//! snake_case, the scheduling service and the client boundary camelCase.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::{AppPackageId, NodeId, TaskId};

// --- Client boundary ---

/// Request body of `POST /api/v1/simulations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    pub app_package_id: AppPackageId,
}

impl SimulationRequest {
    pub fn new(app_package_id: impl Into<AppPackageId>) -> Self {
        Self {
            app_package_id: app_package_id.into(),
        }
    }
}

/// Aggregated result returned to the client.
///
/// `schedule` is the scheduling service's response, decoded and re-encoded.
/// Fields outside the known task record are not carried over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResponse {
    pub schedule: ScheduleResponse,
    pub simulation_status: String,
    pub initial_cycle: u64,
    pub message: String,
}

// --- DSL service ---

#[derive(Debug, Clone, Serialize)]
pub struct DslRequest<'a> {
    pub dsl_text: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DslResponse {
    pub dag: Dag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagNode {
    pub id: NodeId,
    pub name: String,
    pub source_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagEdge {
    pub from_node: NodeId,
    pub to_node: NodeId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data_size: i64,
}

/// Task graph produced by the DSL service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dag {
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<DagNode>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub edges: Vec<DagEdge>,
}

// --- Scheduling service ---

/// A processing core the scheduler may place tasks on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Core {
    pub id: i64,
    #[serde(rename = "type")]
    pub core_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    pub cores: Vec<Core>,
    pub memory_size_kb: u64,
}

impl Default for Resources {
    /// A single RISC-V core with 8 MiB of memory.
    fn default() -> Self {
        Self {
            cores: vec![Core {
                id: 0,
                core_type: "riscv_core".to_string(),
            }],
            memory_size_kb: 8192,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulingRequest<'a> {
    pub dag: &'a Dag,
    pub resources: &'a Resources,
}

/// One placement in the schedule. `inputs` and `outputs` are opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub task_id: TaskId,
    pub core_id: i64,
    pub start_cycle: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inputs: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub outputs: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub schedule: Vec<ScheduledTask>,
}

// --- Simulation service ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetStatus {
    pub ok: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorState {
    #[serde(default, deserialize_with = "null_as_default")]
    pub cycle: u64,
}

/// Collaborators written against nil-able slices send `null` for "none".
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
