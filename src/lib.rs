// Core modules
mod catalog;
mod config;
mod error;
mod model;
mod types;

pub mod api;
pub mod collaborators;
mod orchestrator;

// Re-export key types and functions
pub use catalog::{AppPackage, AppPackageCatalog, DEFAULT_DSL_TEXT};
pub use config::{ConfigOverrides, OrchestratorConfig, PackageConfig, resolve_config_path};
pub use error::{OrchestrationError, Stage};
pub use model::{
    Core, Dag, DagEdge, DagNode, ResetStatus, Resources, ScheduleResponse, ScheduledTask,
    SimulationRequest, SimulationResponse, SimulatorState,
};
pub use orchestrator::{COMPLETION_MESSAGE, Orchestrator, SIMULATION_STATUS};
pub use types::{AppPackageId, NodeId, TaskId};

use std::sync::Arc;

/// Convenience function to build the HTTP application for a configuration.
///
/// This wires the HTTP collaborator clients into an `Orchestrator` and mounts
/// it on the public router.
pub fn create_app(config: &OrchestratorConfig) -> anyhow::Result<axum::Router> {
    let orchestrator = Orchestrator::from_config(config)?;
    Ok(api::create_router(Arc::new(orchestrator)))
}
