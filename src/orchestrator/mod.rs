//! The orchestration pipeline: parse → schedule → simulate.
//!
//! The orchestrator owns no parsing, scheduling or simulation logic. It
//! resolves the requested package, hands its DSL to the DSL service, feeds the
//! resulting graph to the scheduler, then resets the simulator and reads its
//! initial state. The first failure aborts the run; nothing is retried.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::catalog::AppPackageCatalog;
use crate::collaborators::{
    DslService, HttpDslService, HttpSchedulingService, HttpSimulationService, SchedulingService,
    SimulationService, http_client,
};
use crate::config::OrchestratorConfig;
use crate::error::{OrchestrationError, Result, Stage};
use crate::model::{SimulationRequest, SimulationResponse, SimulatorState};
use crate::types::AppPackageId;

pub const SIMULATION_STATUS: &str = "Completed (mock)";
pub const COMPLETION_MESSAGE: &str =
    "Orchestration finished. Complex simulation flow not yet implemented.";

pub struct Orchestrator {
    catalog: AppPackageCatalog,
    dsl: Arc<dyn DslService>,
    scheduling: Arc<dyn SchedulingService>,
    simulation: Arc<dyn SimulationService>,
    stage_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        catalog: AppPackageCatalog,
        dsl: Arc<dyn DslService>,
        scheduling: Arc<dyn SchedulingService>,
        simulation: Arc<dyn SimulationService>,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            dsl,
            scheduling,
            simulation,
            stage_timeout,
        }
    }

    /// Build an orchestrator talking to the HTTP collaborators named in `config`.
    pub fn from_config(config: &OrchestratorConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let timeout = config.timeout();
        let client = http_client(timeout)?;

        Ok(Self::new(
            AppPackageCatalog::from_config(config),
            Arc::new(HttpDslService::new(client.clone(), &config.dsl_url, timeout)),
            Arc::new(HttpSchedulingService::new(
                client.clone(),
                &config.scheduling_url,
                timeout,
            )),
            Arc::new(HttpSimulationService::new(
                client,
                &config.simulation_url,
                timeout,
            )),
            timeout,
        ))
    }

    /// Run the full pipeline for one client request.
    pub async fn run_simulation(&self, request: SimulationRequest) -> Result<SimulationResponse> {
        if request.app_package_id.is_blank() {
            return Err(OrchestrationError::InvalidRequest(
                "appPackageId must not be empty".to_string(),
            ));
        }

        let run_id = Uuid::new_v4();
        let span = info_span!(
            "orchestration",
            %run_id,
            app_package_id = %request.app_package_id
        );

        self.run_pipeline(request.app_package_id)
            .instrument(span)
            .await
            .inspect_err(|e| {
                if e.is_client_error() {
                    warn!("Orchestration rejected: {e}");
                } else if let Some(stage) = e.stage() {
                    error!(%stage, "Orchestration failed: {e}");
                } else {
                    error!("Orchestration failed: {e}");
                }
            })
    }

    async fn run_pipeline(&self, app_package_id: AppPackageId) -> Result<SimulationResponse> {
        info!("Orchestration started for App Package: {app_package_id}");

        let package = self.catalog.resolve(&app_package_id).await?;

        let dag = self
            .stage(Stage::Dsl, self.dsl.parse(&package.dsl_text))
            .await?;
        info!(
            "Got DAG with {} nodes and {} edges",
            dag.nodes.len(),
            dag.edges.len()
        );

        let schedule = self
            .stage(
                Stage::Scheduling,
                self.scheduling.schedule(&dag, &package.resources),
            )
            .await?;
        info!("Got schedule with {} tasks", schedule.schedule.len());

        let initial_state = self.stage(Stage::Simulation, self.simulate()).await?;

        Ok(SimulationResponse {
            schedule,
            simulation_status: SIMULATION_STATUS.to_string(),
            initial_cycle: initial_state.cycle,
            message: COMPLETION_MESSAGE.to_string(),
        })
    }

    /// Open a simulator session, reset it and read back its initial state.
    async fn simulate(&self) -> Result<SimulatorState> {
        let session = self.simulation.open_session().await?;

        let status = session.reset().await?;
        if !status.ok {
            return Err(OrchestrationError::Rejected {
                stage: Stage::Simulation,
                message: "simulator refused to reset".to_string(),
            });
        }
        info!("Simulator has been reset");

        let state = session.query_state().await?;
        info!("Initial state queried. Cycle count: {}", state.cycle);

        Ok(state)
    }

    /// Bound one pipeline stage by the configured deadline.
    async fn stage<T>(&self, stage: Stage, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.stage_timeout, fut)
            .await
            .map_err(|_| OrchestrationError::Timeout {
                stage,
                timeout: self.stage_timeout,
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::SimulationSession;
    use crate::model::{
        Core, Dag, DagEdge, DagNode, ResetStatus, Resources, ScheduleResponse, ScheduledTask,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Fail,
        Hang,
    }

    async fn act<T>(behavior: Behavior, stage: Stage, value: T) -> Result<T> {
        match behavior {
            Behavior::Succeed => Ok(value),
            Behavior::Fail => Err(OrchestrationError::Status {
                stage,
                status: http::StatusCode::INTERNAL_SERVER_ERROR,
            }),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(value)
            }
        }
    }

    fn sample_dag() -> Dag {
        Dag {
            nodes: vec![
                DagNode {
                    id: "n0".into(),
                    name: "TaskA".into(),
                    source_file: "task_a.c".into(),
                },
                DagNode {
                    id: "n1".into(),
                    name: "TaskB".into(),
                    source_file: "task_b.c".into(),
                },
            ],
            edges: vec![DagEdge {
                from_node: "n0".into(),
                to_node: "n1".into(),
                data_size: 32,
            }],
        }
    }

    fn sample_schedule() -> ScheduleResponse {
        ScheduleResponse {
            schedule: vec![ScheduledTask {
                task_id: "TaskA".into(),
                core_id: 0,
                start_cycle: 0,
                inputs: vec![],
                outputs: vec![serde_json::json!("out_var")],
            }],
        }
    }

    struct MockDsl {
        behavior: Behavior,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DslService for MockDsl {
        async fn parse(&self, dsl_text: &str) -> Result<Dag> {
            self.seen.lock().unwrap().push(dsl_text.to_string());
            act(self.behavior, Stage::Dsl, sample_dag()).await
        }
    }

    struct MockScheduler {
        behavior: Behavior,
        seen: Mutex<Vec<(Dag, Resources)>>,
    }

    #[async_trait]
    impl SchedulingService for MockScheduler {
        async fn schedule(&self, dag: &Dag, resources: &Resources) -> Result<ScheduleResponse> {
            self.seen
                .lock()
                .unwrap()
                .push((dag.clone(), resources.clone()));
            act(self.behavior, Stage::Scheduling, sample_schedule()).await
        }
    }

    #[derive(Default)]
    struct SimCalls {
        sessions: AtomicUsize,
        resets: AtomicUsize,
        queries: AtomicUsize,
    }

    struct MockSimulator {
        connect: Behavior,
        reset_ok: bool,
        cycle: u64,
        calls: Arc<SimCalls>,
    }

    struct MockSession {
        reset_ok: bool,
        cycle: u64,
        calls: Arc<SimCalls>,
    }

    #[async_trait]
    impl SimulationService for MockSimulator {
        async fn open_session(&self) -> Result<Box<dyn SimulationSession>> {
            self.calls.sessions.fetch_add(1, Ordering::SeqCst);
            let session = MockSession {
                reset_ok: self.reset_ok,
                cycle: self.cycle,
                calls: self.calls.clone(),
            };
            act(self.connect, Stage::Simulation, ()).await?;
            Ok(Box::new(session))
        }
    }

    #[async_trait]
    impl SimulationSession for MockSession {
        async fn reset(&self) -> Result<ResetStatus> {
            self.calls.resets.fetch_add(1, Ordering::SeqCst);
            Ok(ResetStatus { ok: self.reset_ok })
        }

        async fn query_state(&self) -> Result<SimulatorState> {
            self.calls.queries.fetch_add(1, Ordering::SeqCst);
            Ok(SimulatorState { cycle: self.cycle })
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        dsl: Arc<MockDsl>,
        scheduler: Arc<MockScheduler>,
        sim: Arc<SimCalls>,
    }

    struct HarnessBuilder {
        catalog: AppPackageCatalog,
        dsl: Behavior,
        scheduler: Behavior,
        connect: Behavior,
        reset_ok: bool,
        timeout: Duration,
    }

    impl HarnessBuilder {
        fn new() -> Self {
            Self {
                catalog: AppPackageCatalog::default(),
                dsl: Behavior::Succeed,
                scheduler: Behavior::Succeed,
                connect: Behavior::Succeed,
                reset_ok: true,
                timeout: Duration::from_secs(5),
            }
        }

        fn build(self) -> Harness {
            let dsl = Arc::new(MockDsl {
                behavior: self.dsl,
                seen: Mutex::new(Vec::new()),
            });
            let scheduler = Arc::new(MockScheduler {
                behavior: self.scheduler,
                seen: Mutex::new(Vec::new()),
            });
            let sim = Arc::new(SimCalls::default());
            let simulator = Arc::new(MockSimulator {
                connect: self.connect,
                reset_ok: self.reset_ok,
                cycle: 42,
                calls: sim.clone(),
            });

            let orchestrator = Orchestrator::new(
                self.catalog,
                dsl.clone(),
                scheduler.clone(),
                simulator,
                self.timeout,
            );

            Harness {
                orchestrator,
                dsl,
                scheduler,
                sim,
            }
        }
    }

    impl Harness {
        fn dsl_calls(&self) -> usize {
            self.dsl.seen.lock().unwrap().len()
        }

        fn scheduler_calls(&self) -> usize {
            self.scheduler.seen.lock().unwrap().len()
        }
    }

    #[tokio::test]
    async fn test_successful_run_aggregates_collaborator_output() {
        let h = HarnessBuilder::new().build();

        let resp = h
            .orchestrator
            .run_simulation(SimulationRequest::new("5g-pdsch-mock"))
            .await
            .unwrap();

        assert_eq!(resp.schedule, sample_schedule());
        assert_eq!(resp.initial_cycle, 42);
        assert_eq!(resp.simulation_status, SIMULATION_STATUS);
        assert_eq!(resp.message, COMPLETION_MESSAGE);

        // DSL saw the built-in package, scheduler saw the DSL's graph
        assert_eq!(
            h.dsl.seen.lock().unwrap().as_slice(),
            [crate::catalog::DEFAULT_DSL_TEXT.to_string()]
        );
        let seen = h.scheduler.seen.lock().unwrap();
        assert_eq!(seen[0].0, sample_dag());
        assert_eq!(seen[0].1, Resources::default());

        assert_eq!(h.sim.sessions.load(Ordering::SeqCst), 1);
        assert_eq!(h.sim.resets.load(Ordering::SeqCst), 1);
        assert_eq!(h.sim.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_package_resources_reach_scheduler() {
        let resources = Resources {
            cores: vec![Core {
                id: 3,
                core_type: "dsp".into(),
            }],
            memory_size_kb: 1024,
        };
        let mut builder = HarnessBuilder::new();
        builder.catalog = AppPackageCatalog::default().with_package(
            "radar",
            "dag Radar = { [y] = Fft() }",
            Some(resources.clone()),
        );
        let h = builder.build();

        h.orchestrator
            .run_simulation(SimulationRequest::new("radar"))
            .await
            .unwrap();

        assert_eq!(h.dsl.seen.lock().unwrap()[0], "dag Radar = { [y] = Fft() }");
        assert_eq!(h.scheduler.seen.lock().unwrap()[0].1, resources);
    }

    #[tokio::test]
    async fn test_blank_package_id_contacts_nobody() {
        let h = HarnessBuilder::new().build();

        let err = h
            .orchestrator
            .run_simulation(SimulationRequest::new("   "))
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestrationError::InvalidRequest(_)));
        assert_eq!(h.dsl_calls(), 0);
        assert_eq!(h.scheduler_calls(), 0);
        assert_eq!(h.sim.sessions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_package_contacts_nobody() {
        let mut builder = HarnessBuilder::new();
        builder.catalog = AppPackageCatalog::default().with_fallback(false);
        let h = builder.build();

        let err = h
            .orchestrator
            .run_simulation(SimulationRequest::new("nope"))
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestrationError::UnknownPackage(_)));
        assert_eq!(h.dsl_calls(), 0);
        assert_eq!(h.sim.sessions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dsl_failure_stops_pipeline() {
        let mut builder = HarnessBuilder::new();
        builder.dsl = Behavior::Fail;
        let h = builder.build();

        let err = h
            .orchestrator
            .run_simulation(SimulationRequest::new("p"))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Dsl));
        assert_eq!(h.scheduler_calls(), 0);
        assert_eq!(h.sim.sessions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_scheduling_failure_stops_pipeline() {
        let mut builder = HarnessBuilder::new();
        builder.scheduler = Behavior::Fail;
        let h = builder.build();

        let err = h
            .orchestrator
            .run_simulation(SimulationRequest::new("p"))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Scheduling));
        assert_eq!(h.dsl_calls(), 1);
        assert_eq!(h.sim.sessions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_simulator_connect_failure() {
        let mut builder = HarnessBuilder::new();
        builder.connect = Behavior::Fail;
        let h = builder.build();

        let err = h
            .orchestrator
            .run_simulation(SimulationRequest::new("p"))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Simulation));
        assert_eq!(h.sim.resets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refused_reset_skips_state_query() {
        let mut builder = HarnessBuilder::new();
        builder.reset_ok = false;
        let h = builder.build();

        let err = h
            .orchestrator
            .run_simulation(SimulationRequest::new("p"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestrationError::Rejected {
                stage: Stage::Simulation,
                ..
            }
        ));
        assert_eq!(h.sim.resets.load(Ordering::SeqCst), 1);
        assert_eq!(h.sim.queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stage_deadline() {
        let mut builder = HarnessBuilder::new();
        builder.scheduler = Behavior::Hang;
        builder.timeout = Duration::from_millis(50);
        let h = builder.build();

        let err = h
            .orchestrator
            .run_simulation(SimulationRequest::new("p"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestrationError::Timeout {
                stage: Stage::Scheduling,
                ..
            }
        ));
        assert_eq!(h.sim.sessions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_from_config_rejects_invalid_config() {
        let config = OrchestratorConfig {
            dsl_url: "ftp://dsl".to_string(),
            ..Default::default()
        };
        assert!(Orchestrator::from_config(&config).is_err());

        assert!(Orchestrator::from_config(&OrchestratorConfig::default()).is_ok());
    }
}
