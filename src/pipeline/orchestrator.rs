//! The pipeline orchestrator.
//!
//! [`Pipeline`] owns the state store, the job registry and the configuration.
//! Stage controllers borrow it; background jobs hold a clone.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard, RwLock};

use super::manager::PipelineManager;
use super::model::{PipelineRoot, Stage, StageProgress};
use super::progress;
use crate::config::AppConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::jobs::{self, Job, JobKey, JobRegistry, JobTicket};
use crate::stages::{broll, ideas, script, video};
use crate::stages::{BrollController, IdeaController, ScriptController, VideoController};

/// Whether the continue gate of `stage` is satisfied.
pub fn gate_satisfied(root: &PipelineRoot, stage: Stage) -> bool {
    match stage {
        Stage::IdeaGeneration => ideas::can_continue(root),
        Stage::ScriptCreation => script::can_continue(root),
        Stage::BrollPrompting => broll::can_continue(root),
        Stage::VideoGeneration => video::can_export(root),
    }
}

/// State and jobs, guarded together so a job can check its token and write
/// in one step.
pub(crate) struct Workspace {
    pub(crate) manager: PipelineManager,
    pub(crate) jobs: JobRegistry,
}

struct Shared {
    workspace: Mutex<Workspace>,
    config: RwLock<AppConfig>,
}

/// Handle to a running video creation pipeline. Cheap to clone.
#[derive(Clone)]
pub struct Pipeline {
    shared: Arc<Shared>,
}

impl Pipeline {
    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Creates a pipeline at the first stage with nothing generated.
    pub fn new(config: AppConfig) -> PipelineResult<Self> {
        Ok(Self::with_manager(PipelineManager::new()?, config))
    }

    /// Restores a pipeline from a [`save`](Self::save) snapshot.
    pub fn from_snapshot(bytes: &[u8], config: AppConfig) -> PipelineResult<Self> {
        Ok(Self::with_manager(PipelineManager::from_bytes(bytes)?, config))
    }

    fn with_manager(manager: PipelineManager, config: AppConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                workspace: Mutex::new(Workspace {
                    manager,
                    jobs: JobRegistry::new(),
                }),
                config: RwLock::new(config),
            }),
        }
    }

    // =========================================================================
    // STAGE CONTROLLERS
    // =========================================================================

    pub fn ideas(&self) -> IdeaController<'_> {
        IdeaController::new(self)
    }

    pub fn script(&self) -> ScriptController<'_> {
        ScriptController::new(self)
    }

    pub fn broll(&self) -> BrollController<'_> {
        BrollController::new(self)
    }

    pub fn video(&self) -> VideoController<'_> {
        VideoController::new(self)
    }

    // =========================================================================
    // CONFIGURATION
    // =========================================================================

    pub async fn config(&self) -> AppConfig {
        self.shared.config.read().await.clone()
    }

    pub async fn set_config(&self, config: AppConfig) {
        tracing::info!(model = %config.ai_model, "Configuration updated");
        *self.shared.config.write().await = config;
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    pub async fn current_stage(&self) -> PipelineResult<Stage> {
        self.read(|state| state.current_stage).await
    }

    /// Switches to any stage. Navigation is never gated.
    pub async fn navigate(&self, stage: Stage) -> PipelineResult<()> {
        let cancel = self.config().await.cancel_on_navigate;
        let mut workspace = self.lock().await;
        switch_stage(&mut workspace, stage, cancel)
    }

    /// Moves to the next stage if the current stage's gate is satisfied.
    pub async fn continue_to_next(&self) -> PipelineResult<Stage> {
        let cancel = self.config().await.cancel_on_navigate;
        let mut workspace = self.lock().await;
        let (current, open) = {
            let state = workspace.manager.state()?;
            (
                state.current_stage,
                gate_satisfied(state, state.current_stage),
            )
        };
        let next = match current.next() {
            Some(next) if open => next,
            _ => {
                tracing::warn!(stage = %current, "Continue rejected");
                return Err(PipelineError::StageLocked(current));
            }
        };
        switch_stage(&mut workspace, next, cancel)?;
        Ok(next)
    }

    /// Whether the continue affordance of `stage` should be offered.
    pub async fn can_continue(&self, stage: Stage) -> PipelineResult<bool> {
        self.read(|state| gate_satisfied(state, stage)).await
    }

    // =========================================================================
    // PROGRESS
    // =========================================================================

    pub async fn progress(&self) -> PipelineResult<Vec<StageProgress>> {
        self.read(|state| state.progress.clone()).await
    }

    pub async fn total_progress(&self) -> PipelineResult<f64> {
        self.read(|state| progress::total(&state.progress)).await
    }

    pub async fn completed_stages(&self) -> PipelineResult<usize> {
        self.read(|state| progress::completed_count(&state.progress))
            .await
    }

    /// One-line summary of where the pipeline stands.
    pub async fn status_line(&self) -> PipelineResult<String> {
        self.read(|state| {
            if progress::all_complete(&state.progress) {
                "All stages completed!".to_string()
            } else {
                format!("Currently working on: {}", state.current_stage.label())
            }
        })
        .await
    }

    /// True while a job of `stage` is pending.
    pub async fn is_generating(&self, stage: Stage) -> bool {
        self.lock().await.jobs.has_active(stage)
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Cancels every pending job and restores the initial state.
    pub async fn reset(&self) -> PipelineResult<()> {
        let mut workspace = self.lock().await;
        let cancelled = workspace.jobs.cancel_all();
        workspace.manager.replace_state(PipelineRoot::new())?;
        tracing::info!(cancelled, "Pipeline reset");
        Ok(())
    }

    /// Full copy of the current state.
    pub async fn state(&self) -> PipelineResult<PipelineRoot> {
        self.lock().await.manager.get_state()
    }

    /// Snapshot of the state document. Configuration is not included.
    pub async fn save(&self) -> Vec<u8> {
        self.lock().await.manager.save()
    }

    pub async fn to_json(&self) -> PipelineResult<serde_json::Value> {
        self.lock().await.manager.to_json()
    }

    // =========================================================================
    // INTERNAL HELPERS
    // =========================================================================

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Workspace> {
        self.shared.workspace.lock().await
    }

    /// Runs `f` against the current state.
    pub(crate) async fn read<T, F>(&self, f: F) -> PipelineResult<T>
    where
        F: FnOnce(&PipelineRoot) -> T,
    {
        let mut workspace = self.lock().await;
        Ok(f(workspace.manager.state()?))
    }

    /// Read current, compute new, replace.
    pub(crate) async fn update<T, F>(&self, f: F) -> PipelineResult<T>
    where
        F: FnOnce(&mut PipelineRoot) -> PipelineResult<T>,
    {
        self.lock().await.manager.update_state(f)
    }

    /// Registers a job under `key`, cancelling whatever ran there before.
    pub(crate) async fn register(&self, key: JobKey) -> JobTicket {
        self.lock().await.jobs.start(key)
    }

    /// Spawns a task on `job` that waits `delay` and then applies `apply`.
    ///
    /// The token is checked again once the workspace lock is held, so a job
    /// cancelled while waiting for the lock never writes.
    pub(crate) fn schedule<F>(&self, job: &Job, ticket: JobTicket, delay: Duration, apply: F)
    where
        F: FnOnce(&mut PipelineManager) -> PipelineResult<()> + Send + 'static,
    {
        let pipeline = self.clone();
        job.spawn(async move {
            jobs::wait_for(delay, ticket.token()).await;
            let mut workspace = pipeline.lock().await;
            workspace.jobs.finish(&ticket);
            if ticket.is_cancelled() {
                tracing::debug!(job = %ticket.key(), "Dropped cancelled job");
                return;
            }
            if let Err(e) = apply(&mut workspace.manager) {
                tracing::error!(job = %ticket.key(), error = %e, "Job failed to apply its update");
            }
        });
    }
}

fn switch_stage(workspace: &mut Workspace, stage: Stage, cancel_previous: bool) -> PipelineResult<()> {
    let previous = workspace.manager.state()?.current_stage;
    if previous == stage {
        return Ok(());
    }
    workspace.manager.set_current_stage(stage)?;
    if cancel_previous {
        let cancelled = workspace.jobs.cancel_stage(previous);
        if cancelled > 0 {
            tracing::info!(stage = %previous, cancelled, "Cancelled jobs of the stage left behind");
        }
    }
    tracing::info!(from = %previous, to = %stage, "Switched stage");
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
