//! Reelcraft - a four-stage pipeline for short-form video creation.
//!
//! A run moves through idea review, script writing, b-roll prompting and clip
//! rendering. All state lives in one Automerge document managed through
//! Autosurgeon, and every generation step is a simulated asynchronous job:
//!
//! - **Single state store**: every mutation is "read current, compute new, replace"
//! - **Cancellable jobs**: restarting an operation cancels the pending one
//! - **Gated progress**: continuing requires the current stage to be satisfied,
//!   while direct navigation is always allowed
//!
//! # Example
//!
//! ```rust,no_run
//! use reelcraft::{AppConfig, Pipeline};
//!
//! # async fn run() -> reelcraft::PipelineResult<()> {
//! let pipeline = Pipeline::new(AppConfig::new().with_api_key("sk-demo"))?;
//!
//! // Fetch trending topics and approve one
//! pipeline.ideas().fetch().await?.join().await;
//! pipeline.ideas().set_approval("1", true).await?;
//! pipeline.continue_to_next().await?;
//!
//! // Draft a script, derive b-roll prompts, render clips
//! pipeline.script().generate().await?.join().await;
//! pipeline.continue_to_next().await?;
//! pipeline.broll().generate_prompts().await?.join().await;
//! pipeline.continue_to_next().await?;
//! pipeline.video().generate_all().await?.join().await;
//!
//! println!("{}", pipeline.status_line().await?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod jobs;
pub mod pipeline;
pub mod stages;

// Re-exports for convenience
pub use config::{AppConfig, Timings};
pub use error::{PipelineError, PipelineResult};
pub use jobs::{Job, JobKey, JobOutcome};
pub use pipeline::{
    Approval, ClipStatus, Idea, Pipeline, PipelineManager, PipelineRoot, Script, ScriptLine,
    Stage, StageProgress, VideoClip,
};
pub use stages::{
    BrollController, IdeaController, PromptSummary, ScriptController, ScriptStats, TimelineEntry,
    VideoController,
};
