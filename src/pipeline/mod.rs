//! Pipeline state: the data model, the Automerge-backed store, progress
//! arithmetic and the orchestrator that ties them to the job registry.

pub mod manager;
pub mod model;
pub mod orchestrator;
pub mod progress;

pub use manager::PipelineManager;
pub use model::{
    Approval, ClipStatus, Idea, InterestLevel, PipelineRoot, Script, ScriptLine, ScriptVersion,
    Sentiment, Stage, StageProgress, VideoClip,
};
pub use orchestrator::{gate_satisfied, Pipeline};
