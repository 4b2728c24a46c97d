//! Data models for the video creation pipeline.
//!
//! These structs use autosurgeon derives for automatic Automerge serialization.
//! Timestamps are milliseconds since the Unix epoch.

use std::fmt;

use autosurgeon::{Hydrate, Reconcile};
use serde::{Deserialize, Serialize};

/// Author label for versions produced by script generation.
pub const AI_AUTHOR: &str = "AI Assistant";

/// Author label for versions saved by the user.
pub const USER_AUTHOR: &str = "You";

/// Current wall-clock time in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// =============================================================================
// STAGE
// =============================================================================

/// One step of the fixed four-step pipeline.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reconcile, Hydrate, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    #[default]
    IdeaGeneration,
    ScriptCreation,
    BrollPrompting,
    VideoGeneration,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 4] = [
        Stage::IdeaGeneration,
        Stage::ScriptCreation,
        Stage::BrollPrompting,
        Stage::VideoGeneration,
    ];

    /// Stable identifier, e.g. `"idea-generation"`.
    pub fn id(self) -> &'static str {
        match self {
            Stage::IdeaGeneration => "idea-generation",
            Stage::ScriptCreation => "script-creation",
            Stage::BrollPrompting => "broll-prompting",
            Stage::VideoGeneration => "video-generation",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Stage::IdeaGeneration => "Idea Generation",
            Stage::ScriptCreation => "Script Creation",
            Stage::BrollPrompting => "B-roll Prompting",
            Stage::VideoGeneration => "Video Generation",
        }
    }

    /// Position in the pipeline, starting at 0.
    pub fn index(self) -> usize {
        match self {
            Stage::IdeaGeneration => 0,
            Stage::ScriptCreation => 1,
            Stage::BrollPrompting => 2,
            Stage::VideoGeneration => 3,
        }
    }

    /// The stage after this one, if any.
    pub fn next(self) -> Option<Stage> {
        Stage::ALL.get(self.index() + 1).copied()
    }

    /// Parses a stage identifier.
    pub fn from_id(id: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|stage| stage.id() == id)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// =============================================================================
// STAGE PROGRESS
// =============================================================================

/// Completion state of a single stage.
#[derive(Debug, Clone, PartialEq, Reconcile, Hydrate, Serialize, Deserialize)]
pub struct StageProgress {
    pub stage: Stage,
    /// 0–100 by convention; not clamped here.
    pub percentage: f64,
    pub completed: bool,
}

impl StageProgress {
    /// A fresh entry at 0 %.
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            percentage: 0.0,
            completed: false,
        }
    }
}

// =============================================================================
// IDEA
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reconcile, Hydrate, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reconcile, Hydrate, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestLevel {
    High,
    Medium,
    Low,
}

/// Tri-state review decision on an idea.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Reconcile, Hydrate, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Approval {
    #[default]
    Undecided,
    Approved,
    Rejected,
}

impl From<bool> for Approval {
    fn from(approved: bool) -> Self {
        if approved {
            Approval::Approved
        } else {
            Approval::Rejected
        }
    }
}

/// A trending news item proposed as video material.
#[derive(Debug, Clone, PartialEq, Reconcile, Hydrate, Serialize, Deserialize)]
pub struct Idea {
    pub id: String,
    pub title: String,
    pub description: String,
    pub source: String,
    pub source_url: String,
    pub sentiment: Sentiment,
    pub interest_level: InterestLevel,
    pub approval: Approval,
    pub created_at: i64,
}

impl Idea {
    /// Creates an undecided idea with neutral sentiment and medium interest.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            source: String::new(),
            source_url: String::new(),
            sentiment: Sentiment::Neutral,
            interest_level: InterestLevel::Medium,
            approval: Approval::Undecided,
            created_at: now_millis(),
        }
    }

    /// Builder: Set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: Set source label and URL.
    pub fn with_source(mut self, source: impl Into<String>, url: impl Into<String>) -> Self {
        self.source = source.into();
        self.source_url = url.into();
        self
    }

    /// Builder: Set sentiment.
    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = sentiment;
        self
    }

    /// Builder: Set interest level.
    pub fn with_interest(mut self, interest_level: InterestLevel) -> Self {
        self.interest_level = interest_level;
        self
    }

    /// Builder: Set approval.
    pub fn with_approval(mut self, approval: Approval) -> Self {
        self.approval = approval;
        self
    }

    pub fn is_approved(&self) -> bool {
        self.approval == Approval::Approved
    }
}

// =============================================================================
// SCRIPT
// =============================================================================

/// An immutable snapshot of script content.
#[derive(Debug, Clone, PartialEq, Reconcile, Hydrate, Serialize, Deserialize)]
pub struct ScriptVersion {
    pub id: String,
    pub content: String,
    pub created_at: i64,
    pub author: String,
}

/// The narration script with its version history.
#[derive(Debug, Clone, PartialEq, Reconcile, Hydrate, Serialize, Deserialize)]
pub struct Script {
    pub id: String,
    /// Live content; may differ from every saved version.
    pub content: String,
    pub versions: Vec<ScriptVersion>,
    /// Valid index into `versions` once any version exists.
    pub current_version: u32,
}

impl Script {
    /// Creates an empty script with a fresh id.
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: String::new(),
            versions: Vec::new(),
            current_version: 0,
        }
    }

    /// The version the pointer refers to, if any version exists.
    pub fn active_version(&self) -> Option<&ScriptVersion> {
        self.versions.get(self.current_version as usize)
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SCRIPT LINE
// =============================================================================

/// One narration line of the script with its b-roll prompt.
#[derive(Debug, Clone, PartialEq, Reconcile, Hydrate, Serialize, Deserialize)]
pub struct ScriptLine {
    pub id: String,
    /// 1-based.
    pub line_number: u32,
    pub text: String,
    pub generated_prompt: String,
    /// Empty means "use the generated prompt".
    pub edited_prompt: String,
}

impl ScriptLine {
    /// Creates a line without prompts.
    pub fn new(id: impl Into<String>, line_number: u32, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            line_number,
            text: text.into(),
            generated_prompt: String::new(),
            edited_prompt: String::new(),
        }
    }

    /// Builder: Set generated prompt.
    pub fn with_generated_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.generated_prompt = prompt.into();
        self
    }

    /// The prompt that will actually be used: the override when present.
    pub fn effective_prompt(&self) -> &str {
        if self.edited_prompt.is_empty() {
            &self.generated_prompt
        } else {
            &self.edited_prompt
        }
    }

    pub fn is_edited(&self) -> bool {
        !self.edited_prompt.is_empty()
    }
}

// =============================================================================
// VIDEO CLIP
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reconcile, Hydrate, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipStatus {
    Generating,
    Ready,
    /// Defined for completeness; no flow produces it.
    Error,
}

/// A generated video asset tied to exactly one script line.
#[derive(Debug, Clone, PartialEq, Reconcile, Hydrate, Serialize, Deserialize)]
pub struct VideoClip {
    pub id: String,
    pub script_line_id: String,
    pub url: String,
    pub duration_secs: u32,
    pub updated_at: i64,
    pub status: ClipStatus,
}

impl VideoClip {
    /// A clip that has just been queued for rendering.
    pub fn pending(line: &ScriptLine) -> Self {
        Self {
            id: format!("clip-{}", line.id),
            script_line_id: line.id.clone(),
            url: String::new(),
            duration_secs: 0,
            updated_at: now_millis(),
            status: ClipStatus::Generating,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == ClipStatus::Ready
    }
}

// =============================================================================
// DOCUMENT ROOT
// =============================================================================

/// Root document holding the whole application state.
#[derive(Debug, Clone, PartialEq, Reconcile, Hydrate, Serialize, Deserialize)]
pub struct PipelineRoot {
    pub current_stage: Stage,
    /// One entry per stage, in pipeline order.
    pub progress: Vec<StageProgress>,
    pub ideas: Vec<Idea>,
    pub script: Script,
    pub script_lines: Vec<ScriptLine>,
    /// Line ids selected for bulk prompt editing.
    pub selected_lines: Vec<String>,
    pub video_clips: Vec<VideoClip>,
}

impl PipelineRoot {
    /// Creates the initial state: first stage active, everything at zero.
    pub fn new() -> Self {
        Self {
            current_stage: Stage::IdeaGeneration,
            progress: Stage::ALL.into_iter().map(StageProgress::new).collect(),
            ideas: Vec::new(),
            script: Script::new(),
            script_lines: Vec::new(),
            selected_lines: Vec::new(),
            video_clips: Vec::new(),
        }
    }

    /// Progress entry for a stage.
    pub fn progress_of(&self, stage: Stage) -> Option<&StageProgress> {
        self.progress.iter().find(|p| p.stage == stage)
    }

    /// Approved ideas in fetch order.
    pub fn approved_ideas(&self) -> Vec<&Idea> {
        self.ideas.iter().filter(|idea| idea.is_approved()).collect()
    }

    /// The script line a clip belongs to.
    pub fn line_for_clip(&self, clip: &VideoClip) -> Option<&ScriptLine> {
        self.script_lines
            .iter()
            .find(|line| line.id == clip.script_line_id)
    }
}

impl Default for PipelineRoot {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_starts_with_one_entry_per_stage() {
        let root = PipelineRoot::new();
        assert_eq!(root.current_stage, Stage::IdeaGeneration);
        assert_eq!(root.progress.len(), 4);
        for (entry, stage) in root.progress.iter().zip(Stage::ALL) {
            assert_eq!(entry.stage, stage);
            assert_eq!(entry.percentage, 0.0);
            assert!(!entry.completed);
        }
    }

    #[test]
    fn test_stage_ordering() {
        assert_eq!(Stage::IdeaGeneration.next(), Some(Stage::ScriptCreation));
        assert_eq!(Stage::BrollPrompting.next(), Some(Stage::VideoGeneration));
        assert_eq!(Stage::VideoGeneration.next(), None);
        assert_eq!(Stage::from_id("broll-prompting"), Some(Stage::BrollPrompting));
        assert_eq!(Stage::from_id("export"), None);
        assert_eq!(Stage::ScriptCreation.to_string(), "script-creation");
    }

    #[test]
    fn test_stage_serializes_as_id() {
        let json = serde_json::to_string(&Stage::VideoGeneration).unwrap();
        assert_eq!(json, "\"video-generation\"");
    }

    #[test]
    fn test_effective_prompt_prefers_override() {
        let mut line = ScriptLine::new("line-0", 1, "Hello").with_generated_prompt("generated");
        assert_eq!(line.effective_prompt(), "generated");
        assert!(!line.is_edited());

        line.edited_prompt = "mine".to_string();
        assert_eq!(line.effective_prompt(), "mine");
        assert!(line.is_edited());
    }

    #[test]
    fn test_pending_clip_for_line() {
        let line = ScriptLine::new("line-3", 4, "text");
        let clip = VideoClip::pending(&line);
        assert_eq!(clip.id, "clip-line-3");
        assert_eq!(clip.script_line_id, "line-3");
        assert_eq!(clip.status, ClipStatus::Generating);
        assert!(clip.url.is_empty());
        assert_eq!(clip.duration_secs, 0);
    }

    #[test]
    fn test_active_version_follows_pointer() {
        let mut script = Script::new();
        assert!(script.active_version().is_none());

        for (id, author) in [("v1", AI_AUTHOR), ("v2", USER_AUTHOR)] {
            script.versions.push(ScriptVersion {
                id: id.to_string(),
                content: format!("draft {}", id),
                created_at: 0,
                author: author.to_string(),
            });
        }
        assert_eq!(script.active_version().map(|v| v.id.as_str()), Some("v1"));

        script.current_version = 1;
        assert_eq!(script.active_version().map(|v| v.author.as_str()), Some(USER_AUTHOR));

        script.current_version = 5;
        assert!(script.active_version().is_none());
    }

    #[test]
    fn test_approval_from_bool() {
        assert_eq!(Approval::from(true), Approval::Approved);
        assert_eq!(Approval::from(false), Approval::Rejected);
        assert!(Idea::new("1", "t").with_approval(Approval::Approved).is_approved());
    }
}
