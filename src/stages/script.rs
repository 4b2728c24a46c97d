//! Script creation stage: write, generate and version the narration script.

use crate::error::{PipelineError, PipelineResult};
use crate::jobs::{Job, JobKey};
use crate::pipeline::model::{
    now_millis, Idea, PipelineRoot, Script, ScriptVersion, Stage, StageProgress, AI_AUTHOR,
    USER_AUTHOR,
};
use crate::pipeline::orchestrator::Pipeline;
use crate::pipeline::progress;

/// Characters at which a hand-written script counts as 100 %.
pub const TARGET_LENGTH: usize = 500;

/// Characters a hand-written script needs before the stage is complete.
pub const MIN_COMPLETE_LENGTH: usize = 100;

/// Average speaking rate used for the duration estimate.
pub const WORDS_PER_MINUTE: usize = 150;

/// People shown as working on the script.
pub const COLLABORATORS: [&str; 2] = [USER_AUTHOR, AI_AUTHOR];

/// Renders the generated script for the approved ideas.
pub fn render_script(approved: &[&Idea]) -> String {
    let title = approved
        .first()
        .map(|idea| idea.title.as_str())
        .unwrap_or("Trending Topic");

    let segments = approved
        .iter()
        .enumerate()
        .map(|(index, idea)| {
            format!(
                "\n### Segment {}: {}\n{}\n\nThis story from {} has been generating massive buzz online. Let's break down why this matters...\n",
                index + 1,
                idea.title,
                idea.description,
                idea.source,
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "# Video Script: {title}

## Opening (0:00 - 0:15)
[Dynamic music fades in]
Hey everyone! Today we're diving into something that's taking the internet by storm...

## Main Content (0:15 - 1:30)
{segments}

## Analysis (1:30 - 2:15)
So what does this all mean? Well, when we look at the bigger picture...

## Conclusion (2:15 - 2:45)
That's it for today's video! What do you think about these developments? Let me know in the comments below.

[End card with subscribe button]"
    )
}

/// Returns `script` with `content` appended as a new version and made current.
pub fn with_new_version(script: &Script, content: &str, author: &str) -> Script {
    let mut versions = script.versions.clone();
    versions.push(ScriptVersion {
        id: format!("v{}", versions.len() + 1),
        content: content.to_string(),
        created_at: now_millis(),
        author: author.to_string(),
    });
    Script {
        id: script.id.clone(),
        content: content.to_string(),
        current_version: (versions.len() - 1) as u32,
        versions,
    }
}

/// Returns `script` with its live content taken from `versions[index]`.
pub fn with_loaded_version(script: &Script, index: usize) -> PipelineResult<Script> {
    let version = script
        .versions
        .get(index)
        .ok_or_else(|| PipelineError::index_out_of_bounds(index, script.versions.len()))?;
    Ok(Script {
        content: version.content.clone(),
        current_version: index as u32,
        ..script.clone()
    })
}

/// Percentage and completion for hand-written content.
pub fn edit_progress(content: &str) -> (f64, bool) {
    let length = content.chars().count();
    (progress::ratio(length, TARGET_LENGTH), length > MIN_COMPLETE_LENGTH)
}

/// Length figures shown under the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptStats {
    pub characters: usize,
    pub words: usize,
    /// Rounded up.
    pub minutes: usize,
}

pub fn stats(content: &str) -> ScriptStats {
    let words = content.split_whitespace().count();
    ScriptStats {
        characters: content.chars().count(),
        words,
        minutes: words.div_ceil(WORDS_PER_MINUTE),
    }
}

/// Script content is not empty.
pub fn can_continue(root: &PipelineRoot) -> bool {
    !root.script.content.is_empty()
}

/// Controller for the script creation stage.
pub struct ScriptController<'a> {
    pipeline: &'a Pipeline,
}

impl<'a> ScriptController<'a> {
    pub(crate) fn new(pipeline: &'a Pipeline) -> Self {
        Self { pipeline }
    }

    /// Starts simulated script generation from the approved ideas.
    ///
    /// Ideas are read when the job completes, not when it starts.
    pub async fn generate(&self) -> PipelineResult<Job> {
        let config = self.pipeline.config().await;
        let delay = config.timings.script();
        let ticket = self
            .pipeline
            .register(JobKey::Stage(Stage::ScriptCreation))
            .await;
        let job = Job::new(ticket.key().clone(), ticket.token().clone());

        tracing::info!(model = %config.ai_model, "Generating script");
        self.pipeline.schedule(&job, ticket, delay, |manager| {
            manager.update_state(|state| {
                let content = render_script(&state.approved_ideas());
                state.script = with_new_version(&state.script, &content, AI_AUTHOR);
                state.progress =
                    progress::update(&state.progress, Stage::ScriptCreation, 100.0, true);
                tracing::info!(
                    versions = state.script.versions.len(),
                    characters = content.len(),
                    "Generated script"
                );
                Ok(())
            })
        });
        Ok(job)
    }

    /// Replaces the live content without saving a version.
    pub async fn edit(&self, content: &str) -> PipelineResult<StageProgress> {
        self.pipeline
            .update(|state| {
                state.script = Script {
                    content: content.to_string(),
                    ..state.script.clone()
                };
                let (percentage, completed) = edit_progress(content);
                state.progress = progress::update(
                    &state.progress,
                    Stage::ScriptCreation,
                    percentage,
                    completed,
                );
                Ok(StageProgress {
                    stage: Stage::ScriptCreation,
                    percentage,
                    completed,
                })
            })
            .await
    }

    /// Saves the live content as a new version. Returns its index.
    pub async fn save_version(&self) -> PipelineResult<usize> {
        let index = self
            .pipeline
            .update(|state| {
                state.script = with_new_version(&state.script, &state.script.content, USER_AUTHOR);
                Ok(state.script.current_version as usize)
            })
            .await?;
        tracing::debug!(index, "Saved script version");
        Ok(index)
    }

    /// Loads `versions[index]` into the live content.
    pub async fn load_version(&self, index: usize) -> PipelineResult<()> {
        let result = self
            .pipeline
            .update(|state| {
                state.script = with_loaded_version(&state.script, index)?;
                Ok(())
            })
            .await;
        if let Err(ref e) = result {
            tracing::warn!(index, error = %e, "Version load rejected");
        }
        result
    }

    /// Steps back one version. Returns false when already at the first.
    pub async fn previous_version(&self) -> PipelineResult<bool> {
        let current = self.pipeline.read(|state| state.script.current_version).await?;
        if current == 0 {
            return Ok(false);
        }
        self.load_version(current as usize - 1).await?;
        Ok(true)
    }

    /// Steps forward one version. Returns false when already at the last.
    pub async fn next_version(&self) -> PipelineResult<bool> {
        let (current, count) = self
            .pipeline
            .read(|state| {
                (
                    state.script.current_version as usize,
                    state.script.versions.len(),
                )
            })
            .await?;
        if current + 1 >= count {
            return Ok(false);
        }
        self.load_version(current + 1).await?;
        Ok(true)
    }

    pub async fn current(&self) -> PipelineResult<Script> {
        self.pipeline.read(|state| state.script.clone()).await
    }

    pub async fn stats(&self) -> PipelineResult<ScriptStats> {
        self.pipeline.read(|state| stats(&state.script.content)).await
    }

    pub fn collaborators(&self) -> &'static [&'static str] {
        &COLLABORATORS
    }

    /// Generation needs at least one approved idea.
    pub async fn can_generate(&self) -> PipelineResult<bool> {
        self.pipeline
            .read(|state| !state.approved_ideas().is_empty())
            .await
    }

    pub async fn is_generating(&self) -> bool {
        self.pipeline.is_generating(Stage::ScriptCreation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, Timings};
    use crate::pipeline::model::Approval;

    fn idea(id: &str, title: &str) -> Idea {
        Idea::new(id, title)
            .with_description(format!("About {}", title))
            .with_source("Wire", "https://example.com")
            .with_approval(Approval::Approved)
    }

    fn instant_pipeline() -> Pipeline {
        Pipeline::new(AppConfig::default().with_timings(Timings::instant())).unwrap()
    }

    #[test]
    fn test_render_without_ideas_uses_fallback_title() {
        let script = render_script(&[]);
        assert!(script.starts_with("# Video Script: Trending Topic\n"));
        assert!(script.contains("## Opening (0:00 - 0:15)"));
        assert!(script.ends_with("[End card with subscribe button]"));
    }

    #[test]
    fn test_render_interpolates_segments() {
        let a = idea("1", "Alpha");
        let b = idea("2", "Beta");
        let script = render_script(&[&a, &b]);

        assert!(script.starts_with("# Video Script: Alpha\n"));
        assert!(script.contains(
            "## Main Content (0:15 - 1:30)\n\n### Segment 1: Alpha\nAbout Alpha\n\nThis story from Wire"
        ));
        assert!(script.contains("matters...\n\n\n### Segment 2: Beta\nAbout Beta"));
        assert!(script.contains("matters...\n\n\n## Analysis (1:30 - 2:15)"));
    }

    #[test]
    fn test_versions_are_append_only() {
        let mut script = Script::new();
        let mut lengths = vec![];
        for (i, author) in [AI_AUTHOR, USER_AUTHOR, USER_AUTHOR].into_iter().enumerate() {
            script = with_new_version(&script, &format!("draft {}", i), author);
            lengths.push(script.versions.len());
            script = with_loaded_version(&script, 0).unwrap();
            lengths.push(script.versions.len());
        }
        assert!(lengths.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(script.versions.len(), 3);
        assert_eq!(script.versions[2].id, "v3");
        assert_eq!(script.versions[0].author, AI_AUTHOR);
    }

    #[test]
    fn test_load_version_keeps_history() {
        let mut script = with_new_version(&Script::new(), "first", USER_AUTHOR);
        script = with_new_version(&script, "second", USER_AUTHOR);
        let history = script.versions.clone();

        let loaded = with_loaded_version(&script, 0).unwrap();
        assert_eq!(loaded.content, "first");
        assert_eq!(loaded.current_version, 0);
        assert_eq!(loaded.versions, history);

        let err = with_loaded_version(&script, 2).unwrap_err();
        assert!(matches!(err, PipelineError::IndexOutOfBounds { index: 2, length: 2 }));
    }

    #[test]
    fn test_edit_progress() {
        assert_eq!(edit_progress(""), (0.0, false));
        assert_eq!(edit_progress(&"x".repeat(100)), (20.0, false));
        assert!(edit_progress(&"x".repeat(101)).1);
        assert_eq!(edit_progress(&"x".repeat(900)), (100.0, true));
    }

    #[test]
    fn test_stats() {
        let text = "word ".repeat(151);
        let s = stats(&text);
        assert_eq!(s.words, 151);
        assert_eq!(s.minutes, 2);
        assert_eq!(stats("").minutes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_appends_ai_version() {
        let pipeline = instant_pipeline();
        pipeline
            .update(|state| {
                state.ideas = vec![idea("1", "Alpha"), Idea::new("2", "Skipped")];
                Ok(())
            })
            .await
            .unwrap();

        pipeline.script().generate().await.unwrap().join().await;

        let script = pipeline.script().current().await.unwrap();
        assert_eq!(script.versions.len(), 1);
        assert_eq!(script.versions[0].author, AI_AUTHOR);
        assert_eq!(script.current_version, 0);
        assert!(script.content.contains("Segment 1: Alpha"));
        assert!(!script.content.contains("Skipped"));

        let progress = pipeline.progress().await.unwrap();
        assert_eq!(progress[1].percentage, 100.0);
        assert!(progress[1].completed);
    }

    #[tokio::test]
    async fn test_edit_save_and_navigate_versions() {
        let pipeline = instant_pipeline();
        let script = pipeline.script();

        let entry = script.edit("first draft").await.unwrap();
        assert!(!entry.completed);
        assert!(pipeline.can_continue(Stage::ScriptCreation).await.unwrap());
        // Editing alone never creates a version.
        assert!(script.current().await.unwrap().versions.is_empty());

        assert_eq!(script.save_version().await.unwrap(), 0);
        script.edit("second draft").await.unwrap();
        assert_eq!(script.save_version().await.unwrap(), 1);

        assert!(script.previous_version().await.unwrap());
        assert_eq!(script.current().await.unwrap().content, "first draft");
        assert!(!script.previous_version().await.unwrap());

        assert!(script.next_version().await.unwrap());
        assert_eq!(script.current().await.unwrap().content, "second draft");
        assert!(!script.next_version().await.unwrap());

        assert!(script.load_version(5).await.is_err());
        assert_eq!(script.current().await.unwrap().versions.len(), 2);
    }

    #[tokio::test]
    async fn test_can_generate_needs_approval() {
        let pipeline = instant_pipeline();
        assert!(!pipeline.script().can_generate().await.unwrap());
        pipeline
            .update(|state| {
                state.ideas = vec![idea("1", "Alpha")];
                Ok(())
            })
            .await
            .unwrap();
        assert!(pipeline.script().can_generate().await.unwrap());
        assert_eq!(pipeline.script().collaborators(), &["You", "AI Assistant"]);
    }
}
