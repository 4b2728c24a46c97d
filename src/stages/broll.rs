//! B-roll prompting stage: split the script into lines and attach footage prompts.

use std::collections::HashSet;

use crate::error::{PipelineError, PipelineResult};
use crate::jobs::{Job, JobKey};
use crate::pipeline::model::{PipelineRoot, ScriptLine, Stage};
use crate::pipeline::orchestrator::Pipeline;
use crate::pipeline::progress;

/// Lines starting with this are headings or comments, not narration.
pub const COMMENT_MARKER: char = '#';

/// Prompt used when no keyword rule matches.
pub const FALLBACK_PROMPT: &str = "Professional b-roll footage relevant to narration, cinematic composition, 4K quality, neutral color grading, smooth camera movements";

/// Keyword rules in priority order. The first rule with any matching keyword wins.
pub const PROMPT_RULES: &[(&[&str], &str)] = &[
    (
        &["opening", "hey"],
        "Cinematic establishing shot, person entering modern tech office, bright natural lighting, shallow depth of field, 4K resolution",
    ),
    (
        &["ai", "technology"],
        "Futuristic technology montage, holographic interfaces, digital brain networks, neon blue and purple color grading, high-tech laboratory setting",
    ),
    (
        &["climate", "environment"],
        "Aerial drone footage of lush forest canopy, renewable energy wind turbines, golden hour lighting, environmental conservation theme",
    ),
    (
        &["stock market", "financial"],
        "Dynamic stock market charts and graphs, trading floor activity, multiple screens with financial data, professional business environment",
    ),
    (
        &["space", "mars"],
        "Stunning space imagery, rocket launch sequence, Mars surface panorama, astronaut perspective, epic cinematic space visuals",
    ),
    (
        &["social media"],
        "Person scrolling on smartphone, social media app interfaces, notification animations, modern lifestyle setting, warm indoor lighting",
    ),
    (
        &["conclusion", "subscribe"],
        "Content creator in studio setup, gesture to camera, colorful LED background, YouTube end card graphics overlay",
    ),
];

/// Splits script content into narration lines.
///
/// Blank lines and lines whose raw text starts with `#` are dropped; the rest
/// are trimmed and numbered from 1.
pub fn parse_lines(content: &str) -> Vec<ScriptLine> {
    content
        .split('\n')
        .filter(|line| !line.trim().is_empty() && !line.starts_with(COMMENT_MARKER))
        .enumerate()
        .map(|(index, line)| ScriptLine::new(format!("line-{}", index), index as u32 + 1, line.trim()))
        .collect()
}

/// Picks the b-roll prompt for a line of narration.
///
/// Matching is by substring on the lowercased text, so "said" matches "ai".
pub fn prompt_for_line(text: &str) -> &'static str {
    let lowered = text.to_lowercase();
    PROMPT_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(_, prompt)| *prompt)
        .unwrap_or(FALLBACK_PROMPT)
}

/// Parses `content` and attaches a generated prompt to every line.
pub fn generate_lines(content: &str) -> Vec<ScriptLine> {
    parse_lines(content)
        .into_iter()
        .map(|line| {
            let prompt = prompt_for_line(&line.text);
            line.with_generated_prompt(prompt)
        })
        .collect()
}

/// Returns `lines` with the override of `line_id` set to `prompt`.
pub fn with_edited_prompt(
    lines: &[ScriptLine],
    line_id: &str,
    prompt: &str,
) -> PipelineResult<Vec<ScriptLine>> {
    if !lines.iter().any(|line| line.id == line_id) {
        return Err(PipelineError::line_not_found(line_id));
    }
    Ok(with_bulk_edit(lines, prompt, |id| id == line_id))
}

/// Returns `lines` with `prompt` set as override on every line `selected` accepts.
pub fn with_bulk_edit<F>(lines: &[ScriptLine], prompt: &str, selected: F) -> Vec<ScriptLine>
where
    F: Fn(&str) -> bool,
{
    lines
        .iter()
        .map(|line| {
            if selected(&line.id) {
                ScriptLine {
                    edited_prompt: prompt.to_string(),
                    ..line.clone()
                }
            } else {
                line.clone()
            }
        })
        .collect()
}

/// Returns `selection` with `line_id` added, or removed if already present.
pub fn with_toggled(selection: &[String], line_id: &str) -> Vec<String> {
    if selection.iter().any(|id| id == line_id) {
        selection.iter().filter(|id| *id != line_id).cloned().collect()
    } else {
        let mut next = selection.to_vec();
        next.push(line_id.to_string());
        next
    }
}

/// Percentage and completion for a line set. `None` for an empty set.
pub fn prompt_progress(lines: &[ScriptLine]) -> Option<(f64, bool)> {
    if lines.is_empty() {
        return None;
    }
    let with_prompt = lines
        .iter()
        .filter(|line| !line.generated_prompt.is_empty())
        .count();
    let percentage = progress::ratio(with_prompt, lines.len());
    Some((percentage, percentage == 100.0))
}

/// Every line has a generated prompt.
pub fn can_continue(root: &PipelineRoot) -> bool {
    !root.script_lines.is_empty()
        && root
            .script_lines
            .iter()
            .all(|line| !line.generated_prompt.is_empty())
}

/// Replaces the line set and recomputes the stage progress.
pub(crate) fn replace_lines(root: &mut PipelineRoot, lines: Vec<ScriptLine>) {
    root.script_lines = lines;
    if let Some((percentage, completed)) = prompt_progress(&root.script_lines) {
        root.progress = progress::update(
            &root.progress,
            Stage::BrollPrompting,
            percentage,
            completed,
        );
    }
}

/// How many lines use their own prompt versus the generated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptSummary {
    pub lines: usize,
    pub edited: usize,
    pub generated: usize,
}

pub fn summary(lines: &[ScriptLine]) -> PromptSummary {
    PromptSummary {
        lines: lines.len(),
        edited: lines.iter().filter(|line| line.is_edited()).count(),
        generated: lines
            .iter()
            .filter(|line| !line.is_edited() && !line.generated_prompt.is_empty())
            .count(),
    }
}

/// Controller for the b-roll prompting stage.
pub struct BrollController<'a> {
    pipeline: &'a Pipeline,
}

impl<'a> BrollController<'a> {
    pub(crate) fn new(pipeline: &'a Pipeline) -> Self {
        Self { pipeline }
    }

    /// Starts simulated prompt generation for the current script.
    ///
    /// The script is parsed when the job completes; the line set is replaced
    /// wholesale, dropping earlier overrides and the selection.
    pub async fn generate_prompts(&self) -> PipelineResult<Job> {
        let empty = self
            .pipeline
            .read(|state| state.script.content.is_empty())
            .await?;
        if empty {
            tracing::warn!("Prompt generation rejected: script is empty");
            return Err(PipelineError::EmptyScript);
        }

        let delay = self.pipeline.config().await.timings.prompts();
        let ticket = self
            .pipeline
            .register(JobKey::Stage(Stage::BrollPrompting))
            .await;
        let job = Job::new(ticket.key().clone(), ticket.token().clone());

        tracing::info!("Generating b-roll prompts");
        self.pipeline.schedule(&job, ticket, delay, |manager| {
            manager.update_state(|state| {
                let lines = generate_lines(&state.script.content);
                tracing::info!(lines = lines.len(), "Generated b-roll prompts");
                replace_lines(state, lines);
                state.selected_lines.clear();
                Ok(())
            })
        });
        Ok(job)
    }

    /// Overrides the prompt of one line.
    pub async fn edit_prompt(&self, line_id: &str, prompt: &str) -> PipelineResult<()> {
        self.pipeline
            .update(|state| {
                let lines = with_edited_prompt(&state.script_lines, line_id, prompt)?;
                replace_lines(state, lines);
                Ok(())
            })
            .await
    }

    /// Adds or removes a line from the bulk-edit selection.
    pub async fn toggle_selection(&self, line_id: &str) -> PipelineResult<()> {
        self.pipeline
            .update(|state| {
                if !state.script_lines.iter().any(|line| line.id == line_id) {
                    return Err(PipelineError::line_not_found(line_id));
                }
                state.selected_lines = with_toggled(&state.selected_lines, line_id);
                Ok(())
            })
            .await
    }

    pub async fn clear_selection(&self) -> PipelineResult<()> {
        self.pipeline
            .update(|state| {
                state.selected_lines.clear();
                Ok(())
            })
            .await
    }

    pub async fn selection(&self) -> PipelineResult<Vec<String>> {
        self.pipeline.read(|state| state.selected_lines.clone()).await
    }

    /// Applies `prompt` to every selected line and clears the selection.
    ///
    /// Returns how many lines were changed. Empty prompts are ignored.
    pub async fn bulk_edit_prompts(&self, prompt: &str) -> PipelineResult<usize> {
        if prompt.is_empty() {
            return Ok(0);
        }
        let changed = self
            .pipeline
            .update(|state| {
                let selected: HashSet<&str> =
                    state.selected_lines.iter().map(String::as_str).collect();
                let changed = state
                    .script_lines
                    .iter()
                    .filter(|line| selected.contains(line.id.as_str()))
                    .count();
                let lines = with_bulk_edit(&state.script_lines, prompt, |id| selected.contains(id));
                replace_lines(state, lines);
                state.selected_lines.clear();
                Ok(changed)
            })
            .await?;
        tracing::debug!(changed, "Bulk edited prompts");
        Ok(changed)
    }

    pub async fn lines(&self) -> PipelineResult<Vec<ScriptLine>> {
        self.pipeline.read(|state| state.script_lines.clone()).await
    }

    pub async fn summary(&self) -> PipelineResult<PromptSummary> {
        self.pipeline.read(|state| summary(&state.script_lines)).await
    }

    pub async fn is_generating(&self) -> bool {
        self.pipeline.is_generating(Stage::BrollPrompting).await
    }
}
