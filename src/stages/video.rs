//! Video generation stage: render one clip per script line.

use rand::Rng;

use crate::error::{PipelineError, PipelineResult};
use crate::jobs::{Job, JobKey};
use crate::pipeline::model::{
    now_millis, ClipStatus, PipelineRoot, ScriptLine, Stage, VideoClip,
};
use crate::pipeline::orchestrator::Pipeline;
use crate::pipeline::progress;

/// Shortest simulated clip, in seconds (inclusive).
pub const MIN_DURATION_SECS: u32 = 5;

/// Longest simulated clip, in seconds (exclusive).
pub const MAX_DURATION_SECS: u32 = 15;

const ASSET_BASE_URL: &str = "https://example.com";

/// Uniform whole-second duration in `[MIN_DURATION_SECS, MAX_DURATION_SECS)`.
pub fn random_duration() -> u32 {
    rand::thread_rng().gen_range(MIN_DURATION_SECS..MAX_DURATION_SECS)
}

/// Like [`random_duration`], but never returns `previous`.
pub fn random_duration_except(previous: u32) -> u32 {
    let mut rng = rand::thread_rng();
    if !(MIN_DURATION_SECS..MAX_DURATION_SECS).contains(&previous) {
        return rng.gen_range(MIN_DURATION_SECS..MAX_DURATION_SECS);
    }
    let pick = rng.gen_range(MIN_DURATION_SECS..MAX_DURATION_SECS - 1);
    if pick >= previous {
        pick + 1
    } else {
        pick
    }
}

/// Asset URL for the first render of a line.
pub fn clip_url(line_id: &str) -> String {
    format!("{}/video-{}.mp4", ASSET_BASE_URL, line_id)
}

/// Asset URL for a re-render, disambiguated by time.
pub fn regenerated_url(clip_id: &str, at_millis: i64) -> String {
    format!("{}/video-{}-{}.mp4", ASSET_BASE_URL, clip_id, at_millis)
}

/// One `generating` clip per line, in line order.
pub fn pending_clips(lines: &[ScriptLine]) -> Vec<VideoClip> {
    lines.iter().map(VideoClip::pending).collect()
}

/// Returns `clips` with `clip_id` set back to `generating`. URL and duration are kept.
pub fn with_clip_generating(clips: &[VideoClip], clip_id: &str) -> PipelineResult<Vec<VideoClip>> {
    if !clips.iter().any(|clip| clip.id == clip_id) {
        return Err(PipelineError::clip_not_found(clip_id));
    }
    Ok(clips
        .iter()
        .map(|clip| {
            if clip.id == clip_id {
                VideoClip {
                    status: ClipStatus::Generating,
                    ..clip.clone()
                }
            } else {
                clip.clone()
            }
        })
        .collect())
}

/// Returns `clips` with `clip_id` marked ready with the given asset.
///
/// `updated_at` refreshes the timestamp when given.
pub fn with_clip_ready(
    clips: &[VideoClip],
    clip_id: &str,
    url: String,
    duration_secs: u32,
    updated_at: Option<i64>,
) -> Vec<VideoClip> {
    clips
        .iter()
        .map(|clip| {
            if clip.id == clip_id {
                VideoClip {
                    url: url.clone(),
                    duration_secs,
                    status: ClipStatus::Ready,
                    updated_at: updated_at.unwrap_or(clip.updated_at),
                    ..clip.clone()
                }
            } else {
                clip.clone()
            }
        })
        .collect()
}

/// Percentage and completion relative to the number of script lines.
/// `None` while no clip exists.
pub fn clip_progress(clips: &[VideoClip], line_count: usize) -> Option<(f64, bool)> {
    if clips.is_empty() {
        return None;
    }
    let ready = clips.iter().filter(|clip| clip.is_ready()).count();
    Some((
        progress::ratio(ready, line_count),
        line_count > 0 && ready == line_count,
    ))
}

/// Replaces the clip set and recomputes the stage progress.
pub(crate) fn replace_clips(root: &mut PipelineRoot, clips: Vec<VideoClip>) {
    root.video_clips = clips;
    if let Some((percentage, completed)) =
        clip_progress(&root.video_clips, root.script_lines.len())
    {
        root.progress = progress::update(
            &root.progress,
            Stage::VideoGeneration,
            percentage,
            completed,
        );
    }
}

/// All clips are rendered; the timeline can be exported.
pub fn can_export(root: &PipelineRoot) -> bool {
    !root.video_clips.is_empty() && root.video_clips.iter().all(VideoClip::is_ready)
}

/// Sum of clip durations in seconds.
pub fn total_duration(clips: &[VideoClip]) -> u32 {
    clips.iter().map(|clip| clip.duration_secs).sum()
}

/// `m:ss`.
pub fn format_duration(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// A clip placed on the timeline next to its narration.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub clip_id: String,
    pub line_number: Option<u32>,
    pub text: String,
    pub prompt: String,
    pub url: String,
    pub duration_secs: u32,
    pub status: ClipStatus,
}

pub fn timeline(root: &PipelineRoot) -> Vec<TimelineEntry> {
    root.video_clips
        .iter()
        .map(|clip| {
            let line = root.line_for_clip(clip);
            TimelineEntry {
                clip_id: clip.id.clone(),
                line_number: line.map(|l| l.line_number),
                text: line.map(|l| l.text.clone()).unwrap_or_default(),
                prompt: line
                    .map(|l| l.effective_prompt().to_string())
                    .unwrap_or_default(),
                url: clip.url.clone(),
                duration_secs: clip.duration_secs,
                status: clip.status,
            }
        })
        .collect()
}

/// Controller for the video generation stage.
pub struct VideoController<'a> {
    pipeline: &'a Pipeline,
}

impl<'a> VideoController<'a> {
    pub(crate) fn new(pipeline: &'a Pipeline) -> Self {
        Self { pipeline }
    }

    /// Queues a clip for every script line.
    ///
    /// Requires a provider credential. Pending renders from an earlier batch or
    /// regeneration are cancelled first. Clip `i` is ready after
    /// `(i + 1) * clip_stagger`.
    pub async fn generate_all(&self) -> PipelineResult<Job> {
        let config = self.pipeline.config().await;
        if !config.has_credential() {
            tracing::warn!("Video generation rejected: no provider credential configured");
            return Err(PipelineError::MissingCredential);
        }

        let mut workspace = self.pipeline.lock().await;
        let lines = workspace.manager.state()?.script_lines.clone();
        if lines.is_empty() {
            tracing::warn!("Video generation rejected: no script lines");
            return Err(PipelineError::NoScriptLines);
        }

        let clips = pending_clips(&lines);
        workspace.manager.update_state(|state| {
            replace_clips(state, clips.clone());
            Ok(())
        })?;
        let cancelled = workspace.jobs.cancel_stage(Stage::VideoGeneration);
        let batch = workspace.jobs.start(JobKey::Stage(Stage::VideoGeneration));
        let tickets: Vec<_> = clips
            .iter()
            .map(|clip| {
                workspace
                    .jobs
                    .start_child(JobKey::Clip(clip.id.clone()), batch.token())
            })
            .collect();
        drop(workspace);

        let job = Job::new(batch.key().clone(), batch.token().clone());
        let renders = Job::new(batch.key().clone(), batch.token().clone());

        tracing::info!(
            clips = clips.len(),
            cancelled,
            model = %config.ai_model,
            "Generating video clips"
        );
        for (index, ((clip, line), ticket)) in clips.into_iter().zip(lines).zip(tickets).enumerate()
        {
            let delay = config.timings.clip(index);
            self.pipeline.schedule(&renders, ticket, delay, move |manager| {
                manager.update_state(|state| {
                    let clips = with_clip_ready(
                        &state.video_clips,
                        &clip.id,
                        clip_url(&line.id),
                        random_duration(),
                        None,
                    );
                    replace_clips(state, clips);
                    tracing::debug!(clip = %clip.id, "Clip ready");
                    Ok(())
                })
            });
        }

        // The batch slot stays registered until every render has landed or bailed.
        let pipeline = self.pipeline.clone();
        job.spawn(async move {
            renders.join().await;
            pipeline.lock().await.jobs.finish(&batch);
        });
        Ok(job)
    }

    /// Re-renders one clip. Other clips are untouched.
    pub async fn regenerate(&self, clip_id: &str) -> PipelineResult<Job> {
        let delay = self.pipeline.config().await.timings.regenerate();

        let mut workspace = self.pipeline.lock().await;
        workspace.manager.update_state(|state| {
            let clips = with_clip_generating(&state.video_clips, clip_id)?;
            replace_clips(state, clips);
            Ok(())
        })?;
        let ticket = workspace.jobs.start(JobKey::Clip(clip_id.to_string()));
        drop(workspace);

        let job = Job::new(ticket.key().clone(), ticket.token().clone());
        let id = clip_id.to_string();
        tracing::info!(clip = %id, "Regenerating clip");
        self.pipeline.schedule(&job, ticket, delay, move |manager| {
            manager.update_state(|state| {
                let now = now_millis();
                let previous = state
                    .video_clips
                    .iter()
                    .find(|clip| clip.id == id)
                    .map(|clip| clip.duration_secs)
                    .unwrap_or_default();
                let clips = with_clip_ready(
                    &state.video_clips,
                    &id,
                    regenerated_url(&id, now),
                    random_duration_except(previous),
                    Some(now),
                );
                replace_clips(state, clips);
                tracing::info!(clip = %id, "Clip regenerated");
                Ok(())
            })
        });
        Ok(job)
    }

    pub async fn clips(&self) -> PipelineResult<Vec<VideoClip>> {
        self.pipeline.read(|state| state.video_clips.clone()).await
    }

    pub async fn timeline(&self) -> PipelineResult<Vec<TimelineEntry>> {
        self.pipeline.read(timeline).await
    }

    pub async fn total_duration(&self) -> PipelineResult<u32> {
        self.pipeline
            .read(|state| total_duration(&state.video_clips))
            .await
    }

    pub async fn can_export(&self) -> PipelineResult<bool> {
        self.pipeline.read(can_export).await
    }

    pub async fn is_generating(&self) -> bool {
        self.pipeline.is_generating(Stage::VideoGeneration).await
    }
}
