//! Plain-text summary of a finished run.

use std::fmt::Write;

use reelcraft::pipeline::progress;
use reelcraft::stages::{broll, script, video};
use reelcraft::PipelineRoot;

pub fn render(state: &PipelineRoot) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    write_report(&mut out, state)?;
    Ok(out)
}

fn write_report(out: &mut String, state: &PipelineRoot) -> std::fmt::Result {
    writeln!(out, "Progress: {:.0}%", progress::total(&state.progress))?;
    for entry in &state.progress {
        let mark = if entry.completed { "x" } else { " " };
        writeln!(
            out,
            "  [{}] {:<18} {:>5.1}%",
            mark,
            entry.stage.label(),
            entry.percentage
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Approved ideas:")?;
    for idea in state.approved_ideas() {
        writeln!(out, "  - {} ({})", idea.title, idea.source)?;
    }

    let stats = script::stats(&state.script.content);
    writeln!(out)?;
    writeln!(
        out,
        "Script: {} characters, {} words, ~{} min, {} saved version(s)",
        stats.characters,
        stats.words,
        stats.minutes,
        state.script.versions.len()
    )?;
    if let Some(version) = state.script.active_version() {
        writeln!(out, "  Active version: {} by {}", version.id, version.author)?;
    }

    let prompts = broll::summary(&state.script_lines);
    writeln!(
        out,
        "B-roll: {} lines, {} generated prompts, {} edited",
        prompts.lines, prompts.generated, prompts.edited
    )?;

    let timeline = video::timeline(state);
    if timeline.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(
        out,
        "Timeline ({}):",
        video::format_duration(video::total_duration(&state.video_clips))
    )?;
    for entry in timeline {
        let number = entry
            .line_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string());
        writeln!(
            out,
            "  {:>3}. {:>5}  {}",
            number,
            video::format_duration(entry.duration_secs),
            entry.text
        )?;
        writeln!(out, "        {}", entry.url)?;
    }
    Ok(())
}
