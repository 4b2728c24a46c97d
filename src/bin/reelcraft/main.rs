//! Headless run of the whole video creation wizard.
//!
//! Usage:
//!   reelcraft [--api-key KEY] [--model NAME] [--approve ID...] [--until STAGE] [--fast] [--snapshot out.automerge] [--json]

mod report;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use reelcraft::{AppConfig, ClipStatus, Pipeline, Stage, Timings};

#[derive(Parser, Debug)]
#[command(
    name = "reelcraft",
    about = "Run the ideas -> script -> b-roll -> clips pipeline end to end",
    version
)]
struct Args {
    /// Video provider credential (clip rendering is skipped without one)
    #[arg(long, env = "REELCRAFT_API_KEY", default_value = "")]
    api_key: String,

    /// AI model identifier
    #[arg(long, env = "REELCRAFT_MODEL", default_value = reelcraft::config::DEFAULT_MODEL)]
    model: String,

    /// Idea ids to approve (defaults to the first fetched idea)
    #[arg(short, long, num_args = 1..)]
    approve: Vec<String>,

    /// Stop after this stage (idea-generation, script-creation, broll-prompting, video-generation)
    #[arg(long, value_parser = parse_stage)]
    until: Option<Stage>,

    /// Skip the simulated latencies
    #[arg(long)]
    fast: bool,

    /// Write the final state document to this path
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Print the final state as JSON instead of the report
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "reelcraft=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = AppConfig::new()
        .with_model(&args.model)
        .with_api_key(&args.api_key);
    if args.fast {
        config = config.with_timings(Timings::instant());
    }
    let pipeline = Pipeline::new(config).context("Failed to create pipeline")?;

    run_stages(&pipeline, &args).await?;

    // Output
    if let Some(path) = &args.snapshot {
        let bytes = pipeline.save().await;
        std::fs::write(path, &bytes)
            .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
        eprintln!("Wrote {} bytes to {}", bytes.len(), path.display());
    }

    if args.json {
        let json = pipeline.to_json().await?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        let state = pipeline.state().await?;
        let text = report::render(&state).context("Failed to render report")?;
        print!("{}", text);
        println!();
        println!("{}", pipeline.status_line().await?);
    }

    Ok(())
}

fn parse_stage(id: &str) -> Result<Stage, String> {
    Stage::from_id(id).ok_or_else(|| format!("unknown stage '{}'", id))
}

/// Drives each stage in order, stopping after `--until` if given.
async fn run_stages(pipeline: &Pipeline, args: &Args) -> Result<()> {
    // 1. Ideas
    pipeline.ideas().fetch().await?.join().await;
    let approve = if args.approve.is_empty() {
        pipeline
            .ideas()
            .list()
            .await?
            .first()
            .map(|idea| vec![idea.id.clone()])
            .unwrap_or_default()
    } else {
        args.approve.clone()
    };
    for id in &approve {
        pipeline
            .ideas()
            .set_approval(id, true)
            .await
            .with_context(|| format!("Failed to approve idea {}", id))?;
    }
    if args.until == Some(Stage::IdeaGeneration) {
        return Ok(());
    }
    pipeline
        .continue_to_next()
        .await
        .context("No idea approved")?;

    // 2. Script
    pipeline.script().generate().await?.join().await;
    if args.until == Some(Stage::ScriptCreation) {
        return Ok(());
    }
    pipeline.continue_to_next().await?;

    // 3. B-roll prompts
    pipeline.broll().generate_prompts().await?.join().await;
    if args.until == Some(Stage::BrollPrompting) {
        return Ok(());
    }
    pipeline.continue_to_next().await?;

    // 4. Clips
    match pipeline.video().generate_all().await {
        Ok(job) => {
            let total = pipeline.broll().lines().await?.len() as u64;
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .context("Invalid progress template")?
                    .progress_chars("=>-"),
            );
            pb.set_message("rendering clips");
            while pipeline.video().is_generating().await {
                let ready = pipeline
                    .video()
                    .clips()
                    .await?
                    .iter()
                    .filter(|clip| clip.status == ClipStatus::Ready)
                    .count();
                pb.set_position(ready as u64);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            job.join().await;
            pb.set_position(total);
            pb.finish_with_message("clips ready");
        }
        Err(e) if e.is_rejection() => {
            eprintln!("Skipping clip rendering: {}", e);
        }
        Err(e) => return Err(e).context("Failed to start clip rendering"),
    }
    Ok(())
}
