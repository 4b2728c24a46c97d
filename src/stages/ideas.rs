//! Idea generation stage: fetch trending news and review it.

use crate::error::{PipelineError, PipelineResult};
use crate::jobs::{Job, JobKey};
use crate::pipeline::model::{
    now_millis, Approval, Idea, InterestLevel, PipelineRoot, Sentiment, Stage, StageProgress,
};
use crate::pipeline::orchestrator::Pipeline;
use crate::pipeline::progress;

/// Progress reported right after a fetch, before any review.
pub const FETCHED_PERCENTAGE: f64 = 50.0;

/// The fixed set of trending items returned by the simulated news feed.
pub fn mock_ideas(created_at: i64) -> Vec<Idea> {
    let item = |id: &str, title: &str, description: &str, source: &str, url: &str| {
        let mut idea = Idea::new(id, title)
            .with_description(description)
            .with_source(source, url);
        idea.created_at = created_at;
        idea
    };

    vec![
        item(
            "1",
            "AI Breakthrough: New Language Model Achieves Human Parity",
            "Researchers announce a new AI model that performs at human levels across multiple benchmarks, raising questions about the future of work.",
            "TechCrunch",
            "https://techcrunch.com",
        )
        .with_sentiment(Sentiment::Positive)
        .with_interest(InterestLevel::High),
        item(
            "2",
            "Climate Summit Ends with Mixed Results",
            "World leaders gather for climate negotiations, achieving some progress but falling short on key emission targets.",
            "BBC News",
            "https://bbc.com",
        )
        .with_sentiment(Sentiment::Neutral)
        .with_interest(InterestLevel::Medium),
        item(
            "3",
            "Stock Market Volatility Continues Amid Economic Uncertainty",
            "Major indices show significant fluctuations as investors react to conflicting economic signals.",
            "Financial Times",
            "https://ft.com",
        )
        .with_sentiment(Sentiment::Negative)
        .with_interest(InterestLevel::Medium),
        item(
            "4",
            "Space Tourism Company Announces First Civilian Mars Mission",
            "Private space company reveals ambitious plans for the first commercial Mars expedition, scheduled for 2030.",
            "Space.com",
            "https://space.com",
        )
        .with_sentiment(Sentiment::Positive)
        .with_interest(InterestLevel::High),
        item(
            "5",
            "New Study Links Social Media Usage to Mental Health Concerns",
            "Comprehensive research study finds correlation between heavy social media use and increased anxiety among teenagers.",
            "The Guardian",
            "https://theguardian.com",
        )
        .with_sentiment(Sentiment::Negative)
        .with_interest(InterestLevel::High),
        item(
            "6",
            "Electric Vehicle Sales Reach Record Highs",
            "Global EV adoption accelerates with quarterly sales surpassing expectations across major markets.",
            "Reuters",
            "https://reuters.com",
        )
        .with_sentiment(Sentiment::Positive)
        .with_interest(InterestLevel::Medium),
    ]
}

/// Returns `ideas` with the approval of `id` set.
pub fn with_approval(ideas: &[Idea], id: &str, approved: bool) -> PipelineResult<Vec<Idea>> {
    if !ideas.iter().any(|idea| idea.id == id) {
        return Err(PipelineError::idea_not_found(id));
    }
    Ok(ideas
        .iter()
        .map(|idea| {
            if idea.id == id {
                idea.clone().with_approval(Approval::from(approved))
            } else {
                idea.clone()
            }
        })
        .collect())
}

/// Percentage and completion for a reviewed idea set.
pub fn approval_progress(ideas: &[Idea]) -> (f64, bool) {
    let approved = ideas.iter().filter(|idea| idea.is_approved()).count();
    (progress::ratio(approved, ideas.len()), approved > 0)
}

/// At least one idea is approved.
pub fn can_continue(root: &PipelineRoot) -> bool {
    root.ideas.iter().any(Idea::is_approved)
}

/// Controller for the idea generation stage.
pub struct IdeaController<'a> {
    pipeline: &'a Pipeline,
}

impl<'a> IdeaController<'a> {
    pub(crate) fn new(pipeline: &'a Pipeline) -> Self {
        Self { pipeline }
    }

    /// Starts a simulated news fetch.
    ///
    /// On completion the idea set is replaced and the stage sits at 50 %.
    pub async fn fetch(&self) -> PipelineResult<Job> {
        let delay = self.pipeline.config().await.timings.fetch();
        let ticket = self
            .pipeline
            .register(JobKey::Stage(Stage::IdeaGeneration))
            .await;
        let job = Job::new(ticket.key().clone(), ticket.token().clone());

        tracing::info!(delay_ms = delay.as_millis() as u64, "Fetching trending news");
        self.pipeline.schedule(&job, ticket, delay, |manager| {
            manager.update_state(|state| {
                state.ideas = mock_ideas(now_millis());
                state.progress = progress::update(
                    &state.progress,
                    Stage::IdeaGeneration,
                    FETCHED_PERCENTAGE,
                    false,
                );
                tracing::info!(count = state.ideas.len(), "Fetched trending ideas");
                Ok(())
            })
        });
        Ok(job)
    }

    /// Approves or rejects one idea and reports the new stage progress.
    pub async fn set_approval(&self, id: &str, approved: bool) -> PipelineResult<StageProgress> {
        let result = self
            .pipeline
            .update(|state| {
                state.ideas = with_approval(&state.ideas, id, approved)?;
                let (percentage, completed) = approval_progress(&state.ideas);
                state.progress = progress::update(
                    &state.progress,
                    Stage::IdeaGeneration,
                    percentage,
                    completed,
                );
                Ok(StageProgress {
                    stage: Stage::IdeaGeneration,
                    percentage,
                    completed,
                })
            })
            .await;

        match &result {
            Ok(entry) => tracing::debug!(id, approved, percentage = entry.percentage, "Reviewed idea"),
            Err(e) => tracing::warn!(id, error = %e, "Idea review rejected"),
        }
        result
    }

    /// All ideas in fetch order.
    pub async fn list(&self) -> PipelineResult<Vec<Idea>> {
        self.pipeline.read(|state| state.ideas.clone()).await
    }

    /// Approved ideas in fetch order.
    pub async fn approved(&self) -> PipelineResult<Vec<Idea>> {
        self.pipeline
            .read(|state| state.approved_ideas().into_iter().cloned().collect())
            .await
    }

    pub async fn is_fetching(&self) -> bool {
        self.pipeline.is_generating(Stage::IdeaGeneration).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, Timings};
    use crate::jobs::JobOutcome;
    use std::time::Duration;

    fn four_ideas() -> Vec<Idea> {
        (1..=4)
            .map(|i| Idea::new(i.to_string(), format!("Idea {}", i)))
            .collect()
    }

    #[test]
    fn test_mock_ideas_are_undecided() {
        let ideas = mock_ideas(0);
        assert_eq!(ideas.len(), 6);
        assert!(ideas.iter().all(|idea| idea.approval == Approval::Undecided));
        assert_eq!(ideas[0].source, "TechCrunch");
        assert_eq!(ideas[4].interest_level, InterestLevel::High);
    }

    #[test]
    fn test_two_of_four_is_half() {
        let mut ideas = four_ideas();
        ideas = with_approval(&ideas, "1", true).unwrap();
        ideas = with_approval(&ideas, "3", true).unwrap();

        let (percentage, completed) = approval_progress(&ideas);
        assert_eq!(percentage, 50.0);
        assert!(completed);
    }

    #[test]
    fn test_rejections_do_not_count() {
        let mut ideas = four_ideas();
        ideas = with_approval(&ideas, "1", true).unwrap();
        ideas = with_approval(&ideas, "1", false).unwrap();
        ideas = with_approval(&ideas, "2", false).unwrap();

        let (percentage, completed) = approval_progress(&ideas);
        assert_eq!(percentage, 0.0);
        assert!(!completed);
    }

    #[test]
    fn test_completion_tracks_any_approval() {
        // Alternate approvals and rejections; completion must always match
        // "some idea is approved right now".
        let steps = [("1", true), ("2", false), ("1", false), ("4", true), ("4", false)];
        let mut ideas = four_ideas();
        for (id, approved) in steps {
            ideas = with_approval(&ideas, id, approved).unwrap();
            let (_, completed) = approval_progress(&ideas);
            assert_eq!(completed, ideas.iter().any(Idea::is_approved));
        }
    }

    #[test]
    fn test_unknown_idea() {
        let result = with_approval(&four_ideas(), "99", true);
        assert!(matches!(result, Err(PipelineError::IdeaNotFound(id)) if id == "99"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_replaces_ideas_after_delay() {
        let pipeline = Pipeline::new(AppConfig::default()).unwrap();
        let job = pipeline.ideas().fetch().await.unwrap();

        assert!(pipeline.ideas().is_fetching().await);
        assert!(pipeline.ideas().list().await.unwrap().is_empty());

        assert_eq!(job.join().await, JobOutcome::Completed);
        let ideas = pipeline.ideas().list().await.unwrap();
        assert_eq!(ideas.len(), 6);
        assert!(!pipeline.ideas().is_fetching().await);

        let progress = pipeline.progress().await.unwrap();
        assert_eq!(progress[0].percentage, FETCHED_PERCENTAGE);
        assert!(!progress[0].completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_is_not_done_early() {
        let pipeline = Pipeline::new(AppConfig::default()).unwrap();
        let _job = pipeline.ideas().fetch().await.unwrap();

        tokio::time::sleep(Duration::from_millis(1400)).await;
        assert!(pipeline.ideas().list().await.unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(pipeline.ideas().list().await.unwrap().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_cancels_pending_fetch() {
        let pipeline = Pipeline::new(AppConfig::default()).unwrap();
        let first = pipeline.ideas().fetch().await.unwrap();
        let second = pipeline.ideas().fetch().await.unwrap();

        assert_eq!(first.join().await, JobOutcome::Cancelled);
        assert_eq!(second.join().await, JobOutcome::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_approval_updates_progress() {
        let config = AppConfig::default().with_timings(Timings::instant());
        let pipeline = Pipeline::new(config).unwrap();
        pipeline.ideas().fetch().await.unwrap().join().await;

        let entry = pipeline.ideas().set_approval("1", true).await.unwrap();
        assert!(entry.completed);
        assert!((entry.percentage - 100.0 / 6.0).abs() < 1e-9);

        pipeline.ideas().set_approval("2", true).await.unwrap();
        pipeline.ideas().set_approval("3", false).await.unwrap();
        let approved = pipeline.ideas().approved().await.unwrap();
        assert_eq!(approved.len(), 2);
        assert!(pipeline.can_continue(Stage::IdeaGeneration).await.unwrap());

        let progress = pipeline.progress().await.unwrap();
        assert!((progress[0].percentage - 100.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_set_approval_unknown_leaves_state() {
        let pipeline = Pipeline::new(AppConfig::default()).unwrap();
        let before = pipeline.state().await.unwrap();
        assert!(pipeline.ideas().set_approval("1", true).await.is_err());
        assert_eq!(pipeline.state().await.unwrap(), before);
    }
}
