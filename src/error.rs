//! Error types for the video creation pipeline.

use thiserror::Error;

use crate::pipeline::model::Stage;

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur while driving the pipeline.
///
/// Every operation that returns one of these leaves the pipeline state untouched.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Automerge error during document operations.
    #[error("Automerge error: {0}")]
    Automerge(#[from] automerge::AutomergeError),

    /// Autosurgeon hydration error.
    #[error("Hydration error: {0}")]
    Hydrate(#[from] autosurgeon::HydrateError),

    /// Autosurgeon reconcile error.
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] autosurgeon::ReconcileError),

    /// No idea with this id exists.
    #[error("Idea not found: {0}")]
    IdeaNotFound(String),

    /// No script line with this id exists.
    #[error("Script line not found: {0}")]
    LineNotFound(String),

    /// No video clip with this id exists.
    #[error("Video clip not found: {0}")]
    ClipNotFound(String),

    /// Index out of bounds for list operations (script versions).
    #[error("Index {index} out of bounds for list of length {length}")]
    IndexOutOfBounds { index: usize, length: usize },

    /// Video generation was requested without a provider credential.
    #[error("Please configure your provider API key in settings")]
    MissingCredential,

    /// B-roll prompting needs script content.
    #[error("Script is empty")]
    EmptyScript,

    /// Video generation needs b-roll script lines.
    #[error("No script lines to generate clips for")]
    NoScriptLines,

    /// The stage's continue gate is not satisfied yet.
    #[error("Cannot continue past stage '{0}' yet")]
    StageLocked(Stage),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PipelineError {
    /// Creates an IdeaNotFound error.
    pub fn idea_not_found(id: impl Into<String>) -> Self {
        Self::IdeaNotFound(id.into())
    }

    /// Creates a LineNotFound error.
    pub fn line_not_found(id: impl Into<String>) -> Self {
        Self::LineNotFound(id.into())
    }

    /// Creates a ClipNotFound error.
    pub fn clip_not_found(id: impl Into<String>) -> Self {
        Self::ClipNotFound(id.into())
    }

    /// Creates an IndexOutOfBounds error.
    pub fn index_out_of_bounds(index: usize, length: usize) -> Self {
        Self::IndexOutOfBounds { index, length }
    }

    /// Creates a Serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// True for errors raised by a guard (bad id, missing precondition) rather
    /// than by the state document itself.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            Self::Automerge(_) | Self::Hydrate(_) | Self::Reconcile(_) | Self::Serialization(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_message_is_user_facing() {
        let err = PipelineError::MissingCredential;
        assert_eq!(err.to_string(), "Please configure your provider API key in settings");
        assert!(err.is_rejection());
    }

    #[test]
    fn test_index_out_of_bounds_message() {
        let err = PipelineError::index_out_of_bounds(3, 2);
        assert_eq!(err.to_string(), "Index 3 out of bounds for list of length 2");
    }

    #[test]
    fn test_serialization_is_not_rejection() {
        assert!(!PipelineError::serialization("bad").is_rejection());
    }
}
