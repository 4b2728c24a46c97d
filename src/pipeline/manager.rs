//! Automerge-backed state store for the pipeline.
//!
//! `PipelineManager` wraps an Automerge document holding a [`PipelineRoot`] and
//! provides:
//! - `get_state()` to hydrate the whole state (cached)
//! - `update_state()` for "read current, compute new, replace" updates
//! - `save()` / `from_bytes()` for in-memory snapshots

use automerge::{AutoCommit, ChangeHash};
use autosurgeon::{hydrate, reconcile};

use super::model::{PipelineRoot, Stage};
use super::progress;
use crate::error::{PipelineError, PipelineResult};

/// Owner of the pipeline state document.
///
/// # Caching Strategy
///
/// `cached_state` holds the last hydrated or reconciled root. It is replaced on
/// every successful update and dropped when the document is reloaded.
pub struct PipelineManager {
    doc: AutoCommit,
    /// Cached hydrated state.
    cached_state: Option<PipelineRoot>,
}

impl PipelineManager {
    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Creates a manager holding the initial pipeline state.
    pub fn new() -> PipelineResult<Self> {
        Self::with_root(PipelineRoot::new())
    }

    /// Creates a manager holding `root`.
    pub fn with_root(root: PipelineRoot) -> PipelineResult<Self> {
        let mut doc = AutoCommit::new();
        reconcile(&mut doc, &root)?;
        Ok(Self {
            doc,
            cached_state: Some(root),
        })
    }

    /// Creates a PipelineManager from a saved snapshot.
    pub fn from_bytes(bytes: &[u8]) -> PipelineResult<Self> {
        let doc = AutoCommit::load(bytes)?;
        let mut manager = Self {
            doc,
            cached_state: None,
        };
        // Fail early on documents that do not hold a pipeline.
        manager.get_state()?;
        Ok(manager)
    }

    /// Saves the document to binary format.
    pub fn save(&mut self) -> Vec<u8> {
        self.doc.save()
    }

    /// Returns the current heads, one per concurrent change.
    pub fn get_heads(&mut self) -> Vec<ChangeHash> {
        self.doc.get_heads()
    }

    // =========================================================================
    // HIGH-LEVEL OPERATIONS (via Hydrate/Reconcile)
    // =========================================================================

    /// Hydrates the entire document state to Rust structs.
    pub fn get_state(&mut self) -> PipelineResult<PipelineRoot> {
        if let Some(ref cached) = self.cached_state {
            return Ok(cached.clone());
        }
        let state: PipelineRoot = hydrate(&self.doc)?;
        self.cached_state = Some(state.clone());
        Ok(state)
    }

    /// Borrow of the cached state, hydrating first if needed.
    pub fn state(&mut self) -> PipelineResult<&PipelineRoot> {
        let state = match self.cached_state.take() {
            Some(state) => state,
            None => hydrate(&self.doc)?,
        };
        let state: &PipelineRoot = self.cached_state.insert(state);
        Ok(state)
    }

    /// Computes a new state from the current one and reconciles it back.
    ///
    /// The closure works on a copy. If it returns an error nothing is written,
    /// so guarded operations never leave partial changes behind.
    pub fn update_state<F, T>(&mut self, f: F) -> PipelineResult<T>
    where
        F: FnOnce(&mut PipelineRoot) -> PipelineResult<T>,
    {
        let mut state = self.get_state()?;
        let out = f(&mut state)?;
        reconcile(&mut self.doc, &state)?;
        self.cached_state = Some(state);
        Ok(out)
    }

    /// Replaces the whole state.
    pub fn replace_state(&mut self, root: PipelineRoot) -> PipelineResult<()> {
        self.update_state(|state| {
            *state = root;
            Ok(())
        })
    }

    /// Points the pipeline at `stage`.
    pub fn set_current_stage(&mut self, stage: Stage) -> PipelineResult<()> {
        self.update_state(|state| {
            state.current_stage = stage;
            Ok(())
        })
    }

    /// Replaces one stage's progress entry.
    pub fn update_progress(
        &mut self,
        stage: Stage,
        percentage: f64,
        completed: bool,
    ) -> PipelineResult<()> {
        self.update_state(|state| {
            state.progress = progress::update(&state.progress, stage, percentage, completed);
            Ok(())
        })
    }

    /// Converts the current state to JSON.
    pub fn to_json(&mut self) -> PipelineResult<serde_json::Value> {
        let state = self.state()?;
        serde_json::to_value(state).map_err(|e| PipelineError::serialization(e.to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::model::{Approval, Idea, ScriptLine};

    #[test]
    fn test_new_manager() {
        let mut manager = PipelineManager::new().unwrap();
        let state = manager.get_state().unwrap();
        assert_eq!(state.current_stage, Stage::IdeaGeneration);
        assert!(state.ideas.is_empty());
        assert_eq!(state.progress.len(), 4);
    }

    #[test]
    fn test_update_state_replaces_collection() {
        let mut manager = PipelineManager::new().unwrap();
        manager
            .update_state(|state| {
                state.ideas = vec![Idea::new("1", "First"), Idea::new("2", "Second")];
                Ok(())
            })
            .unwrap();

        let state = manager.get_state().unwrap();
        assert_eq!(state.ideas.len(), 2);
        assert_eq!(state.ideas[1].title, "Second");
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let mut manager = PipelineManager::new().unwrap();
        let heads_before = manager.get_heads();

        let result: PipelineResult<()> = manager.update_state(|state| {
            state.ideas.push(Idea::new("1", "Dropped"));
            Err(PipelineError::idea_not_found("1"))
        });

        assert!(matches!(result, Err(PipelineError::IdeaNotFound(_))));
        assert!(manager.get_state().unwrap().ideas.is_empty());
        assert_eq!(manager.get_heads(), heads_before);
    }

    #[test]
    fn test_save_and_load() {
        let mut manager = PipelineManager::new().unwrap();
        manager
            .update_state(|state| {
                state.ideas =
                    vec![Idea::new("1", "Saved").with_approval(Approval::Approved)];
                state.script.content = "Hey everyone!".to_string();
                state.script_lines = vec![ScriptLine::new("line-0", 1, "Hey everyone!")];
                state.current_stage = Stage::BrollPrompting;
                Ok(())
            })
            .unwrap();
        manager
            .update_progress(Stage::IdeaGeneration, 100.0, true)
            .unwrap();

        let bytes = manager.save();
        let mut loaded = PipelineManager::from_bytes(&bytes).unwrap();

        let original = manager.get_state().unwrap();
        let state = loaded.get_state().unwrap();
        assert_eq!(state, original);
        assert_eq!(state.ideas[0].approval, Approval::Approved);
        assert_eq!(state.current_stage, Stage::BrollPrompting);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(PipelineManager::from_bytes(b"not an automerge document").is_err());
    }

    #[test]
    fn test_update_progress() {
        let mut manager = PipelineManager::new().unwrap();
        manager
            .update_progress(Stage::BrollPrompting, 75.0, false)
            .unwrap();

        let state = manager.get_state().unwrap();
        let entry = state.progress_of(Stage::BrollPrompting).unwrap();
        assert_eq!(entry.percentage, 75.0);
        assert!(!entry.completed);
    }

    #[test]
    fn test_to_json() {
        let mut manager = PipelineManager::new().unwrap();
        manager.set_current_stage(Stage::ScriptCreation).unwrap();
        let json = manager.to_json().unwrap();
        assert_eq!(json["current_stage"], "script-creation");
        assert_eq!(json["progress"][0]["stage"], "idea-generation");
    }
}
