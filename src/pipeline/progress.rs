//! Stage progress model.
//!
//! Pure functions over the per-stage progress list. Updates return a new list;
//! the caller swaps it into the document.

use super::model::{Stage, StageProgress};

/// Returns a copy of `progress` with the entry for `stage` replaced.
///
/// The percentage is stored as given. Callers are expected to keep it in
/// `0..=100`.
pub fn update(
    progress: &[StageProgress],
    stage: Stage,
    percentage: f64,
    completed: bool,
) -> Vec<StageProgress> {
    progress
        .iter()
        .map(|entry| {
            if entry.stage == stage {
                StageProgress {
                    stage,
                    percentage,
                    completed,
                }
            } else {
                entry.clone()
            }
        })
        .collect()
}

/// Arithmetic mean of all stage percentages.
pub fn total(progress: &[StageProgress]) -> f64 {
    if progress.is_empty() {
        return 0.0;
    }
    progress.iter().map(|p| p.percentage).sum::<f64>() / progress.len() as f64
}

/// Number of stages flagged as completed.
pub fn completed_count(progress: &[StageProgress]) -> usize {
    progress.iter().filter(|p| p.completed).count()
}

/// True once the aggregate reaches exactly 100.
pub fn all_complete(progress: &[StageProgress]) -> bool {
    total(progress) == 100.0
}

/// `part / whole * 100`, capped at 100. Zero when `whole` is zero.
pub fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initial() -> Vec<StageProgress> {
        Stage::ALL.into_iter().map(StageProgress::new).collect()
    }

    #[test]
    fn test_update_replaces_only_target() {
        let before = initial();
        let after = update(&before, Stage::ScriptCreation, 40.0, false);

        assert_eq!(after.len(), 4);
        assert_eq!(after[1].percentage, 40.0);
        assert_eq!(after[0], before[0]);
        assert_eq!(after[2], before[2]);
        assert_eq!(after[3], before[3]);
        // The input is left alone.
        assert_eq!(before[1].percentage, 0.0);
    }

    #[test]
    fn test_total_is_mean() {
        let mut progress = initial();
        progress = update(&progress, Stage::IdeaGeneration, 100.0, true);
        progress = update(&progress, Stage::ScriptCreation, 50.0, false);
        assert_eq!(total(&progress), 37.5);
        assert_eq!(completed_count(&progress), 1);
        assert!(!all_complete(&progress));
    }

    #[test]
    fn test_all_complete() {
        let mut progress = initial();
        for stage in Stage::ALL {
            progress = update(&progress, stage, 100.0, true);
        }
        assert!(all_complete(&progress));
        assert_eq!(completed_count(&progress), 4);
    }

    #[test]
    fn test_out_of_range_is_not_clamped() {
        let progress = update(&initial(), Stage::VideoGeneration, 140.0, true);
        assert_eq!(progress[3].percentage, 140.0);
        assert_eq!(total(&progress), 35.0);
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(2, 4), 50.0);
        assert_eq!(ratio(5, 4), 100.0);
        assert_eq!(ratio(0, 0), 0.0);
        assert_eq!(total(&[]), 0.0);
    }
}
