//! Progress reporting for multi-stage loads
//!
//! Long-running work (triangle ingest, octree subdivision) reports a
//! [`Progress`] value after every batch. [`WeightedProgress`] folds the
//! per-stage values of a pipeline into a single overall value so a loading
//! indicator sees one monotonic bar.

/// Amount of work done out of a total, both in an abstract unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Work completed so far
    pub loaded: f32,
    /// Total amount of work
    pub total: f32,
}

impl Progress {
    /// Create a progress value
    pub fn new(loaded: f32, total: f32) -> Self {
        Self { loaded, total }
    }

    /// Progress value for an already finished stage
    pub fn complete() -> Self {
        Self { loaded: 1.0, total: 1.0 }
    }

    /// Normalized completion in [0, 1]
    ///
    /// A zero or negative total counts as complete.
    pub fn fraction(&self) -> f32 {
        if self.total <= 0.0 {
            return 1.0;
        }
        (self.loaded / self.total).clamp(0.0, 1.0)
    }

    /// Whether the stage has finished
    pub fn is_complete(&self) -> bool {
        self.fraction() >= 1.0
    }
}

/// One stage of a weighted pipeline
#[derive(Debug, Clone)]
struct Stage {
    name: &'static str,
    weight: f32,
    fraction: f32,
}

/// Combines the progress of sequential stages into one overall value
///
/// Each stage carries a weight; the overall fraction is the weighted sum of
/// stage fractions divided by the sum of weights. Stage fractions only move
/// forward, so the overall value is non-decreasing.
#[derive(Debug, Clone, Default)]
pub struct WeightedProgress {
    stages: Vec<Stage>,
}

impl WeightedProgress {
    /// Create an aggregator with no stages
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stage and return its index
    pub fn add_stage(&mut self, name: &'static str, weight: f32) -> usize {
        self.stages.push(Stage {
            name,
            weight: weight.max(0.0),
            fraction: 0.0,
        });
        self.stages.len() - 1
    }

    /// Record progress for a stage and return the combined value
    pub fn report(&mut self, stage: usize, progress: Progress) -> Progress {
        if let Some(entry) = self.stages.get_mut(stage) {
            entry.fraction = entry.fraction.max(progress.fraction());
        } else {
            log::warn!("Progress reported for unknown stage {stage}");
        }
        self.overall()
    }

    /// Mark a stage as finished and return the combined value
    pub fn complete(&mut self, stage: usize) -> Progress {
        self.report(stage, Progress::complete())
    }

    /// Combined progress across all stages
    pub fn overall(&self) -> Progress {
        let total: f32 = self.stages.iter().map(|s| s.weight).sum();
        if total <= 0.0 {
            let done = self.stages.iter().all(|s| s.fraction >= 1.0);
            return Progress::new(if done { 1.0 } else { 0.0 }, 1.0);
        }
        if self.stages.iter().all(|s| s.fraction >= 1.0) {
            return Progress::new(total, total);
        }
        let loaded: f32 = self.stages.iter().map(|s| s.weight * s.fraction).sum();
        Progress::new(loaded.min(total), total)
    }

    /// Name of a stage
    pub fn stage_name(&self, stage: usize) -> Option<&'static str> {
        self.stages.get(stage).map(|s| s.name)
    }
}
