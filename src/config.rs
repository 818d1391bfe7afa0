//! # Run Tuning
//!
//! Pipeline tuning knobs for a reconciliation run. Classification
//! thresholds are fixed policy and live in [`crate::classify`]; this only
//! shapes the plumbing.

/// Tuning for one reconciliation run.
#[derive(Debug, Clone)]
pub struct RunTuning {
    /// Bounded capacity of each pipeline queue; the backpressure point
    /// between the evaluator and the two consumers.
    pub queue_capacity: usize,
    /// Keep evaluating the remaining owners when scoring one of them
    /// fails, logging the failure instead of aborting the run.
    pub isolate_evaluation_errors: bool,
}

impl Default for RunTuning {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            isolate_evaluation_errors: true,
        }
    }
}

impl RunTuning {
    /// Balanced configuration (the default)
    pub fn balanced() -> Self {
        Self::default()
    }

    /// Small queues for interactive runs over modest batches
    pub fn low_latency() -> Self {
        Self {
            queue_capacity: 32,
            ..Self::default()
        }
    }

    /// Large queues for big offline reconciliation passes
    pub fn bulk() -> Self {
        Self {
            queue_capacity: 2048,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuning_presets() {
        let balanced = RunTuning::balanced();
        assert_eq!(balanced.queue_capacity, 256);
        assert!(balanced.isolate_evaluation_errors);

        assert_eq!(RunTuning::low_latency().queue_capacity, 32);
        assert_eq!(RunTuning::bulk().queue_capacity, 2048);
    }
}
