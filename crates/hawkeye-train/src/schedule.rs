use serde::{Deserialize, Serialize};

/// Step decay of the learning rate at fixed epochs.
///
/// The rate of epoch `e` is `base * gamma^k` where `k` is the number of milestones
/// lower than or equal to `e`.
///
/// # Example
///
/// ```
/// use hawkeye_train::MultiStepLr;
///
/// let schedule = MultiStepLr::new(1e-2, vec![20, 30], 0.1);
/// assert_eq!(schedule.lr(19), 1e-2);
/// assert!((schedule.lr(20) - 1e-3).abs() < 1e-8);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiStepLr {
    base: f32,
    milestones: Vec<usize>,
    gamma: f32,
}

impl MultiStepLr {
    /// Create a schedule; the milestones are sorted.
    pub fn new(base: f32, mut milestones: Vec<usize>, gamma: f32) -> Self {
        milestones.sort_unstable();
        Self {
            base,
            milestones,
            gamma,
        }
    }

    /// The learning rate used during `epoch`.
    pub fn lr(&self, epoch: usize) -> f32 {
        let passed = self.milestones.iter().filter(|m| **m <= epoch).count();
        self.base * self.gamma.powi(passed as i32)
    }
}
