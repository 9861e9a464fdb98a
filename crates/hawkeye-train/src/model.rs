use hawkeye_tensor::{Tensor3, Tensor4};

use crate::checkpoint::{CheckpointError, ModelState};

/// Whether a model runs with training behaviour (dropout, batch statistics) or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Training behaviour.
    Train,
    /// Evaluation behaviour.
    Eval,
}

/// A scalar loss that can be summed and read back.
pub trait LossValue {
    /// The scalar value.
    fn value(&self) -> f32;

    /// The sum of two losses.
    fn add(&self, other: &Self) -> Self;
}

/// A detector mapping a batch of bird's-eye-view rasters to classification and
/// localization maps.
pub trait DetectionModel {
    /// The type of both output maps.
    type Output;
    /// The loss type the model can back-propagate.
    type Loss: LossValue;

    /// Switch between training and evaluation behaviour.
    fn set_mode(&mut self, mode: Mode);

    /// Run the detector on a `[batch, 3, rows, cols]` raster batch.
    fn predict(&mut self, bev: &Tensor4<f32>) -> (Self::Output, Self::Output);

    /// Clear the accumulated gradients.
    fn zero_grad(&mut self);

    /// Back-propagate `loss` and take one optimizer step with `learning_rate`.
    fn backward_step(&mut self, loss: &Self::Loss, learning_rate: f32);

    /// Snapshot the parameters.
    fn state(&self) -> ModelState;

    /// Restore the parameters from a snapshot.
    fn load_state(&mut self, state: &ModelState) -> Result<(), CheckpointError>;
}

/// The multi-task detection loss.
pub trait DetectionLoss<M: DetectionModel> {
    /// Score the predictions of a batch against its padded targets.
    ///
    /// The classification loss is `None` when the batch has no anchor to score and
    /// the localization loss is `None` when no anchor matches a ground truth box.
    /// Neither case is an error.
    fn compute(
        &self,
        cla: &M::Output,
        loc: &M::Output,
        target: &Tensor3<f32>,
        zoom03: &Tensor3<f32>,
        zoom12: &Tensor3<f32>,
    ) -> (Option<M::Loss>, Option<M::Loss>);
}

impl LossValue for f32 {
    fn value(&self) -> f32 {
        *self
    }

    fn add(&self, other: &Self) -> Self {
        self + other
    }
}
