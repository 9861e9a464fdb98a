use std::time::{Duration, Instant};

use hawkeye_data::{DataLoader, DatasetSplits, Padded};
use serde::Serialize;

use crate::checkpoint::CheckpointStore;
use crate::config::TrainingConfig;
use crate::error::TrainError;
use crate::logging::{render, LogTemplates, RunLog};
use crate::model::{DetectionLoss, DetectionModel, LossValue, Mode};
use crate::output::OutputWriter;
use crate::schedule::MultiStepLr;

/// What happened to one batch, depending on which losses were produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchOutcome {
    /// Both losses were produced; their sum was optimized.
    Both {
        /// Classification loss.
        cla: f32,
        /// Localization loss.
        loc: f32,
        /// Sum of both.
        total: f32,
    },
    /// Only the classification loss was produced and optimized.
    ClassificationOnly {
        /// Classification loss.
        cla: f32,
        /// Equal to `cla`.
        total: f32,
    },
    /// No classification loss; the batch did not take an optimization step.
    Skipped,
}

impl BatchOutcome {
    /// The optimized loss, if any.
    pub fn total(&self) -> Option<f32> {
        match self {
            Self::Both { total, .. } | Self::ClassificationOnly { total, .. } => Some(*total),
            Self::Skipped => None,
        }
    }

    /// The log line of the batch.
    pub fn render(&self, templates: &LogTemplates, epoch: usize, batch: usize) -> String {
        match *self {
            Self::Both { cla, loc, total } => {
                render(&templates.both, epoch, batch, Some(cla), Some(loc), Some(total))
            }
            Self::ClassificationOnly { cla, total } => render(
                &templates.classification_only,
                epoch,
                batch,
                Some(cla),
                None,
                Some(total),
            ),
            Self::Skipped => render(&templates.skipped, epoch, batch, None, None, None),
        }
    }
}

/// Combine the two optional losses into the loss to optimize.
///
/// A missing classification loss skips the batch even when a localization loss
/// exists.
pub fn combine_losses<L: LossValue>(cla: Option<L>, loc: Option<L>) -> (Option<L>, BatchOutcome) {
    match (cla, loc) {
        (None, _) => (None, BatchOutcome::Skipped),
        (Some(cla), Some(loc)) => {
            let total = cla.add(&loc);
            let outcome = BatchOutcome::Both {
                cla: cla.value(),
                loc: loc.value(),
                total: total.value(),
            };
            (Some(total), outcome)
        }
        (Some(cla), None) => {
            let outcome = BatchOutcome::ClassificationOnly {
                cla: cla.value(),
                total: cla.value(),
            };
            (Some(cla), outcome)
        }
    }
}

/// Aggregate of one pass over a data source.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSummary {
    /// The epoch.
    pub epoch: usize,
    /// Number of batches seen.
    pub batches: usize,
    /// Number of batches without any loss.
    pub skipped: usize,
    /// Mean of the optimized losses over the non-skipped batches.
    pub mean_loss: Option<f32>,
    /// Wall time of the pass.
    pub elapsed: Duration,
}

impl EpochSummary {
    fn new(epoch: usize) -> Self {
        Self {
            epoch,
            batches: 0,
            skipped: 0,
            mean_loss: None,
            elapsed: Duration::ZERO,
        }
    }

    fn record(&mut self, outcome: &BatchOutcome) {
        self.batches += 1;
        match outcome.total() {
            None => self.skipped += 1,
            Some(total) => {
                let n = (self.batches - self.skipped) as f32;
                let mean = self.mean_loss.unwrap_or(0.0);
                self.mean_loss = Some(mean + (total - mean) / n);
            }
        }
    }
}

/// Everything a training run needs, built once and passed explicitly.
pub struct TrainingContext<M, L, S> {
    model: M,
    loss: L,
    store: S,
    train_loader: DataLoader<Padded>,
    val_loader: DataLoader<Padded>,
    config: TrainingConfig,
    schedule: MultiStepLr,
    train_log: RunLog,
    val_log: RunLog,
    train_outputs: OutputWriter,
    val_outputs: OutputWriter,
}

impl<M, L, S> TrainingContext<M, L, S>
where
    M: DetectionModel,
    M::Output: Serialize,
    L: DetectionLoss<M>,
    S: CheckpointStore,
{
    /// Create a context from explicit loaders.
    pub fn new(
        model: M,
        loss: L,
        store: S,
        train_loader: DataLoader<Padded>,
        val_loader: DataLoader<Padded>,
        config: TrainingConfig,
    ) -> Result<Self, TrainError> {
        config.validate()?;
        Ok(Self {
            model,
            loss,
            store,
            train_loader,
            val_loader,
            schedule: config.schedule(),
            train_log: RunLog::open(&config.train_log)?,
            val_log: RunLog::open(&config.val_log)?,
            train_outputs: OutputWriter::new(&config.train_output_dir),
            val_outputs: OutputWriter::new(&config.val_output_dir),
            config,
        })
    }

    /// Create a context over the train and validation splits of a dataset.
    pub fn from_splits(
        model: M,
        loss: L,
        store: S,
        splits: DatasetSplits,
        config: TrainingConfig,
    ) -> Result<Self, TrainError> {
        let train_loader = DataLoader::new(splits.train, config.batch_size, config.seed, Padded)?
            .with_shuffle(config.shuffle);
        let val_loader = DataLoader::new(splits.val, config.batch_size, config.seed, Padded)?;
        Self::new(model, loss, store, train_loader, val_loader, config)
    }

    /// The model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Consume the context and return the model.
    pub fn into_model(self) -> M {
        self.model
    }

    /// Restore the model from the checkpoint store, if it holds a state.
    pub fn resume(&mut self) -> Result<bool, TrainError> {
        match self.store.load()? {
            Some(state) => {
                self.model.load_state(&state)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// One optimization pass over the training data.
    pub fn train(&mut self, epoch: usize) -> Result<EpochSummary, TrainError> {
        self.model.set_mode(Mode::Train);
        let lr = self.schedule.lr(epoch);
        let final_epoch = self.config.is_final_epoch(epoch);
        let mut summary = EpochSummary::new(epoch);
        let start = Instant::now();

        for (batch_id, batch) in self.train_loader.batches(epoch).enumerate() {
            let batch = batch?;
            self.model.zero_grad();
            let (cla, loc) = self.model.predict(&batch.bev);

            let loss_start = Instant::now();
            let (cla_loss, loc_loss) =
                self.loss
                    .compute(&cla, &loc, &batch.target, &batch.zoom03, &batch.zoom12);
            let loss_time = loss_start.elapsed();

            let (total, outcome) = combine_losses(cla_loss, loc_loss);
            if let Some(total) = &total {
                self.model.backward_step(total, lr);
            }

            if final_epoch {
                self.train_outputs
                    .write_predictions(epoch, batch_id, &batch.ids, &cla, &loc)?;
                self.train_outputs.write_targets(epoch, &batch)?;
            }

            let line = outcome.render(&self.config.log_templates, epoch, batch_id);
            self.train_log.write(&format!(
                "{line}elapsed time: {:.6} secs\n\n",
                loss_time.as_secs_f64()
            ))?;
            summary.record(&outcome);
        }

        summary.elapsed = start.elapsed();
        log::info!(
            "epoch {epoch}: {} training batches, {} skipped, lr {lr:e}",
            summary.batches,
            summary.skipped
        );
        Ok(summary)
    }

    /// One evaluation pass over the validation data, without optimization.
    pub fn validation(&mut self, epoch: usize) -> Result<EpochSummary, TrainError> {
        self.model.set_mode(Mode::Eval);
        let final_epoch = self.config.is_final_epoch(epoch);
        let mut summary = EpochSummary::new(epoch);
        let start = Instant::now();

        for (batch_id, batch) in self.val_loader.batches(epoch).enumerate() {
            let batch = batch?;
            let (cla, loc) = self.model.predict(&batch.bev);
            let (cla_loss, loc_loss) =
                self.loss
                    .compute(&cla, &loc, &batch.target, &batch.zoom03, &batch.zoom12);
            let (_, outcome) = combine_losses(cla_loss, loc_loss);

            if final_epoch {
                self.val_outputs
                    .write_predictions(epoch, batch_id, &batch.ids, &cla, &loc)?;
                self.val_outputs.write_targets(epoch, &batch)?;
            }

            self.val_log
                .write(&outcome.render(&self.config.log_templates, epoch, batch_id))?;
            summary.record(&outcome);
        }

        summary.elapsed = start.elapsed();
        log::info!(
            "epoch {epoch}: validation mean loss {:?} over {} batches",
            summary.mean_loss,
            summary.batches
        );
        Ok(summary)
    }

    /// Run every epoch: resume from the checkpoint, train, and periodically validate
    /// and save.
    ///
    /// Validation and checkpointing happen every `validate_every` and
    /// `checkpoint_every` epochs and always at the final epoch.
    pub fn run(&mut self) -> Result<Vec<EpochSummary>, TrainError> {
        if self.resume()? {
            log::info!("resumed from checkpoint");
        }

        let mut summaries = Vec::with_capacity(self.config.epochs);
        for epoch in 0..self.config.epochs {
            let summary = self.train(epoch)?;
            self.train_log.write(&format!(
                "\n\n\n~~~~~epoch end time taken: {:.3} secs~~~~\n\n\n",
                summary.elapsed.as_secs_f64()
            ))?;
            summaries.push(summary);

            let final_epoch = self.config.is_final_epoch(epoch);
            if (epoch + 1) % self.config.validate_every == 0 || final_epoch {
                self.validation(epoch)?;
            }
            if (epoch + 1) % self.config.checkpoint_every == 0 || final_epoch {
                self.store.save(&self.model.state())?;
            }
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_all_cases() {
        let (total, outcome) = combine_losses(Some(1.0f32), Some(0.5));
        assert_eq!(total, Some(1.5));
        assert_eq!(
            outcome,
            BatchOutcome::Both {
                cla: 1.0,
                loc: 0.5,
                total: 1.5
            }
        );

        let (total, outcome) = combine_losses(Some(2.0f32), None);
        assert_eq!(total, Some(2.0));
        assert_eq!(outcome.total(), Some(2.0));

        let (total, outcome) = combine_losses::<f32>(None, Some(3.0));
        assert_eq!(total, None);
        assert_eq!(outcome, BatchOutcome::Skipped);
    }

    #[test]
    fn summary_mean_ignores_skipped() {
        let mut s = EpochSummary::new(0);
        s.record(&BatchOutcome::ClassificationOnly { cla: 1.0, total: 1.0 });
        s.record(&BatchOutcome::Skipped);
        s.record(&BatchOutcome::Both {
            cla: 2.0,
            loc: 1.0,
            total: 3.0,
        });
        assert_eq!(s.batches, 3);
        assert_eq!(s.skipped, 1);
        assert_eq!(s.mean_loss, Some(2.0));
    }

    #[test]
    fn outcome_lines() {
        let t = LogTemplates::default();
        assert!(BatchOutcome::Skipped.render(&t, 1, 2).contains("step skipped"));
        let line = BatchOutcome::ClassificationOnly { cla: 0.5, total: 0.5 }.render(&t, 1, 2);
        assert!(line.contains("loc loss: none"));
    }
}
