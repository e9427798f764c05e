use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tch::nn::{self, OptimizerConfig};

use super::batches::TrainingBatch;
use super::checkpoint;
use super::encoder::BoardEncoder;
use super::error::{ResNetError, Result};
use super::history::TrainingHistory;
use super::loss::{Loss, LossBreakdown};
use super::network::{Mode, Network, NetworkOutput};
use super::reporter::{LogReporter, TrainingReporter};
use super::tensor;

pub const DEFAULT_LEARNING_RATE: f32 = 0.001;

/// What became of the checkpoint requested alongside a training step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    Saved(PathBuf),
    Failed { path: PathBuf, error: String },
}

/// Summary of one training step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainStep {
    pub batch_num: u64,
    /// Loss of the batch just trained on, measured before the update.
    pub loss: LossBreakdown,
    /// Total loss of the rolling diagnostic sample after the update.
    pub diagnostic_loss: f32,
    pub sample_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<CheckpointStatus>,
}

/// Owns a network while it is being trained. Every call to [`Trainer::train_step`]
/// performs exactly one Adam update.
pub struct Trainer {
    network: Network,
    encoder: BoardEncoder,
    optimizer: nn::Optimizer,
    learning_rate: f32,
    history: TrainingHistory,
    reporters: Vec<Box<dyn TrainingReporter>>,
    batch_num: u64,
}

impl Trainer {
    pub fn new(network: Network, learning_rate: f32) -> Result<Self> {
        let encoder = BoardEncoder::new(network.spec().board_dimension);
        let optimizer = nn::Adam::default().build(network.var_store(), learning_rate as f64)?;

        Ok(Self {
            network,
            encoder,
            optimizer,
            learning_rate,
            history: TrainingHistory::default(),
            reporters: vec![Box::new(LogReporter)],
            batch_num: 0,
        })
    }

    pub fn with_history(mut self, history: TrainingHistory) -> Self {
        self.history = history;
        self
    }

    pub fn with_batch_num(mut self, batch_num: u64) -> Self {
        self.batch_num = batch_num;
        self
    }

    pub fn with_reporter(mut self, reporter: Box<dyn TrainingReporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn batch_num(&self) -> u64 {
        self.batch_num
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    /// Hands the history over to the caller, leaving an empty one with the same settings behind.
    pub fn take_history(&mut self) -> TrainingHistory {
        let fresh = self.history.fresh();
        std::mem::replace(&mut self.history, fresh)
    }

    /// Trains on one batch and, when `checkpoint` is given, saves the parameters there.
    ///
    /// The batch is fully validated and encoded before anything is mutated. Once the
    /// update is applied the step is committed: a failed save is reported in
    /// [`TrainStep::checkpoint`] rather than as an error.
    pub fn train_step(
        &mut self,
        batch: &TrainingBatch,
        checkpoint: Option<&Path>,
    ) -> Result<TrainStep> {
        batch.validate(self.encoder.board_dimension())?;
        let input = self.encoder.encode_batch(&batch.boards)?;
        let policy_targets = tensor::from_array2(batch.policy_targets.view());
        let value_targets = tensor::from_array2(batch.value_targets.view());

        let logits = self.network.forward(input.view(), Mode::Train)?;
        let loss = Loss::new(
            &logits,
            &policy_targets,
            &value_targets,
            self.network.regularization_loss(),
        )?;
        let breakdown = loss.breakdown()?;

        self.optimizer.backward_step(&loss.total());

        self.batch_num += 1;
        debug!("Trained batch {} of {} positions", self.batch_num, batch.len());

        self.history.record_batch(batch);
        let sample_size = self.history.sample_len();
        let diagnostic_loss = match self.history.sample_batch()? {
            Some(sample) => self.evaluate(&sample)?.0.total,
            None => breakdown.total,
        };
        self.history.record_loss(diagnostic_loss);

        let checkpoint = checkpoint.map(|path| match self.save(path) {
            Ok(()) => CheckpointStatus::Saved(path.to_path_buf()),
            Err(err) => {
                warn!("Batch {} trained but not saved: {:?}", self.batch_num, err);
                CheckpointStatus::Failed {
                    path: path.to_path_buf(),
                    error: format!("{:?}", err),
                }
            }
        });

        let step = TrainStep {
            batch_num: self.batch_num,
            loss: breakdown,
            diagnostic_loss,
            sample_size,
            checkpoint,
        };

        for reporter in &mut self.reporters {
            reporter.report(&step);
        }

        Ok(step)
    }

    /// Loss and outputs of the network over `batch` in inference mode. Nothing is updated.
    pub fn evaluate(&self, batch: &TrainingBatch) -> Result<(LossBreakdown, NetworkOutput)> {
        batch.validate(self.encoder.board_dimension())?;
        let input = self.encoder.encode_batch(&batch.boards)?;
        let policy_targets = tensor::from_array2(batch.policy_targets.view());
        let value_targets = tensor::from_array2(batch.value_targets.view());

        tch::no_grad(|| {
            let logits = self.network.forward(input.view(), Mode::Infer)?;
            let breakdown = Loss::new(
                &logits,
                &policy_targets,
                &value_targets,
                self.network.regularization_loss(),
            )?
            .breakdown()?;

            Ok((breakdown, logits.to_output()?))
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        checkpoint::save(path, &self.network, self.batch_num).map_err(|source| {
            ResNetError::Save {
                path: path.to_path_buf(),
                source,
            }
        })?;

        info!("Model saved in path: {:?}", path);

        Ok(())
    }
}
