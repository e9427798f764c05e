use std::path::Path;

use engine::BoardPosition;
use log::info;

use super::batches::TrainingBatch;
use super::checkpoint;
use super::error::{ResNetError, Result};
use super::history::TrainingHistory;
use super::network::Network;
use super::options::ResNetOptions;
use super::predictor::{MoveDistribution, Predictor};
use super::reporter::TrainingReporter;
use super::trainer::{TrainStep, Trainer};

/// A policy/value network together with everything needed to train it.
pub struct ResNet {
    options: ResNetOptions,
    trainer: Trainer,
}

impl ResNet {
    /// A freshly initialised network seeded with `options.seed`.
    pub fn create(options: &ResNetOptions) -> Result<Self> {
        let network = Network::build(&options.to_architecture(), options.seed)?;

        Self::from_network(options, network, 0)
    }

    /// The configured network with its tensors read from the checkpoint at `path`.
    pub fn restore(options: &ResNetOptions, path: &Path) -> Result<Self> {
        let mut network = Network::build(&options.to_architecture(), options.seed)?;
        let batch_num =
            checkpoint::restore(path, &mut network).map_err(|source| ResNetError::Restore {
                path: path.to_path_buf(),
                source,
            })?;

        info!("Restored model from {:?} at batch {}", path, batch_num);

        Self::from_network(options, network, batch_num)
    }

    fn from_network(options: &ResNetOptions, network: Network, batch_num: u64) -> Result<Self> {
        let history = TrainingHistory::new(
            options.diagnostic_sample_per_batch,
            options.diagnostic_sample_capacity,
        );
        let trainer = Trainer::new(network, options.learning_rate)?
            .with_history(history)
            .with_batch_num(batch_num);

        Ok(Self {
            options: options.clone(),
            trainer,
        })
    }

    pub fn with_reporter(mut self, reporter: Box<dyn TrainingReporter>) -> Self {
        self.trainer = self.trainer.with_reporter(reporter);
        self
    }

    pub fn options(&self) -> &ResNetOptions {
        &self.options
    }

    pub fn network(&self) -> &Network {
        self.trainer.network()
    }

    pub fn trainer(&self) -> &Trainer {
        &self.trainer
    }

    pub fn trainer_mut(&mut self) -> &mut Trainer {
        &mut self.trainer
    }

    pub fn train(&mut self, batch: &TrainingBatch, checkpoint: Option<&Path>) -> Result<TrainStep> {
        self.trainer.train_step(batch, checkpoint)
    }

    pub fn predictor(&self) -> Predictor<'_> {
        Predictor::new(self.trainer.network())
    }

    pub fn predict(&self, position: &BoardPosition) -> Result<MoveDistribution> {
        self.predictor().predict(position)
    }
}
