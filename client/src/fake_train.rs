use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use common::{mean, Config, ConfigLoader};
use log::{info, warn};
use model::ModelInfo;
use rand::rngs::StdRng;
use rand::SeedableRng;
use resnet::{
    generate_stone_count_data, value_accuracy, JsonLinesReporter, MiniBatches, ResNet,
    ResNetOptions, TrainingBatch,
};

#[derive(Clone, Debug, PartialEq)]
pub struct FakeTrainOptions {
    pub training_data_num: usize,
    pub test_data_num: usize,
    pub train_batch_size: usize,
    pub epochs: usize,
    pub model_name: String,
}

impl Default for FakeTrainOptions {
    fn default() -> Self {
        Self {
            training_data_num: 1000,
            test_data_num: 50,
            train_batch_size: 500,
            epochs: 50,
            model_name: "go5_fake_00000".to_string(),
        }
    }
}

impl Config for FakeTrainOptions {
    fn load(config: &ConfigLoader) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            training_data_num: config
                .get("training_data_num")
                .and_then(|v| v.as_usize())
                .unwrap_or(defaults.training_data_num),
            test_data_num: config
                .get("test_data_num")
                .and_then(|v| v.as_usize())
                .unwrap_or(defaults.test_data_num),
            train_batch_size: config
                .get("train_batch_size")
                .and_then(|v| v.as_usize())
                .unwrap_or(defaults.train_batch_size),
            epochs: config
                .get("epochs")
                .and_then(|v| v.as_usize())
                .unwrap_or(defaults.epochs),
            model_name: config
                .get("model_name")
                .and_then(|v| v.as_string())
                .unwrap_or(defaults.model_name),
        })
    }
}

/// Trains on synthetic data. Resumes from `<model_dir>/<model_name>.ckpt` when it
/// exists and writes the result as the next model number.
pub fn fake_train(
    options: &FakeTrainOptions,
    resnet_options: &ResNetOptions,
    model_dir: &Path,
    summary_path: Option<PathBuf>,
) -> Result<PathBuf> {
    let model_info = ModelInfo::from_model_name(&options.model_name)?;
    let restore_path = model_info.get_checkpoint_path(model_dir);

    let mut model = if restore_path.is_file() {
        info!("Restoring model from {:?}", restore_path);
        ResNet::restore(resnet_options, &restore_path)?
    } else {
        info!("Creating model {}", model_info.get_model_name());
        ResNet::create(resnet_options)?
    };

    if let Some(summary_path) = summary_path {
        let reporter = JsonLinesReporter::create(&summary_path)
            .with_context(|| format!("Failed to open summary file {:?}", summary_path))?;
        model = model.with_reporter(Box::new(reporter));
    }

    let board_dimension = resnet_options.board_dimension;
    let mut rng = StdRng::seed_from_u64(resnet_options.seed);
    let training_data =
        generate_stone_count_data(options.training_data_num, board_dimension, &mut rng);
    let test_data = generate_stone_count_data(options.test_data_num, board_dimension, &mut rng);

    if options.train_batch_size > options.training_data_num {
        warn!(
            "Batch size {} exceeds the {} training positions, no batches will be trained",
            options.train_batch_size, options.training_data_num
        );
    }

    for epoch in 1..=options.epochs {
        let mut losses = Vec::new();
        let mut accuracies = Vec::new();

        for batch in MiniBatches::new(&training_data, options.train_batch_size, &mut rng) {
            let step = model.train(&batch, None)?;
            let (_, output) = model.trainer().evaluate(&batch)?;

            losses.push(step.loss.total);
            accuracies.push(value_accuracy(
                output.value.view(),
                batch.value_targets.view(),
            ));
        }

        info!(
            "Epoch {}: Loss: {:.4}, Value Accuracy: {:.3}",
            epoch,
            mean(&losses),
            mean(&accuracies)
        );
    }

    report_test_set(&model, &test_data)?;

    let save_path = model_info.get_next_model_info().get_checkpoint_path(model_dir);
    model.trainer().save(&save_path)?;

    Ok(save_path)
}

fn report_test_set(model: &ResNet, test_data: &TrainingBatch) -> Result<()> {
    if test_data.is_empty() {
        return Ok(());
    }

    let (loss, output) = model.trainer().evaluate(test_data)?;
    let accuracy = value_accuracy(output.value.view(), test_data.value_targets.view());

    info!(
        "Test Loss: {:.4}, Value Loss: {:.4}, Policy Loss: {:.4}, Value Accuracy: {:.3}",
        loss.total, loss.value, loss.policy, accuracy
    );

    Ok(())
}
