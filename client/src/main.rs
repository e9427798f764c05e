mod board;
mod cli;
mod fake_train;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use common::{ConfigLoader, FsExt};
use dotenv::dotenv;
use env_logger::Env;
use fake_train::{fake_train, FakeTrainOptions};
use itertools::Itertools;
use log::info;
use resnet::{checkpoint, Predictor, ResNetOptions};
use std::path::Path;

fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::FakeTrain(fake_train_args) => {
            let config_path = fake_train_args.config.relative_to_cwd()?;
            let config = ConfigLoader::new(config_path, "fake_train".to_string())?;

            let fake_train_options: FakeTrainOptions = config.load()?;
            let resnet_options: ResNetOptions = config.load()?;

            let model_dir = config.get_relative_path("model_dir")?;
            let summary_path = config.get_relative_path("summary_path").ok();

            let saved = fake_train(
                &fake_train_options,
                &resnet_options,
                &model_dir,
                summary_path,
            )?;

            info!("Fake training complete, model written to {:?}", saved);
        }
        Commands::Predict(predict_args) => {
            let checkpoint_path = predict_args.checkpoint.relative_to_cwd()?;
            let position = board::parse_board(&predict_args.board, predict_args.player)?;

            predict(&checkpoint_path, &position, predict_args.top)?;
        }
        Commands::Describe(describe_args) => {
            let config_path = describe_args.config.relative_to_cwd()?;
            let config = ConfigLoader::new(config_path, "describe".to_string())?;

            let resnet_options: ResNetOptions = config.load()?;
            let spec = resnet_options.to_architecture();
            spec.validate()?;

            for line in spec.describe() {
                info!("{}", line);
            }
            info!("Total parameters: {}", spec.parameter_count());
        }
    }

    Ok(())
}

fn predict(checkpoint_path: &Path, position: &engine::BoardPosition, top: usize) -> Result<()> {
    let (network, batch_num) = checkpoint::load(checkpoint_path)?;
    info!("Loaded {:?} trained for {} batches", checkpoint_path, batch_num);

    let analysis = Predictor::new(&network).predict(position)?;

    let moves = analysis
        .top(top)
        .iter()
        .map(|p| format!("{}: {:.4}", p.action, p.policy_score))
        .join(", ");

    println!("Value: {:.4}", analysis.value_score.value);
    println!("Moves: {}", moves);

    Ok(())
}
