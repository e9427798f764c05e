use anyhow::{anyhow, Result};
use common::{get_env_u64, Config, ConfigLoader};
use serde::{Deserialize, Serialize};

use super::architecture::*;
use super::history::{DEFAULT_SAMPLE_CAPACITY, DEFAULT_SAMPLE_PER_BATCH};
use super::trainer::DEFAULT_LEARNING_RATE;

pub const DEFAULT_BOARD_DIMENSION: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResNetOptions {
    pub board_dimension: usize,
    pub l2_beta: f32,
    pub num_filters: usize,
    pub num_blocks: usize,
    pub policy_filters: usize,
    pub value_filters: usize,
    pub value_hidden_units: usize,
    pub value_hidden_layers: usize,
    pub learning_rate: f32,
    pub batch_norm_mode: BatchNormMode,
    pub diagnostic_sample_per_batch: usize,
    pub diagnostic_sample_capacity: usize,
    pub seed: u64,
}

impl ResNetOptions {
    pub fn to_architecture(&self) -> ArchitectureSpec {
        ArchitectureSpec::builder(self.board_dimension)
            .num_filters(self.num_filters)
            .num_blocks(self.num_blocks)
            .policy_filters(self.policy_filters)
            .value_filters(self.value_filters)
            .value_hidden(self.value_hidden_units, self.value_hidden_layers)
            .l2_beta(self.l2_beta)
            .batch_norm_mode(self.batch_norm_mode)
            .build()
    }
}

impl Default for ResNetOptions {
    fn default() -> Self {
        Self {
            board_dimension: DEFAULT_BOARD_DIMENSION,
            l2_beta: DEFAULT_L2_BETA,
            num_filters: DEFAULT_NUM_FILTERS,
            num_blocks: DEFAULT_NUM_BLOCKS,
            policy_filters: DEFAULT_POLICY_FILTERS,
            value_filters: DEFAULT_VALUE_FILTERS,
            value_hidden_units: DEFAULT_VALUE_HIDDEN_UNITS,
            value_hidden_layers: DEFAULT_VALUE_HIDDEN_LAYERS,
            learning_rate: DEFAULT_LEARNING_RATE,
            batch_norm_mode: BatchNormMode::Batch,
            diagnostic_sample_per_batch: DEFAULT_SAMPLE_PER_BATCH,
            diagnostic_sample_capacity: DEFAULT_SAMPLE_CAPACITY,
            seed: 0,
        }
    }
}

impl Config for ResNetOptions {
    fn load(config: &ConfigLoader) -> Result<Self> {
        let defaults = Self::default();

        let batch_norm_mode = match config.get("batch_norm_mode").and_then(|v| v.as_string()) {
            Some(mode) => parse_batch_norm_mode(&mode)?,
            None => defaults.batch_norm_mode,
        };

        Ok(Self {
            board_dimension: config
                .get("board_dimension")
                .and_then(|v| v.as_usize())
                .unwrap_or(defaults.board_dimension),
            l2_beta: config
                .get("l2_beta")
                .and_then(|v| v.as_f32())
                .unwrap_or(defaults.l2_beta),
            num_filters: config
                .get("num_filters")
                .and_then(|v| v.as_usize())
                .unwrap_or(defaults.num_filters),
            num_blocks: config
                .get("num_blocks")
                .and_then(|v| v.as_usize())
                .unwrap_or(defaults.num_blocks),
            policy_filters: config
                .get("policy_filters")
                .and_then(|v| v.as_usize())
                .unwrap_or(defaults.policy_filters),
            value_filters: config
                .get("value_filters")
                .and_then(|v| v.as_usize())
                .unwrap_or(defaults.value_filters),
            value_hidden_units: config
                .get("value_hidden_units")
                .and_then(|v| v.as_usize())
                .unwrap_or(defaults.value_hidden_units),
            value_hidden_layers: config
                .get("value_hidden_layers")
                .and_then(|v| v.as_usize())
                .unwrap_or(defaults.value_hidden_layers),
            learning_rate: config
                .get("learning_rate")
                .and_then(|v| v.as_f32())
                .unwrap_or(defaults.learning_rate),
            batch_norm_mode,
            diagnostic_sample_per_batch: config
                .get("diagnostic_sample_per_batch")
                .and_then(|v| v.as_usize())
                .unwrap_or(defaults.diagnostic_sample_per_batch),
            diagnostic_sample_capacity: config
                .get("diagnostic_sample_capacity")
                .and_then(|v| v.as_usize())
                .unwrap_or(defaults.diagnostic_sample_capacity),
            seed: get_env_u64("RESNET_SEED")
                .or_else(|| config.get("seed").and_then(|v| v.as_u64()))
                .unwrap_or(defaults.seed),
        })
    }
}

fn parse_batch_norm_mode(mode: &str) -> Result<BatchNormMode> {
    match mode {
        "batch" => Ok(BatchNormMode::Batch),
        "running" => Ok(BatchNormMode::Running),
        other => Err(anyhow!(
            "Unknown batch_norm_mode {:?}, expected \"batch\" or \"running\"",
            other
        )),
    }
}
