use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::encoder::INPUT_CHANNELS;

pub const DEFAULT_NUM_FILTERS: usize = 64;
pub const DEFAULT_NUM_BLOCKS: usize = 3;
pub const DEFAULT_POLICY_FILTERS: usize = 2;
pub const DEFAULT_VALUE_FILTERS: usize = 1;
pub const DEFAULT_VALUE_HIDDEN_UNITS: usize = 256;
pub const DEFAULT_VALUE_HIDDEN_LAYERS: usize = 2;
pub const DEFAULT_L2_BETA: f32 = 0.0001;
pub const BATCH_NORM_MOMENTUM: f32 = 0.99;
pub const BATCH_NORM_EPSILON: f32 = 0.001;

#[derive(Debug, Error, PartialEq)]
pub enum ArchitectureError {
    #[error("board dimension must be at least 1")]
    EmptyBoard,

    #[error("{layer} must have at least one {unit}")]
    EmptyLayer {
        layer: String,
        unit: &'static str,
    },

    #[error("{layer} uses an even kernel size {kernel_size}, same padding needs an odd kernel")]
    EvenKernel { layer: String, kernel_size: usize },

    #[error("residual block {block} maps {input} filters to {output}, the skip connection needs them equal")]
    ResidualWidth {
        block: usize,
        input: usize,
        output: usize,
    },
}

/// A convolution followed by batch normalization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvSpec {
    pub filters: usize,
    pub kernel_size: usize,
    pub l2: bool,
}

impl ConvSpec {
    pub fn new(filters: usize, kernel_size: usize) -> Self {
        Self {
            filters,
            kernel_size,
            l2: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResidualBlockSpec {
    pub first: ConvSpec,
    pub second: ConvSpec,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DenseSpec {
    pub units: usize,
    pub relu: bool,
    pub l2: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyHeadSpec {
    pub conv: ConvSpec,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueHeadSpec {
    pub conv: ConvSpec,
    pub hidden: Vec<DenseSpec>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchNormMode {
    /// Normalize training batches with their own statistics and track running averages.
    Batch,
    /// Always normalize with the running averages, which then never move.
    Running,
}

/// The full topology of the policy/value network, independent of any allocated weights.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureSpec {
    pub board_dimension: usize,
    pub input_channels: usize,
    pub stem: ConvSpec,
    pub residual_blocks: Vec<ResidualBlockSpec>,
    pub policy_head: PolicyHeadSpec,
    pub value_head: ValueHeadSpec,
    pub l2_beta: f32,
    pub batch_norm_mode: BatchNormMode,
    pub batch_norm_momentum: f32,
    pub batch_norm_epsilon: f32,
}

impl ArchitectureSpec {
    pub fn new(board_dimension: usize, l2_beta: f32) -> Self {
        ArchitectureBuilder::new(board_dimension)
            .l2_beta(l2_beta)
            .build()
    }

    pub fn builder(board_dimension: usize) -> ArchitectureBuilder {
        ArchitectureBuilder::new(board_dimension)
    }

    pub fn num_cells(&self) -> usize {
        self.board_dimension * self.board_dimension
    }

    pub fn policy_size(&self) -> usize {
        self.num_cells() + 1
    }

    pub fn input_shape(&self) -> [usize; 3] {
        [self.board_dimension, self.board_dimension, self.input_channels]
    }

    pub fn trunk_filters(&self) -> usize {
        self.stem.filters
    }

    pub fn validate(&self) -> Result<(), ArchitectureError> {
        if self.board_dimension == 0 {
            return Err(ArchitectureError::EmptyBoard);
        }

        let mut convs = vec![("stem".to_string(), &self.stem)];
        for (i, block) in self.residual_blocks.iter().enumerate() {
            convs.push((format!("res{}/conv1", i), &block.first));
            convs.push((format!("res{}/conv2", i), &block.second));
        }
        convs.push(("policy_head/conv".to_string(), &self.policy_head.conv));
        convs.push(("value_head/conv".to_string(), &self.value_head.conv));

        for (layer, conv) in convs {
            if conv.filters == 0 {
                return Err(ArchitectureError::EmptyLayer {
                    layer,
                    unit: "filter",
                });
            }
            if conv.kernel_size % 2 == 0 {
                return Err(ArchitectureError::EvenKernel {
                    layer,
                    kernel_size: conv.kernel_size,
                });
            }
        }

        for (i, dense) in self.value_head.hidden.iter().enumerate() {
            if dense.units == 0 {
                return Err(ArchitectureError::EmptyLayer {
                    layer: format!("value_head/dense{}", i),
                    unit: "unit",
                });
            }
        }

        let mut width = self.stem.filters;
        for (block, spec) in self.residual_blocks.iter().enumerate() {
            if spec.second.filters != width {
                return Err(ArchitectureError::ResidualWidth {
                    block,
                    input: width,
                    output: spec.second.filters,
                });
            }
            width = spec.second.filters;
        }

        Ok(())
    }

    /// Number of trainable parameters, including biases and batch norm scale/offset.
    pub fn parameter_count(&self) -> usize {
        let cells = self.num_cells();
        let conv = |in_channels: usize, spec: &ConvSpec| {
            spec.kernel_size * spec.kernel_size * in_channels * spec.filters
                + spec.filters
                + 2 * spec.filters
        };
        let dense = |inputs: usize, outputs: usize| inputs * outputs + outputs;

        let mut count = conv(self.input_channels, &self.stem);
        let mut width = self.stem.filters;
        for block in &self.residual_blocks {
            count += conv(width, &block.first);
            count += conv(block.first.filters, &block.second);
            width = block.second.filters;
        }

        count += conv(width, &self.policy_head.conv);
        count += dense(cells * self.policy_head.conv.filters, self.policy_size());

        count += conv(width, &self.value_head.conv);
        let mut inputs = cells * self.value_head.conv.filters;
        for hidden in &self.value_head.hidden {
            count += dense(inputs, hidden.units);
            inputs = hidden.units;
        }
        count += dense(inputs, 1);

        count
    }

    /// One line per layer, used for logging the topology.
    pub fn describe(&self) -> Vec<String> {
        let n = self.board_dimension;
        let conv = |name: &str, spec: &ConvSpec| {
            format!(
                "{}: conv {}x{} -> {} filters, batch norm, relu",
                name, spec.kernel_size, spec.kernel_size, spec.filters
            )
        };

        let mut lines = vec![
            format!("input: {}x{}x{}", n, n, self.input_channels),
            conv("stem", &self.stem),
        ];

        for (i, block) in self.residual_blocks.iter().enumerate() {
            lines.push(conv(&format!("res{}/conv1", i), &block.first));
            lines.push(format!(
                "res{}/conv2: conv {}x{} -> {} filters, batch norm, skip add, relu",
                i, block.second.kernel_size, block.second.kernel_size, block.second.filters
            ));
        }

        lines.push(conv("policy_head/conv", &self.policy_head.conv));
        lines.push(format!(
            "policy_head/logits: dense -> {}, softmax",
            self.policy_size()
        ));
        lines.push(conv("value_head/conv", &self.value_head.conv));
        for (i, hidden) in self.value_head.hidden.iter().enumerate() {
            lines.push(format!(
                "value_head/dense{}: dense -> {}{}",
                i,
                hidden.units,
                if hidden.relu { ", relu" } else { "" }
            ));
        }
        lines.push("value_head/logit: dense -> 1, tanh".to_string());

        lines
    }
}

pub struct ArchitectureBuilder {
    board_dimension: usize,
    num_filters: usize,
    num_blocks: usize,
    policy_filters: usize,
    value_filters: usize,
    value_hidden_units: usize,
    value_hidden_layers: usize,
    l2_beta: f32,
    batch_norm_mode: BatchNormMode,
}

impl ArchitectureBuilder {
    pub fn new(board_dimension: usize) -> Self {
        Self {
            board_dimension,
            num_filters: DEFAULT_NUM_FILTERS,
            num_blocks: DEFAULT_NUM_BLOCKS,
            policy_filters: DEFAULT_POLICY_FILTERS,
            value_filters: DEFAULT_VALUE_FILTERS,
            value_hidden_units: DEFAULT_VALUE_HIDDEN_UNITS,
            value_hidden_layers: DEFAULT_VALUE_HIDDEN_LAYERS,
            l2_beta: DEFAULT_L2_BETA,
            batch_norm_mode: BatchNormMode::Batch,
        }
    }

    pub fn num_filters(mut self, num_filters: usize) -> Self {
        self.num_filters = num_filters;
        self
    }

    pub fn num_blocks(mut self, num_blocks: usize) -> Self {
        self.num_blocks = num_blocks;
        self
    }

    pub fn policy_filters(mut self, policy_filters: usize) -> Self {
        self.policy_filters = policy_filters;
        self
    }

    pub fn value_filters(mut self, value_filters: usize) -> Self {
        self.value_filters = value_filters;
        self
    }

    pub fn value_hidden(mut self, units: usize, layers: usize) -> Self {
        self.value_hidden_units = units;
        self.value_hidden_layers = layers;
        self
    }

    pub fn l2_beta(mut self, l2_beta: f32) -> Self {
        self.l2_beta = l2_beta;
        self
    }

    pub fn batch_norm_mode(mut self, batch_norm_mode: BatchNormMode) -> Self {
        self.batch_norm_mode = batch_norm_mode;
        self
    }

    pub fn build(self) -> ArchitectureSpec {
        let trunk = ConvSpec::new(self.num_filters, 3);

        ArchitectureSpec {
            board_dimension: self.board_dimension,
            input_channels: INPUT_CHANNELS,
            stem: trunk.clone(),
            residual_blocks: (0..self.num_blocks)
                .map(|_| ResidualBlockSpec {
                    first: trunk.clone(),
                    second: trunk.clone(),
                })
                .collect(),
            policy_head: PolicyHeadSpec {
                conv: ConvSpec::new(self.policy_filters, 1),
            },
            value_head: ValueHeadSpec {
                conv: ConvSpec::new(self.value_filters, 1),
                hidden: (0..self.value_hidden_layers)
                    .map(|_| DenseSpec {
                        units: self.value_hidden_units,
                        relu: true,
                        l2: true,
                    })
                    .collect(),
            },
            l2_beta: self.l2_beta,
            batch_norm_mode: self.batch_norm_mode,
            batch_norm_momentum: BATCH_NORM_MOMENTUM,
            batch_norm_epsilon: BATCH_NORM_EPSILON,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_topology() {
        let spec = ArchitectureSpec::new(5, 0.0001);

        assert_eq!(spec.input_shape(), [5, 5, 3]);
        assert_eq!(spec.policy_size(), 26);
        assert_eq!(spec.stem, ConvSpec::new(64, 3));
        assert_eq!(spec.residual_blocks.len(), 3);
        assert_eq!(spec.policy_head.conv, ConvSpec::new(2, 1));
        assert_eq!(spec.value_head.conv, ConvSpec::new(1, 1));
        assert_eq!(spec.value_head.hidden.len(), 2);
        assert!(spec.value_head.hidden.iter().all(|d| d.units == 256 && d.relu));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_parameter_count_of_default_topology() {
        let spec = ArchitectureSpec::new(5, 0.0001);

        let stem = 3 * 3 * 3 * 64 + 64 + 128;
        let trunk_conv = 3 * 3 * 64 * 64 + 64 + 128;
        let policy = (64 * 2 + 2 + 4) + (50 * 26 + 26);
        let value = (64 + 1 + 2) + (25 * 256 + 256) + (256 * 256 + 256) + (256 + 1);

        assert_eq!(
            spec.parameter_count(),
            stem + 6 * trunk_conv + policy + value
        );
    }

    #[test]
    fn test_residual_width_must_match() {
        let mut spec = ArchitectureSpec::builder(5).num_filters(8).build();
        spec.residual_blocks[1].second.filters = 16;

        assert_eq!(
            spec.validate(),
            Err(ArchitectureError::ResidualWidth {
                block: 1,
                input: 8,
                output: 16
            })
        );
    }

    #[test]
    fn test_rejects_empty_layers_and_even_kernels() {
        assert_eq!(
            ArchitectureSpec::builder(0).build().validate(),
            Err(ArchitectureError::EmptyBoard)
        );

        let spec = ArchitectureSpec::builder(5).policy_filters(0).build();
        assert!(matches!(
            spec.validate(),
            Err(ArchitectureError::EmptyLayer { .. })
        ));

        let mut spec = ArchitectureSpec::builder(5).build();
        spec.stem.kernel_size = 2;
        assert!(matches!(
            spec.validate(),
            Err(ArchitectureError::EvenKernel { kernel_size: 2, .. })
        ));
    }

    #[test]
    fn test_describe_lists_every_layer() {
        let spec = ArchitectureSpec::builder(3).num_blocks(1).build();
        let lines = spec.describe();

        assert_eq!(lines.len(), 1 + 1 + 2 + 2 + 1 + 2 + 1);
        assert_eq!(lines[0], "input: 3x3x3");
        assert!(lines.last().unwrap().ends_with("tanh"));
    }

    #[test]
    fn test_spec_serializes() {
        let spec = ArchitectureSpec::builder(4)
            .batch_norm_mode(BatchNormMode::Running)
            .build();
        let json = serde_json::to_string(&spec).unwrap();

        assert!(json.contains("\"batch_norm_mode\":\"running\""));
        assert_eq!(
            serde_json::from_str::<ArchitectureSpec>(&json).unwrap(),
            spec
        );
    }
}
