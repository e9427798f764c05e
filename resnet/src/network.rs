use std::collections::HashMap;

use log::{debug, info};
use ndarray::{Array2, ArrayView4};
use parking_lot::{const_mutex, Mutex};
use tch::{nn, Device, Kind, Tensor};

use super::architecture::{ArchitectureSpec, BatchNormMode, ConvSpec};
use super::error::{ResNetError, Result};
use super::tensor;

/// Initialization draws from the global torch generator, so seeding and allocating happen together.
static ALLOCATION: Mutex<()> = const_mutex(());

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Train,
    Infer,
}

/// Raw outputs of a forward pass, still attached to the autograd graph.
pub struct Logits {
    /// `[B, N*N + 1]`
    pub policy: Tensor,
    /// `[B, 1]`
    pub value: Tensor,
}

impl Logits {
    pub fn to_output(&self) -> Result<NetworkOutput> {
        Ok(NetworkOutput {
            policy: tensor::to_array2(&self.policy.softmax(-1, Kind::Float))?,
            value: tensor::to_array2(&self.value.tanh())?,
            policy_logits: tensor::to_array2(&self.policy)?,
            value_logits: tensor::to_array2(&self.value)?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct NetworkOutput {
    /// `[B, N*N + 1]`, every row sums to one.
    pub policy: Array2<f32>,
    /// `[B, 1]` in `[-1, 1]`.
    pub value: Array2<f32>,
    pub policy_logits: Array2<f32>,
    pub value_logits: Array2<f32>,
}

/// The policy/value residual network with its parameters allocated in a [`nn::VarStore`].
pub struct Network {
    vs: nn::VarStore,
    spec: ArchitectureSpec,
    stem: ConvBlock,
    blocks: Vec<ResidualBlock>,
    policy_head: PolicyHead,
    value_head: ValueHead,
    decayed: Vec<Tensor>,
}

impl Network {
    pub fn build(spec: &ArchitectureSpec, seed: u64) -> Result<Self> {
        spec.validate()?;

        Ok(Self::allocate(spec, seed))
    }

    /// Allocates the parameters of an already validated spec.
    pub(crate) fn allocate(spec: &ArchitectureSpec, seed: u64) -> Self {
        let _allocation = ALLOCATION.lock();
        tch::manual_seed(seed as i64);

        let vs = nn::VarStore::new(Device::Cpu);
        let root = vs.root();
        let cells = spec.num_cells() as i64;
        let mut decayed = Vec::new();

        let stem = ConvBlock::new(&(&root / "stem"), spec.input_channels, &spec.stem, spec);
        stem.collect_decayed(&spec.stem, &mut decayed);

        let mut width = spec.stem.filters;
        let mut blocks = Vec::with_capacity(spec.residual_blocks.len());
        for (i, block) in spec.residual_blocks.iter().enumerate() {
            let path = &root / format!("res{}", i);
            let first = ConvBlock::new(&(&path / "conv1"), width, &block.first, spec);
            let second =
                ConvBlock::new(&(&path / "conv2"), block.first.filters, &block.second, spec);
            first.collect_decayed(&block.first, &mut decayed);
            second.collect_decayed(&block.second, &mut decayed);
            blocks.push(ResidualBlock { first, second });
            width = block.second.filters;
        }

        let policy_path = &root / "policy_head";
        let policy_conv = &spec.policy_head.conv;
        let policy_head = PolicyHead {
            block: ConvBlock::new(&policy_path, width, policy_conv, spec),
            logits: nn::linear(
                &policy_path / "logits",
                cells * policy_conv.filters as i64,
                spec.policy_size() as i64,
                Default::default(),
            ),
        };
        policy_head
            .block
            .collect_decayed(policy_conv, &mut decayed);

        let value_path = &root / "value_head";
        let value_conv = &spec.value_head.conv;
        let block = ConvBlock::new(&value_path, width, value_conv, spec);
        block.collect_decayed(value_conv, &mut decayed);

        let mut inputs = cells * value_conv.filters as i64;
        let mut hidden = Vec::with_capacity(spec.value_head.hidden.len());
        for (i, dense) in spec.value_head.hidden.iter().enumerate() {
            let layer = nn::linear(
                &value_path / format!("dense{}", i),
                inputs,
                dense.units as i64,
                Default::default(),
            );
            if dense.l2 {
                decayed.push(layer.ws.shallow_clone());
            }
            hidden.push(HiddenLayer {
                dense: layer,
                relu: dense.relu,
            });
            inputs = dense.units as i64;
        }
        let value_head = ValueHead {
            block,
            hidden,
            logit: nn::linear(&value_path / "logit", inputs, 1, Default::default()),
        };

        let network = Self {
            vs,
            spec: spec.clone(),
            stem,
            blocks,
            policy_head,
            value_head,
            decayed,
        };

        info!(
            "Built network for {0}x{0} boards with {1} residual blocks and {2} parameters",
            spec.board_dimension,
            spec.residual_blocks.len(),
            network.parameter_count()
        );

        network
    }

    pub fn spec(&self) -> &ArchitectureSpec {
        &self.spec
    }

    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    pub(crate) fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }

    /// Runs the network over a `[B, N, N, C]` batch.
    pub fn forward(&self, input: ArrayView4<f32>, mode: Mode) -> Result<Logits> {
        self.check_input(input)?;
        let train = self.uses_batch_statistics(mode);

        debug!(
            "Forward pass over {} positions in {:?} mode",
            input.dim().0,
            mode
        );

        let xs = tensor::from_nhwc(input);
        let mut trunk = self.stem.forward_t(&xs, train).relu();
        for block in &self.blocks {
            trunk = block.forward_t(&trunk, train);
        }

        Ok(Logits {
            policy: self.policy_head.forward_t(&trunk, train),
            value: self.value_head.forward_t(&trunk, train),
        })
    }

    /// Inference mode forward pass. Deterministic and independent of the other positions in the batch.
    pub fn evaluate(&self, input: ArrayView4<f32>) -> Result<NetworkOutput> {
        tch::no_grad(|| self.forward(input, Mode::Infer)?.to_output())
    }

    /// `beta * sum(w^2) / 2` over every decayed kernel.
    pub fn regularization_loss(&self) -> Tensor {
        let penalty = self
            .decayed
            .iter()
            .fold(Tensor::from(0f32), |acc, w| acc + w.square().sum(Kind::Float));

        penalty * (self.spec.l2_beta as f64 / 2.0)
    }

    /// Number of trained scalars. Batch norm running averages are not counted.
    pub fn parameter_count(&self) -> usize {
        self.vs
            .trainable_variables()
            .iter()
            .map(Tensor::numel)
            .sum()
    }

    /// Every stored tensor by name, running averages included.
    pub fn variables(&self) -> HashMap<String, Tensor> {
        self.vs.variables()
    }

    fn uses_batch_statistics(&self, mode: Mode) -> bool {
        mode == Mode::Train && self.spec.batch_norm_mode == BatchNormMode::Batch
    }

    fn check_input(&self, input: ArrayView4<f32>) -> Result<()> {
        let (batch, height, width, channels) = input.dim();
        let expected = self.spec.input_shape();

        if batch == 0 || [height, width, channels] != expected {
            return Err(ResNetError::shape_mismatch(
                "network input",
                &[batch.max(1), expected[0], expected[1], expected[2]],
                input.shape(),
            ));
        }

        Ok(())
    }
}

/// Convolution followed by batch normalization, activation left to the caller.
struct ConvBlock {
    conv: nn::Conv2D,
    norm: nn::BatchNorm,
}

impl ConvBlock {
    fn new(path: &nn::Path, in_channels: usize, conv: &ConvSpec, spec: &ArchitectureSpec) -> Self {
        let conv_config = nn::ConvConfig {
            padding: (conv.kernel_size / 2) as i64,
            ..Default::default()
        };
        // Torch momentum is the weight of the new batch, not of the running average.
        let norm_config = nn::BatchNormConfig {
            momentum: 1.0 - spec.batch_norm_momentum as f64,
            eps: spec.batch_norm_epsilon as f64,
            ..Default::default()
        };

        Self {
            conv: nn::conv2d(
                path / "conv",
                in_channels as i64,
                conv.filters as i64,
                conv.kernel_size as i64,
                conv_config,
            ),
            norm: nn::batch_norm2d(path / "batch_norm", conv.filters as i64, norm_config),
        }
    }

    fn collect_decayed(&self, conv: &ConvSpec, decayed: &mut Vec<Tensor>) {
        if conv.l2 {
            decayed.push(self.conv.ws.shallow_clone());
        }
    }

    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        xs.apply(&self.conv).apply_t(&self.norm, train)
    }
}

struct ResidualBlock {
    first: ConvBlock,
    second: ConvBlock,
}

impl ResidualBlock {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let out = self.first.forward_t(xs, train).relu();
        let out = self.second.forward_t(&out, train);

        (out + xs).relu()
    }
}

struct PolicyHead {
    block: ConvBlock,
    logits: nn::Linear,
}

impl PolicyHead {
    fn forward_t(&self, trunk: &Tensor, train: bool) -> Tensor {
        self.block
            .forward_t(trunk, train)
            .relu()
            .flatten(1, -1)
            .apply(&self.logits)
    }
}

struct HiddenLayer {
    dense: nn::Linear,
    relu: bool,
}

struct ValueHead {
    block: ConvBlock,
    hidden: Vec<HiddenLayer>,
    logit: nn::Linear,
}

impl ValueHead {
    fn forward_t(&self, trunk: &Tensor, train: bool) -> Tensor {
        let mut xs = self.block.forward_t(trunk, train).relu().flatten(1, -1);
        for layer in &self.hidden {
            xs = xs.apply(&layer.dense);
            if layer.relu {
                xs = xs.relu();
            }
        }

        xs.apply(&self.logit)
    }
}
