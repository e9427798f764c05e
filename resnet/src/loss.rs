use ndarray::{ArrayView2, Zip};
use serde::{Deserialize, Serialize};
use tch::{Kind, Reduction, Tensor};

use super::error::{ResNetError, Result};
use super::network::Logits;
use super::tensor::dims;

/// Values predicted within this distance of their target count as correct.
pub const VALUE_ACCURACY_TOLERANCE: f32 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LossBreakdown {
    pub value: f32,
    pub policy: f32,
    pub regularization: f32,
    pub total: f32,
}

impl LossBreakdown {
    pub fn new(value: f32, policy: f32, regularization: f32) -> Self {
        Self {
            value,
            policy,
            regularization,
            total: value + policy + regularization,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.value.is_finite()
            && self.policy.is_finite()
            && self.regularization.is_finite()
            && self.total.is_finite()
    }
}

/// The training objective of one batch: value MSE plus policy cross entropy plus the L2 penalty.
/// Every term is a scalar tensor still attached to the graph.
pub struct Loss {
    value: Tensor,
    policy: Tensor,
    regularization: Tensor,
}

impl Loss {
    pub fn new(
        logits: &Logits,
        policy_targets: &Tensor,
        value_targets: &Tensor,
        regularization: Tensor,
    ) -> Result<Self> {
        if policy_targets.size() != logits.policy.size() {
            return Err(ResNetError::shape_mismatch(
                "policy targets",
                &dims(&logits.policy),
                &dims(policy_targets),
            ));
        }

        if value_targets.size() != logits.value.size() {
            return Err(ResNetError::shape_mismatch(
                "value targets",
                &dims(&logits.value),
                &dims(value_targets),
            ));
        }

        let batch_size = logits.value.size()[0] as f64;
        let value = logits.value.tanh().mse_loss(value_targets, Reduction::Mean);
        let policy = -(policy_targets * logits.policy.log_softmax(-1, Kind::Float))
            .sum(Kind::Float)
            / batch_size;

        Ok(Self {
            value,
            policy,
            regularization,
        })
    }

    pub fn total(&self) -> Tensor {
        &self.value + &self.policy + &self.regularization
    }

    pub fn breakdown(&self) -> Result<LossBreakdown> {
        Ok(LossBreakdown::new(
            f64::try_from(&self.value)? as f32,
            f64::try_from(&self.policy)? as f32,
            f64::try_from(&self.regularization)? as f32,
        ))
    }
}

/// Fraction of value predictions within [`VALUE_ACCURACY_TOLERANCE`] of their target.
pub fn value_accuracy(predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> f32 {
    if predictions.is_empty() {
        return 0.0;
    }

    let correct = Zip::from(&predictions)
        .and(&targets)
        .fold(0usize, |acc, &p, &t| {
            acc + ((p - t).abs() < VALUE_ACCURACY_TOLERANCE) as usize
        });

    correct as f32 / predictions.len() as f32
}
