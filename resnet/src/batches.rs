use engine::BoardPosition;
use log::info;
use model::PositionMetrics;
use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;

use super::error::{ResNetError, Result};

/// Positions with their policy and value targets, row `i` of every column belonging together.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingBatch {
    pub boards: Vec<BoardPosition>,
    /// `[B, N*N + 1]`
    pub policy_targets: Array2<f32>,
    /// `[B, 1]`
    pub value_targets: Array2<f32>,
}

impl TrainingBatch {
    pub fn new(
        boards: Vec<BoardPosition>,
        policy_targets: Array2<f32>,
        value_targets: Array2<f32>,
    ) -> Self {
        Self {
            boards,
            policy_targets,
            value_targets,
        }
    }

    /// Stacks the examples into a batch. Every policy must have the same length.
    pub fn from_metrics<'a, I>(metrics: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a PositionMetrics<BoardPosition>>,
    {
        let metrics = metrics.into_iter().collect::<Vec<_>>();
        let width = metrics.first().map_or(0, |m| m.policy.len());

        let mut boards = Vec::with_capacity(metrics.len());
        let mut policies = Vec::with_capacity(metrics.len() * width);
        let mut values = Vec::with_capacity(metrics.len());

        for metric in &metrics {
            if metric.policy.len() != width {
                return Err(ResNetError::shape_mismatch(
                    "policy target",
                    &[width],
                    &[metric.policy.len()],
                ));
            }

            boards.push(metric.game_state.clone());
            policies.extend_from_slice(&metric.policy);
            values.push(metric.score);
        }

        let rows = boards.len();
        let policy_targets = Array2::from_shape_vec((rows, width), policies)
            .map_err(|_| ResNetError::shape_mismatch("policy targets", &[rows, width], &[]))?;
        let value_targets = Array2::from_shape_vec((rows, 1), values)
            .map_err(|_| ResNetError::shape_mismatch("value targets", &[rows, 1], &[]))?;

        Ok(Self::new(boards, policy_targets, value_targets))
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    /// Checks that the batch is non empty, that the three columns have the same
    /// length and that the targets have the widths expected for `board_dimension`.
    pub fn validate(&self, board_dimension: usize) -> Result<()> {
        let rows = self.boards.len();
        let policy_size = board_dimension * board_dimension + 1;

        if rows == 0 {
            return Err(ResNetError::shape_mismatch("training batch", &[1], &[0]));
        }

        if self.policy_targets.dim() != (rows, policy_size) {
            return Err(ResNetError::shape_mismatch(
                "policy targets",
                &[rows, policy_size],
                self.policy_targets.shape(),
            ));
        }

        if self.value_targets.dim() != (rows, 1) {
            return Err(ResNetError::shape_mismatch(
                "value targets",
                &[rows, 1],
                self.value_targets.shape(),
            ));
        }

        Ok(())
    }

    /// The rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            boards: indices.iter().map(|&i| self.boards[i].clone()).collect(),
            policy_targets: self.policy_targets.select(Axis(0), indices),
            value_targets: self.value_targets.select(Axis(0), indices),
        }
    }

    pub fn metrics(&self) -> impl Iterator<Item = PositionMetrics<BoardPosition>> + '_ {
        self.boards.iter().enumerate().map(move |(i, board)| {
            PositionMetrics::new(
                board.clone(),
                self.policy_targets.row(i).to_vec(),
                self.value_targets[[i, 0]],
            )
        })
    }
}

/// Shuffled, equally sized batches over a dataset. Rows left over after the last
/// full batch are dropped.
pub struct MiniBatches<'a> {
    dataset: &'a TrainingBatch,
    order: Vec<usize>,
    batch_size: usize,
    position: usize,
}

impl<'a> MiniBatches<'a> {
    pub fn new<R: Rng + ?Sized>(dataset: &'a TrainingBatch, batch_size: usize, rng: &mut R) -> Self {
        let mut order = (0..dataset.len()).collect::<Vec<_>>();
        order.shuffle(rng);

        if batch_size > 0 {
            let usable = (dataset.len() / batch_size) * batch_size;
            if usable != dataset.len() {
                info!(
                    "Reduced training data from {} to {} to be a multiple of batch size {}",
                    dataset.len(),
                    usable,
                    batch_size
                );
            }
        }

        Self {
            dataset,
            order,
            batch_size,
            position: 0,
        }
    }

    pub fn num_batches(&self) -> usize {
        if self.batch_size == 0 {
            0
        } else {
            self.order.len() / self.batch_size
        }
    }
}

impl Iterator for MiniBatches<'_> {
    type Item = TrainingBatch;

    fn next(&mut self) -> Option<Self::Item> {
        let end = self.position + self.batch_size;
        if self.batch_size == 0 || end > self.order.len() {
            return None;
        }

        let batch = self.dataset.select(&self.order[self.position..end]);
        self.position = end;

        Some(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::Player;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Row `i` has `i` black stones in the first row of a 3x3 board (capped at 3),
    /// policy one-hot at `i` and value `i`.
    fn dataset(rows: usize) -> TrainingBatch {
        let metrics = (0..rows)
            .map(|i| {
                let mut board = BoardPosition::empty(3, Player::Black);
                for col in 0..i.min(3) {
                    board = board.with_cell(0, col, 1);
                }
                let mut policy = vec![0.0; 10];
                policy[i % 10] = 1.0;
                PositionMetrics::new(board, policy, i as f32)
            })
            .collect::<Vec<_>>();

        TrainingBatch::from_metrics(&metrics).unwrap()
    }

    #[test]
    fn test_from_metrics_stacks_rows() {
        let batch = dataset(4);

        assert_eq!(batch.len(), 4);
        assert_eq!(batch.policy_targets.dim(), (4, 10));
        assert_eq!(batch.value_targets.column(0).to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(batch.policy_targets[[2, 2]], 1.0);
        assert!(batch.validate(3).is_ok());
    }

    #[test]
    fn test_from_metrics_rejects_ragged_policies() {
        let board = BoardPosition::empty(3, Player::Black);
        let metrics = vec![
            PositionMetrics::new(board.clone(), vec![0.0; 10], 0.0),
            PositionMetrics::new(board, vec![0.0; 9], 0.0),
        ];

        assert!(matches!(
            TrainingBatch::from_metrics(&metrics),
            Err(ResNetError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_validate() {
        let batch = dataset(2);
        assert!(matches!(
            batch.validate(4),
            Err(ResNetError::ShapeMismatch {
                what: "policy targets",
                ..
            })
        ));

        let mut wide_values = dataset(2);
        wide_values.value_targets = array![[0.0, 0.0], [0.0, 0.0]];
        assert!(matches!(
            wide_values.validate(3),
            Err(ResNetError::ShapeMismatch {
                what: "value targets",
                ..
            })
        ));

        let mut missing_board = dataset(2);
        missing_board.boards.pop();
        assert!(missing_board.validate(3).is_err());

        let empty = TrainingBatch::new(vec![], Array2::zeros((0, 10)), Array2::zeros((0, 1)));
        assert!(matches!(
            empty.validate(3),
            Err(ResNetError::ShapeMismatch {
                what: "training batch",
                ..
            })
        ));
    }

    #[test]
    fn test_mini_batches_drop_remainder() {
        let data = dataset(23);
        let mut rng = StdRng::seed_from_u64(3);
        let batches = MiniBatches::new(&data, 5, &mut rng);

        assert_eq!(batches.num_batches(), 4);

        let batches = batches.collect::<Vec<_>>();
        assert_eq!(batches.len(), 4);
        assert!(batches.iter().all(|b| b.len() == 5));

        let mut seen = batches
            .iter()
            .flat_map(|b| b.value_targets.column(0).to_vec())
            .map(|v| v as usize)
            .collect::<Vec<_>>();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 20);
    }

    #[test]
    fn test_mini_batches_keep_rows_aligned() {
        let data = dataset(12);
        let mut rng = StdRng::seed_from_u64(8);

        for batch in MiniBatches::new(&data, 4, &mut rng) {
            for metric in batch.metrics() {
                let i = metric.score as usize;
                assert_eq!(metric.policy[i % 10], 1.0);
                assert_eq!(
                    metric.game_state.count_stones(Player::Black),
                    i.min(3)
                );
            }
        }
    }

    #[test]
    fn test_mini_batches_shuffle() {
        let data = dataset(30);
        let mut rng = StdRng::seed_from_u64(1);
        let first = MiniBatches::new(&data, 30, &mut rng).next().unwrap();

        assert_ne!(first.value_targets, data.value_targets);
    }

    #[test]
    fn test_zero_batch_size_yields_nothing() {
        let data = dataset(3);
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(MiniBatches::new(&data, 0, &mut rng).count(), 0);
    }
}
