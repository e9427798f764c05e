use std::collections::VecDeque;

use engine::BoardPosition;
use model::PositionMetrics;

use super::batches::TrainingBatch;
use super::error::Result;

pub const DEFAULT_SAMPLE_PER_BATCH: usize = 3;
pub const DEFAULT_SAMPLE_CAPACITY: usize = 300;

/// Rolling record of training progress: a bounded sample of past training
/// examples that the loss is re-evaluated on after every step, and the
/// sequence of those losses.
#[derive(Clone, Debug)]
pub struct TrainingHistory {
    sample_per_batch: usize,
    sample_capacity: usize,
    sample: VecDeque<PositionMetrics<BoardPosition>>,
    losses: Vec<f32>,
}

impl TrainingHistory {
    pub fn new(sample_per_batch: usize, sample_capacity: usize) -> Self {
        Self {
            sample_per_batch,
            sample_capacity,
            sample: VecDeque::with_capacity(sample_capacity),
            losses: Vec::new(),
        }
    }

    /// An empty history with the same sampling settings.
    pub fn fresh(&self) -> Self {
        Self::new(self.sample_per_batch, self.sample_capacity)
    }

    /// Appends the first examples of `batch` to the sample, evicting the oldest beyond capacity.
    pub fn record_batch(&mut self, batch: &TrainingBatch) {
        for metric in batch.metrics().take(self.sample_per_batch) {
            self.sample.push_back(metric);
        }

        while self.sample.len() > self.sample_capacity {
            self.sample.pop_front();
        }
    }

    pub fn record_loss(&mut self, loss: f32) {
        self.losses.push(loss);
    }

    pub fn sample_len(&self) -> usize {
        self.sample.len()
    }

    /// The current sample as a batch, `None` while it is empty.
    pub fn sample_batch(&self) -> Result<Option<TrainingBatch>> {
        if self.sample.is_empty() {
            return Ok(None);
        }

        TrainingBatch::from_metrics(&self.sample).map(Some)
    }

    pub fn losses(&self) -> &[f32] {
        &self.losses
    }

    pub fn last_loss(&self) -> Option<f32> {
        self.losses.last().copied()
    }
}

impl Default for TrainingHistory {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_PER_BATCH, DEFAULT_SAMPLE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::Player;
    use ndarray::Array2;

    fn batch(rows: usize, value: f32) -> TrainingBatch {
        TrainingBatch::new(
            vec![BoardPosition::empty(2, Player::White); rows],
            Array2::from_elem((rows, 5), 0.2),
            Array2::from_shape_fn((rows, 1), |(i, _)| value + i as f32),
        )
    }

    #[test]
    fn test_records_first_examples_of_each_batch() {
        let mut history = TrainingHistory::new(3, 300);

        history.record_batch(&batch(10, 0.0));
        history.record_batch(&batch(2, 100.0));

        let sample = history.sample_batch().unwrap().unwrap();
        assert_eq!(sample.len(), 5);
        assert_eq!(
            sample.value_targets.column(0).to_vec(),
            vec![0.0, 1.0, 2.0, 100.0, 101.0]
        );
    }

    #[test]
    fn test_sample_is_bounded() {
        let mut history = TrainingHistory::new(3, 7);

        for step in 0..5 {
            history.record_batch(&batch(4, step as f32 * 10.0));
        }

        let sample = history.sample_batch().unwrap().unwrap();
        assert_eq!(history.sample_len(), 7);
        // The oldest examples were evicted first.
        assert_eq!(sample.value_targets[[0, 0]], 22.0);
        assert_eq!(sample.value_targets[[6, 0]], 42.0);
    }

    #[test]
    fn test_empty_history() {
        let history = TrainingHistory::default();

        assert!(history.sample_batch().unwrap().is_none());
        assert_eq!(history.last_loss(), None);
    }

    #[test]
    fn test_fresh_keeps_settings_only() {
        let mut history = TrainingHistory::new(1, 2);
        history.record_batch(&batch(3, 0.0));
        history.record_loss(0.5);

        let mut fresh = history.fresh();
        assert_eq!(fresh.sample_len(), 0);
        assert!(fresh.losses().is_empty());

        for _ in 0..3 {
            fresh.record_batch(&batch(3, 0.0));
        }
        assert_eq!(fresh.sample_len(), 2);
    }
}
