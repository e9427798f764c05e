use engine::{BoardPosition, Move, PositionValue};
use model::{ActionWithPolicy, GameAnalyzer, GameStateAnalysis};
use ndarray::ArrayView1;

use super::encoder::BoardEncoder;
use super::error::{ResNetError, Result};
use super::network::Network;

pub type MoveDistribution = GameStateAnalysis<Move, PositionValue>;

/// Read-only evaluation of positions with a trained network.
#[derive(Clone, Copy)]
pub struct Predictor<'n> {
    network: &'n Network,
    encoder: BoardEncoder,
}

impl<'n> Predictor<'n> {
    pub fn new(network: &'n Network) -> Self {
        Self {
            network,
            encoder: BoardEncoder::new(network.spec().board_dimension),
        }
    }

    /// The probability of every move, passing included, and the value for the side to move.
    pub fn predict(&self, position: &BoardPosition) -> Result<MoveDistribution> {
        self.predict_batch(std::slice::from_ref(position))?
            .pop()
            .ok_or_else(|| ResNetError::shape_mismatch("predictions", &[1], &[0]))
    }

    /// Evaluates all positions in a single forward pass.
    pub fn predict_batch(&self, positions: &[BoardPosition]) -> Result<Vec<MoveDistribution>> {
        if positions.is_empty() {
            return Ok(Vec::new());
        }

        let input = self.encoder.encode_batch(positions)?;
        let output = self.network.evaluate(input.view())?;

        positions
            .iter()
            .zip(output.policy.outer_iter())
            .zip(output.value.outer_iter())
            .map(|((position, policy), value)| self.to_analysis(position, policy, value[0]))
            .collect()
    }

    fn to_analysis(
        &self,
        position: &BoardPosition,
        policy: ArrayView1<f32>,
        value: f32,
    ) -> Result<MoveDistribution> {
        let player_to_move = position
            .player_to_move()
            .ok_or(ResNetError::InvalidSideToMove(position.player()))?;
        let dimension = self.encoder.board_dimension();

        let policy_scores = policy
            .iter()
            .enumerate()
            .filter_map(|(index, &score)| {
                Move::from_policy_index(index, dimension).map(|m| ActionWithPolicy::new(m, score))
            })
            .collect();

        Ok(GameStateAnalysis::new(
            PositionValue::new(value, player_to_move),
            policy_scores,
        ))
    }
}

impl GameAnalyzer for Predictor<'_> {
    type Action = Move;
    type State = BoardPosition;
    type Value = PositionValue;
    type Error = ResNetError;

    fn get_state_analysis(&self, game_state: &BoardPosition) -> Result<MoveDistribution> {
        self.predict(game_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::ArchitectureSpec;
    use assert_approx_eq::assert_approx_eq;
    use engine::{Player, Value};

    fn network() -> Network {
        let spec = ArchitectureSpec::builder(5).num_filters(8).num_blocks(1).build();
        Network::build(&spec, 3).unwrap()
    }

    #[test]
    fn test_distribution_covers_every_move() {
        let network = network();
        let predictor = Predictor::new(&network);

        let analysis = predictor
            .predict(&BoardPosition::empty(5, Player::Black))
            .unwrap();

        assert_eq!(analysis.policy_scores.len(), 26);
        assert_approx_eq!(analysis.total_policy(), 1.0, 0.0001);
        assert!(analysis.probability(&Move::Pass).is_some());
        assert_eq!(
            analysis.policy_scores[7].action,
            Move::Place { row: 1, col: 2 }
        );
        assert_eq!(analysis.to_map().len(), 26);
        assert!((-1.0..=1.0).contains(&analysis.value_score.value));
        assert_eq!(analysis.value_score.player_to_move, Player::Black);
    }

    #[test]
    fn test_value_flips_for_opponent() {
        let network = network();
        let predictor = Predictor::new(&network);

        let analysis = predictor
            .predict(&BoardPosition::empty(5, Player::White))
            .unwrap();
        let value = analysis.value_score;

        assert_eq!(
            value.get_value_for_player(Player::Black),
            -value.get_value_for_player(Player::White)
        );
    }

    #[test]
    fn test_batch_matches_single_predictions() {
        let network = network();
        let predictor = Predictor::new(&network);
        let positions = vec![
            BoardPosition::empty(5, Player::Black),
            BoardPosition::empty(5, Player::White).with_cell(2, 2, 1),
        ];

        let batch = predictor.predict_batch(&positions).unwrap();
        let single = predictor.predict(&positions[1]).unwrap();

        assert_eq!(batch.len(), 2);
        for (a, b) in batch[1].policy_scores.iter().zip(&single.policy_scores) {
            assert_eq!(a.action, b.action);
            assert_approx_eq!(a.policy_score, b.policy_score, 0.00001);
        }
    }

    #[test]
    fn test_usable_through_game_analyzer() {
        fn best_move<G>(analyzer: &G, state: &G::State) -> Option<G::Action>
        where
            G: GameAnalyzer,
            G::Action: Clone,
        {
            let analysis = analyzer.get_state_analysis(state).ok()?;
            analysis.top(1).into_iter().next().map(|p| p.action)
        }

        let network = network();
        let predictor = Predictor::new(&network);

        assert!(best_move(&predictor, &BoardPosition::empty(5, Player::Black)).is_some());
    }

    #[test]
    fn test_empty_batch() {
        let network = network();

        assert!(Predictor::new(&network).predict_batch(&[]).unwrap().is_empty());
    }
}
