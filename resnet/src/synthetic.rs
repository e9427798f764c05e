use engine::{BoardPosition, Player, BLACK, EMPTY, WHITE};
use model::PositionMetrics;
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;

use super::batches::TrainingBatch;

/// Random positions labelled with a task that only depends on the stones:
/// the policy target is one-hot at the total number of stones and the value
/// target says whether the side to move has more (1), fewer (-1) or as many
/// (0) stones as the opponent. Lets the network be trained without self-play.
pub fn generate_stone_count_data<R: Rng + ?Sized>(
    n: usize,
    board_dimension: usize,
    rng: &mut R,
) -> TrainingBatch {
    let metrics = (0..n)
        .map(|_| stone_count_example(board_dimension, rng))
        .collect::<Vec<_>>();

    TrainingBatch::from_metrics(&metrics)
        .expect("Every generated policy has the same length")
}

fn stone_count_example<R: Rng + ?Sized>(
    board_dimension: usize,
    rng: &mut R,
) -> PositionMetrics<BoardPosition> {
    let cells = board_dimension * board_dimension;
    let player = if rng.gen::<bool>() {
        Player::Black
    } else {
        Player::White
    };

    let grid = (0..cells)
        .map(|_| *[WHITE, EMPTY, BLACK].choose(rng).unwrap_or(&EMPTY))
        .collect::<Vec<_>>();
    let position = BoardPosition::new(board_dimension, grid, player.as_i8());

    let own = position.count_stones(player);
    let opponent = position.count_stones(player.opposite());

    let mut policy = vec![0.0; cells + 1];
    policy[own + opponent] = 1.0;

    let value = match own.cmp(&opponent) {
        Ordering::Greater => 1.0,
        Ordering::Less => -1.0,
        Ordering::Equal => 0.0,
    };

    PositionMetrics::new(position, policy, value)
}
