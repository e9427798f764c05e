/// A training example: a position together with the search policy and the
/// eventual outcome, both from the perspective of the player to move.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionMetrics<S> {
    pub game_state: S,
    pub policy: Vec<f32>,
    pub score: f32,
}

impl<S> PositionMetrics<S> {
    pub fn new(game_state: S, policy: Vec<f32>, score: f32) -> Self {
        Self {
            game_state,
            policy,
            score,
        }
    }
}
