use std::collections::HashMap;
use std::hash::Hash;

use engine::value::Value;

/// Evaluates a single game state. Implementations must not mutate the
/// underlying model, so repeated calls on the same state return the same analysis.
pub trait GameAnalyzer {
    type Action;
    type State;
    type Value: Value;
    type Error;

    fn get_state_analysis(
        &self,
        game_state: &Self::State,
    ) -> Result<GameStateAnalysis<Self::Action, Self::Value>, Self::Error>;
}

#[derive(Clone, Debug)]
pub struct GameStateAnalysis<A, V> {
    pub policy_scores: Vec<ActionWithPolicy<A>>,
    pub value_score: V,
}

impl<A, V> GameStateAnalysis<A, V> {
    pub fn new(value_score: V, policy_scores: Vec<ActionWithPolicy<A>>) -> Self {
        GameStateAnalysis {
            policy_scores,
            value_score,
        }
    }

    pub fn total_policy(&self) -> f32 {
        self.policy_scores.iter().map(|p| p.policy_score).sum()
    }
}

impl<A: PartialEq, V> GameStateAnalysis<A, V> {
    pub fn probability(&self, action: &A) -> Option<f32> {
        self.policy_scores
            .iter()
            .find(|p| &p.action == action)
            .map(|p| p.policy_score)
    }
}

impl<A: Clone + Eq + Hash, V> GameStateAnalysis<A, V> {
    pub fn to_map(&self) -> HashMap<A, f32> {
        self.policy_scores
            .iter()
            .map(|p| (p.action.clone(), p.policy_score))
            .collect()
    }
}

impl<A: Clone, V> GameStateAnalysis<A, V> {
    /// The `n` most probable actions, highest first.
    pub fn top(&self, n: usize) -> Vec<ActionWithPolicy<A>> {
        let mut sorted = self.policy_scores.clone();
        sorted.sort_by(|a, b| b.policy_score.total_cmp(&a.policy_score));
        sorted.truncate(n);
        sorted
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActionWithPolicy<A> {
    pub action: A,
    pub policy_score: f32,
}

impl<A> ActionWithPolicy<A> {
    pub fn new(action: A, policy_score: f32) -> Self {
        ActionWithPolicy {
            action,
            policy_score,
        }
    }
}
