use super::board::Player;

pub trait Value: Clone {
    fn get_value_for_player(&self, player: Player) -> f32;
}

/// An outcome estimate in [-1, 1] from the perspective of the player to move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionValue {
    pub value: f32,
    pub player_to_move: Player,
}

impl PositionValue {
    pub fn new(value: f32, player_to_move: Player) -> Self {
        Self {
            value,
            player_to_move,
        }
    }
}

impl Value for PositionValue {
    fn get_value_for_player(&self, player: Player) -> f32 {
        if player == self.player_to_move {
            self.value
        } else {
            -self.value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_is_relative_to_player_to_move() {
        let value = PositionValue::new(0.25, Player::White);

        assert_eq!(value.get_value_for_player(Player::White), 0.25);
        assert_eq!(value.get_value_for_player(Player::Black), -0.25);
    }
}
