use std::fmt;

pub const EMPTY: i8 = 0;
pub const BLACK: i8 = 1;
pub const WHITE: i8 = -1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Player {
    Black,
    White,
}

impl Player {
    pub fn from_i8(value: i8) -> Option<Self> {
        match value {
            BLACK => Some(Player::Black),
            WHITE => Some(Player::White),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> i8 {
        match self {
            Player::Black => BLACK,
            Player::White => WHITE,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }
}

/// A snapshot of a square board and the player about to move.
///
/// Cells hold the raw values handed over by the game module: `1` for a black
/// stone, `-1` for a white stone and `0` for an empty point. The values are not
/// checked here; consumers that need valid cells must validate them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BoardPosition {
    dimension: usize,
    grid: Vec<i8>,
    player: i8,
}

impl BoardPosition {
    /// Creates a position from a row-major grid.
    ///
    /// Panics if the grid does not hold `dimension * dimension` cells.
    pub fn new(dimension: usize, grid: Vec<i8>, player: i8) -> Self {
        assert_eq!(
            grid.len(),
            dimension * dimension,
            "Grid of {} cells does not match a board of dimension {}",
            grid.len(),
            dimension
        );

        Self {
            dimension,
            grid,
            player,
        }
    }

    pub fn empty(dimension: usize, player: Player) -> Self {
        Self::new(
            dimension,
            vec![EMPTY; dimension * dimension],
            player.as_i8(),
        )
    }

    /// Creates a position from rows. Returns `None` when the rows are ragged or not square.
    pub fn from_rows(rows: &[Vec<i8>], player: i8) -> Option<Self> {
        let dimension = rows.len();
        if rows.iter().any(|row| row.len() != dimension) {
            return None;
        }

        let grid = rows.iter().flatten().copied().collect();

        Some(Self::new(dimension, grid, player))
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn grid(&self) -> &[i8] {
        &self.grid
    }

    pub fn cell(&self, row: usize, col: usize) -> i8 {
        self.grid[row * self.dimension + col]
    }

    pub fn player(&self) -> i8 {
        self.player
    }

    pub fn player_to_move(&self) -> Option<Player> {
        Player::from_i8(self.player)
    }

    pub fn with_cell(mut self, row: usize, col: usize, value: i8) -> Self {
        self.grid[row * self.dimension + col] = value;
        self
    }

    pub fn count_stones(&self, player: Player) -> usize {
        let value = player.as_i8();
        self.grid.iter().filter(|&&cell| cell == value).count()
    }
}

impl fmt::Display for BoardPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.grid.chunks(self.dimension) {
            for cell in row {
                let symbol = match *cell {
                    BLACK => 'x',
                    WHITE => 'o',
                    EMPTY => '.',
                    _ => '?',
                };
                write!(f, "{}", symbol)?;
            }
            writeln!(f)?;
        }

        let to_move = match self.player_to_move() {
            Some(Player::Black) => "x",
            Some(Player::White) => "o",
            None => "?",
        };

        write!(f, "to move: {}", to_move)
    }
}
