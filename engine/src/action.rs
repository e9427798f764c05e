use std::fmt;

/// A move identifier as seen by the search: either a stone placement or a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Move {
    Place { row: usize, col: usize },
    Pass,
}

impl Move {
    /// Index of this move in a policy vector of length `dimension * dimension + 1`.
    pub fn to_policy_index(&self, dimension: usize) -> usize {
        match *self {
            Move::Place { row, col } => row * dimension + col,
            Move::Pass => dimension * dimension,
        }
    }

    pub fn from_policy_index(index: usize, dimension: usize) -> Option<Self> {
        let num_cells = dimension * dimension;
        if index < num_cells {
            Some(Move::Place {
                row: index / dimension,
                col: index % dimension,
            })
        } else if index == num_cells {
            Some(Move::Pass)
        } else {
            None
        }
    }

    pub fn policy_size(dimension: usize) -> usize {
        dimension * dimension + 1
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Place { row, col } => write!(f, "({}, {})", row, col),
            Move::Pass => write!(f, "pass"),
        }
    }
}
