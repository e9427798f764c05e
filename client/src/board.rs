use anyhow::{anyhow, Result};
use engine::{BoardPosition, Player, BLACK, EMPTY, WHITE};

/// Parses rows such as `x.o/.../o..` into a position with `player` to move.
pub fn parse_board(board: &str, player: i8) -> Result<BoardPosition> {
    let player = Player::from_i8(player)
        .ok_or_else(|| anyhow!("Player must be 1 (black) or -1 (white), found {}", player))?;

    let rows = board
        .trim()
        .split('/')
        .map(parse_row)
        .collect::<Result<Vec<_>>>()?;

    BoardPosition::from_rows(&rows, player.as_i8())
        .ok_or_else(|| anyhow!("Board {:?} is not square", board))
}

fn parse_row(row: &str) -> Result<Vec<i8>> {
    row.trim()
        .chars()
        .map(|c| match c {
            'x' | 'X' => Ok(BLACK),
            'o' | 'O' => Ok(WHITE),
            '.' => Ok(EMPTY),
            other => Err(anyhow!("Unexpected board character {:?}", other)),
        })
        .collect()
}
