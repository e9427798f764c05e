use engine::{BoardPosition, BLACK, EMPTY, WHITE};
use model::ConvInputBuilder;
use ndarray::{Array3, Array4, ArrayView3, Axis};
use rayon::prelude::*;

use super::error::{ResNetError, Result};

pub const INPUT_CHANNELS: usize = 3;

const WHITE_CHANNEL: usize = 0;
const BLACK_CHANNEL: usize = 1;
const PLAYER_CHANNEL: usize = 2;

/// Converts board positions into `[N, N, 3]` network inputs.
///
/// Channel 0 marks white stones (`-1`), channel 1 marks black stones (`1`) and
/// channel 2 repeats the side to move over every point. The side to move is
/// not recoverable cell by cell, so only the stones round trip through
/// [`BoardEncoder::decode_stones`].
#[derive(Clone, Copy, Debug)]
pub struct BoardEncoder {
    board_dimension: usize,
}

impl BoardEncoder {
    pub fn new(board_dimension: usize) -> Self {
        Self { board_dimension }
    }

    pub fn board_dimension(&self) -> usize {
        self.board_dimension
    }

    pub fn input_shape(&self) -> [usize; 3] {
        [self.board_dimension, self.board_dimension, INPUT_CHANNELS]
    }

    pub fn encode(&self, position: &BoardPosition) -> Result<Array3<f32>> {
        let dimension = self.board_dimension;
        if position.dimension() != dimension {
            return Err(ResNetError::shape_mismatch(
                "board",
                &[dimension, dimension],
                &[position.dimension(), position.dimension()],
            ));
        }

        let player = position.player();
        if player != BLACK && player != WHITE {
            return Err(ResNetError::InvalidSideToMove(player));
        }

        let channel_size = dimension * dimension;
        let mut input = vec![0.0f32; channel_size * INPUT_CHANNELS];
        let mut builder = ConvInputBuilder::new(channel_size, &mut input);

        for (index, &cell) in position.grid().iter().enumerate() {
            let [white, black] = one_hot_stone(cell).ok_or(ResNetError::InvalidCellValue {
                row: index / dimension,
                col: index % dimension,
                value: cell,
            })?;

            builder.channel(WHITE_CHANNEL).write_at_idx(index, white);
            builder.channel(BLACK_CHANNEL).write_at_idx(index, black);
        }

        builder.channel(PLAYER_CHANNEL).fill(player as f32);

        Ok(Array3::from_shape_vec((dimension, dimension, INPUT_CHANNELS), input)
            .expect("Input buffer is sized from the board dimension"))
    }

    /// Encodes every position into one `[B, N, N, 3]` tensor. Fails on the first invalid position.
    pub fn encode_batch(&self, positions: &[BoardPosition]) -> Result<Array4<f32>> {
        let encoded = positions
            .par_iter()
            .map(|position| self.encode(position))
            .collect::<Result<Vec<_>>>()?;

        self.stack(&encoded)
    }

    pub fn stack(&self, encoded: &[Array3<f32>]) -> Result<Array4<f32>> {
        let [h, w, c] = self.input_shape();
        let mut batch = Array4::<f32>::zeros((encoded.len(), h, w, c));

        for (mut slot, input) in batch.axis_iter_mut(Axis(0)).zip(encoded) {
            if input.shape() != [h, w, c] {
                return Err(ResNetError::shape_mismatch(
                    "encoded input",
                    &[h, w, c],
                    input.shape(),
                ));
            }

            slot.assign(input);
        }

        Ok(batch)
    }

    /// Recovers the stone grid (row-major `-1`, `0`, `1`) from an encoded tensor.
    pub fn decode_stones(&self, tensor: ArrayView3<f32>) -> Vec<i8> {
        let dimension = self.board_dimension;
        let mut grid = Vec::with_capacity(dimension * dimension);

        for row in 0..dimension {
            for col in 0..dimension {
                let cell = if tensor[[row, col, WHITE_CHANNEL]] > 0.5 {
                    WHITE
                } else if tensor[[row, col, BLACK_CHANNEL]] > 0.5 {
                    BLACK
                } else {
                    EMPTY
                };
                grid.push(cell);
            }
        }

        grid
    }
}

fn one_hot_stone(cell: i8) -> Option<[f32; 2]> {
    match cell {
        WHITE => Some([1.0, 0.0]),
        EMPTY => Some([0.0, 0.0]),
        BLACK => Some([0.0, 1.0]),
        _ => None,
    }
}
