use ndarray::{Array2, ArrayView2, ArrayView4};
use tch::Tensor;

use super::error::{ResNetError, Result};

/// `[B, N, N, C]` host batch to a `[B, C, N, N]` tensor.
pub(crate) fn from_nhwc(input: ArrayView4<f32>) -> Tensor {
    let (batch, height, width, channels) = input.dim();
    let values = input.iter().copied().collect::<Vec<_>>();

    Tensor::from_slice(&values)
        .reshape([batch as i64, height as i64, width as i64, channels as i64])
        .permute([0, 3, 1, 2])
}

pub(crate) fn from_array2(array: ArrayView2<f32>) -> Tensor {
    let (rows, cols) = array.dim();
    let values = array.iter().copied().collect::<Vec<_>>();

    Tensor::from_slice(&values).reshape([rows as i64, cols as i64])
}

pub(crate) fn to_array2(tensor: &Tensor) -> Result<Array2<f32>> {
    let (rows, cols) = tensor.size2()?;
    let values = Vec::<f32>::try_from(&tensor.detach().flatten(0, -1))?;

    Array2::from_shape_vec((rows as usize, cols as usize), values).map_err(|_| {
        ResNetError::shape_mismatch("tensor", &[rows as usize, cols as usize], &[])
    })
}

pub(crate) fn dims(tensor: &Tensor) -> Vec<usize> {
    tensor.size().into_iter().map(|d| d as usize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array4};

    #[test]
    fn test_from_nhwc_moves_channels_first() {
        let input = Array4::from_shape_fn((2, 3, 3, 2), |(b, row, col, c)| {
            (b * 100 + row * 10 + col) as f32 + c as f32 * 0.5
        });

        let tensor = from_nhwc(input.view());

        assert_eq!(tensor.size(), vec![2, 2, 3, 3]);
        assert_eq!(tensor.double_value(&[1, 1, 2, 0]), 120.5);
        assert_eq!(tensor.double_value(&[0, 0, 0, 2]), 2.0);
    }

    #[test]
    fn test_array2_conversions_keep_layout() {
        let array = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];

        let tensor = from_array2(array.view());

        assert_eq!(dims(&tensor), vec![2, 3]);
        assert_eq!(to_array2(&tensor).unwrap(), array);
        assert_eq!(to_array2(&tensor.tr()).unwrap(), array.t());
    }
}
