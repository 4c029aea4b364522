// Copyright (C) 2024 Bellande Artificial Intelligence Computer Vision Research Innovation Center, Ronaldson Bellande

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::core::{error::BellandeError, tensor::Tensor};
use crate::layer::Layer;

/// Clones a single input into `n` identical replicas.
/// `(1, H, W, C)` becomes `(n, H, W, C)`.
pub struct Repeat {
    n: usize,
}

impl Repeat {
    pub fn new(n: usize) -> Result<Self, BellandeError> {
        if n == 0 {
            return Err(BellandeError::InvalidParameter(
                "Repeat needs at least one replica".into(),
            ));
        }
        Ok(Repeat { n })
    }

    pub fn n(&self) -> usize {
        self.n
    }
}

impl Layer for Repeat {
    fn forward(&self, input: &Tensor) -> Result<Tensor, BellandeError> {
        self.compute_output_shape(input.shape())?;

        let mut data = Vec::with_capacity(input.numel() * self.n);
        for _ in 0..self.n {
            data.extend_from_slice(input.data());
        }

        let mut shape = input.shape().to_vec();
        shape[0] = self.n;
        Ok(Tensor::new(data, shape, false))
    }

    fn compute_output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, BellandeError> {
        match input_shape.first() {
            Some(1) => {
                let mut shape = input_shape.to_vec();
                shape[0] = self.n;
                Ok(shape)
            }
            _ => Err(BellandeError::ShapeMismatch(format!(
                "Repeat expects a batch of exactly one input, got shape {:?}",
                input_shape
            ))),
        }
    }

    fn name(&self) -> &str {
        "Repeat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat() {
        let x = Tensor::arange(&[1, 2, 2, 1]);
        let out = Repeat::new(3).unwrap().forward(&x).unwrap();
        assert_eq!(out.shape(), &[3, 2, 2, 1]);
        for i in 0..3 {
            assert_eq!(out.batch(i).unwrap(), x.batch(0).unwrap());
        }
    }

    #[test]
    fn test_repeat_requires_single_input() {
        let layer = Repeat::new(2).unwrap();
        assert!(layer.forward(&Tensor::zeros(&[2, 2, 2, 1])).unwrap_err().is_shape());
        assert!(Repeat::new(0).is_err());
    }
}
