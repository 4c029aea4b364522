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
use crate::models::models::Model;

/// Model backed by a closure.
pub struct Lambda<F> {
    function: F,
    input_shape: Option<Vec<usize>>,
}

impl<F> Lambda<F>
where
    F: FnMut(&Tensor) -> Result<Tensor, BellandeError> + Send + Sync,
{
    pub fn new(function: F) -> Self {
        Lambda {
            function,
            input_shape: None,
        }
    }

    /// Reports `input_shape` (without the batch axis) to wrappers.
    pub fn with_input_shape(mut self, input_shape: &[usize]) -> Self {
        self.input_shape = Some(input_shape.to_vec());
        self
    }
}

/// Model returning its input unchanged.
pub fn identity(
    input_shape: &[usize],
) -> Lambda<impl FnMut(&Tensor) -> Result<Tensor, BellandeError> + Send + Sync> {
    Lambda::new(|x: &Tensor| Ok(x.clone())).with_input_shape(input_shape)
}

impl<F> Model for Lambda<F>
where
    F: FnMut(&Tensor) -> Result<Tensor, BellandeError> + Send + Sync,
{
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, BellandeError> {
        (self.function)(input)
    }

    fn input_shape(&self) -> Option<Vec<usize>> {
        self.input_shape.clone()
    }
}
