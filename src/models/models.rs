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

/// A trained prediction model seen as an opaque batched function: one input
/// tensor of shape `(N, ...)` in, one output tensor with the same `N` out.
pub trait Model: Send + Sync {
    /// Forward pass over a whole batch. Must not assume a batch size of 1.
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, BellandeError>;

    /// Input shape without the batch axis, when the model can report it.
    fn input_shape(&self) -> Option<Vec<usize>> {
        None
    }
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, BellandeError> {
        (**self).forward(input)
    }

    fn input_shape(&self) -> Option<Vec<usize>> {
        (**self).input_shape()
    }
}
