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

pub mod merge;
pub mod repeat;
pub mod tta;

/// Stateless stage of a wrapped inference pipeline.
pub trait Layer: Send + Sync {
    fn forward(&self, input: &Tensor) -> Result<Tensor, BellandeError>;

    /// Shape `forward` produces for an input of `input_shape`.
    fn compute_output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, BellandeError>;

    fn name(&self) -> &str;
}
