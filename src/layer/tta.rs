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

use crate::augmentation::parameter_space::Pass;
use crate::core::{error::BellandeError, tensor::Tensor};
use crate::layer::Layer;
use tracing::trace;

/// Applies to replica `i` every axis function of a pass, in order, with the
/// values of combination `i`, then restacks the replicas in index order.
///
/// Built from `ParameterSpace::forward` before inference and from
/// `ParameterSpace::backward` to realign spatial outputs afterwards.
pub struct Tta {
    pass: Pass,
}

impl Tta {
    pub fn new(pass: Pass) -> Result<Self, BellandeError> {
        if pass.is_empty() {
            return Err(BellandeError::InvalidParameter(
                "TTA layer needs at least one parameter combination".into(),
            ));
        }
        if let Some(bad) = pass
            .combinations
            .iter()
            .position(|combination| combination.len() != pass.functions.len())
        {
            return Err(BellandeError::InvalidParameter(format!(
                "combination {} has {} values for {} axes",
                bad,
                pass.combinations[bad].len(),
                pass.functions.len()
            )));
        }
        Ok(Tta { pass })
    }

    pub fn pass(&self) -> &Pass {
        &self.pass
    }

    fn apply_transforms(&self, images: &Tensor) -> Result<Tensor, BellandeError> {
        let mut transformed = Vec::with_capacity(self.pass.len());
        for (i, params) in self.pass.combinations.iter().enumerate() {
            let mut image = images.batch(i)?;
            for (f, &param) in self.pass.functions.iter().zip(params) {
                image = f(&image, param)?;
            }
            transformed.push(image);
        }

        Tensor::stack(&transformed).map_err(|e| match e {
            BellandeError::ShapeMismatch(msg) => BellandeError::ShapeMismatch(format!(
                "augmented replicas disagree in shape ({}); rotating by 90 or 270 degrees needs square images",
                msg
            )),
            other => other,
        })
    }
}

impl Layer for Tta {
    fn forward(&self, input: &Tensor) -> Result<Tensor, BellandeError> {
        self.compute_output_shape(input.shape())?;
        trace!(axes = ?self.pass.axes, shape = ?input.shape(), "applying transforms");
        self.apply_transforms(input)
    }

    fn compute_output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, BellandeError> {
        if input_shape.len() < 3 {
            return Err(BellandeError::InvalidShape(format!(
                "TTA layer expects a batch of images (N, H, W, ...), got {:?}",
                input_shape
            )));
        }
        if input_shape[0] != self.pass.len() {
            return Err(BellandeError::ShapeMismatch(format!(
                "batch of {} does not match {} augmentation combinations",
                input_shape[0],
                self.pass.len()
            )));
        }
        Ok(input_shape.to_vec())
    }

    fn name(&self) -> &str {
        "TTA"
    }
}
