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

//! Wraps a trained model into a single test-time augmentation pipeline.
//!
//! Constraints on the wrapped model:
//! 1. it takes one input tensor and returns one output tensor;
//! 2. it accepts the whole replica batch `(N, H, W, C)` at once;
//! 3. images must be square when rotating by 90 or 270 degrees.

use crate::augmentation::{
    axis::{AxisKind, Param},
    parameter_space::ParameterSpace,
};
use crate::core::{error::BellandeError, tensor::Tensor};
use crate::layer::{
    merge::{Merge, MergeStrategy, MergeWeights},
    repeat::Repeat,
    tta::Tta,
    Layer,
};
use crate::models::models::Model;
use crate::utilities::config::AugmentationConfig;
use tracing::{debug, trace};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Task {
    /// Outputs carry no spatial layout; replicas are merged as produced.
    Classification,
    /// Outputs are `(N, H, W, C')` maps realigned to the input frame before merging.
    Segmentation,
}

/// Classification model test time augmentation wrapper.
pub fn tta_classification<M: Model>(
    model: M,
    config: &AugmentationConfig,
) -> Result<TtaModel<M>, BellandeError> {
    TtaModel::new(model, config, Task::Classification)
}

/// Segmentation model test time augmentation wrapper.
pub fn tta_segmentation<M: Model>(
    model: M,
    config: &AugmentationConfig,
) -> Result<TtaModel<M>, BellandeError> {
    TtaModel::new(model, config, Task::Segmentation)
}

/// A model wrapped as repeat → augment → model → (realign) → merge.
///
/// Takes a `(1, H, W, C)` input and returns a batch of one prediction.
pub struct TtaModel<M: Model> {
    model: M,
    task: Task,
    space: ParameterSpace,
    input_shape: Vec<usize>,
    repeat: Repeat,
    forward: Tta,
    backward: Option<Tta>,
    merge: Merge,
    weights: Option<MergeWeights>,
}

impl<M: Model> TtaModel<M> {
    pub fn new(model: M, config: &AugmentationConfig, task: Task) -> Result<Self, BellandeError> {
        config.validate()?;
        let strategy = config.merge_strategy()?;
        let space = ParameterSpace::from_config(config)?;

        let input_shape = config
            .input_shape
            .clone()
            .or_else(|| model.input_shape())
            .ok_or_else(|| {
                BellandeError::InvalidConfiguration(
                    "model does not report its input shape and none was configured".into(),
                )
            })?;
        check_input_shape(&input_shape, &space)?;

        let repeat = Repeat::new(space.n_transforms())?;
        let forward = Tta::new(space.forward())?;
        let backward = match task {
            Task::Segmentation => Some(Tta::new(space.backward())?),
            Task::Classification => None,
        };

        debug!(
            task = ?task,
            n_transforms = space.n_transforms(),
            merge = %strategy,
            input_shape = ?input_shape,
            "wrapped model for test time augmentation"
        );

        Ok(TtaModel {
            model,
            task,
            space,
            input_shape,
            repeat,
            forward,
            backward,
            merge: Merge::new(strategy),
            weights: None,
        })
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn n_transforms(&self) -> usize {
        self.space.n_transforms()
    }

    pub fn parameter_space(&self) -> &ParameterSpace {
        &self.space
    }

    /// Shape of one input image, without the batch axis.
    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    pub fn merge_strategy(&self) -> MergeStrategy {
        self.merge.strategy()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_inner(self) -> M {
        self.model
    }

    /// Weights used by `predict`; `None` until set or created on the first call.
    pub fn merge_weights(&self) -> Option<&MergeWeights> {
        self.weights.as_ref()
    }

    pub fn merge_weights_mut(&mut self) -> Option<&mut MergeWeights> {
        self.weights.as_mut()
    }

    pub fn set_merge_weights(&mut self, weights: MergeWeights) -> Result<(), BellandeError> {
        if weights.strategy() != self.merge.strategy() {
            return Err(BellandeError::InvalidConfiguration(format!(
                "weights built for '{}' cannot drive '{}' merge",
                weights.strategy(),
                self.merge.strategy()
            )));
        }
        self.weights = Some(weights);
        Ok(())
    }

    /// Merged prediction for a single input. Trainable strategies start from
    /// all-ones weights unless weights were set beforehand.
    pub fn predict(&mut self, input: &Tensor) -> Result<Tensor, BellandeError> {
        let outputs = self.replica_outputs(input)?;

        let strategy = self.merge.strategy();
        if strategy.is_trainable() && self.weights.is_none() {
            self.weights = Some(MergeWeights::ones(strategy, outputs.shape())?);
        }
        self.merge.merge(&outputs, self.weights.as_ref())
    }

    /// Merged prediction using weights owned by the caller.
    pub fn predict_with_weights(
        &mut self,
        input: &Tensor,
        weights: &MergeWeights,
    ) -> Result<Tensor, BellandeError> {
        let outputs = self.replica_outputs(input)?;
        self.merge.merge(&outputs, Some(weights))
    }

    /// Per-replica model outputs just before merging, realigned to the input
    /// frame for segmentation. Row `i` belongs to forward combination `i`.
    pub fn replica_outputs(&mut self, input: &Tensor) -> Result<Tensor, BellandeError> {
        let expected: Vec<usize> = std::iter::once(1)
            .chain(self.input_shape.iter().copied())
            .collect();
        if input.shape() != expected.as_slice() {
            return Err(BellandeError::ShapeMismatch(format!(
                "expected input of shape {:?}, got {:?}",
                expected,
                input.shape()
            )));
        }

        let replicas = self.repeat.forward(input)?;
        let augmented = self.forward.forward(&replicas)?;
        let outputs = self.model.forward(&augmented)?;
        trace!(shape = ?outputs.shape(), "model output");

        let n = self.space.n_transforms();
        if outputs.shape().first() != Some(&n) {
            return Err(BellandeError::ShapeMismatch(format!(
                "model returned shape {:?} for a batch of {} replicas",
                outputs.shape(),
                n
            )));
        }

        match &self.backward {
            None => Ok(outputs),
            Some(backward) => {
                let spatial = &self.input_shape[..2];
                if outputs.ndim() < 3 || &outputs.shape()[1..3] != spatial {
                    return Err(BellandeError::ShapeMismatch(format!(
                        "segmentation output {:?} does not keep the input height and width {:?}",
                        outputs.shape(),
                        spatial
                    )));
                }
                backward.forward(&outputs)
            }
        }
    }
}

impl<M: Model> Model for TtaModel<M> {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, BellandeError> {
        self.predict(input)
    }

    fn input_shape(&self) -> Option<Vec<usize>> {
        Some(self.input_shape.clone())
    }
}

fn check_input_shape(shape: &[usize], space: &ParameterSpace) -> Result<(), BellandeError> {
    if shape.len() < 2 || shape.contains(&0) {
        return Err(BellandeError::InvalidConfiguration(format!(
            "input shape {:?} must be (H, W, ...) with non-empty dimensions",
            shape
        )));
    }

    let quarter_turn = space
        .axes()
        .iter()
        .filter(|axis| axis.kind == AxisKind::Rotation)
        .flat_map(|axis| axis.values.iter())
        .any(|value| matches!(value, Param::Angle(angle) if (angle / 90) % 2 != 0));
    if quarter_turn && shape[0] != shape[1] {
        return Err(BellandeError::InvalidConfiguration(format!(
            "rotating by 90 or 270 degrees needs square images, input shape is {:?}",
            shape
        )));
    }

    Ok(())
}
