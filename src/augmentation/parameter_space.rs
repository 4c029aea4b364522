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

use crate::augmentation::axis::{Axis, AxisKind, Param, TransformFn, AXIS_ORDER};
use crate::core::error::BellandeError;
use crate::utilities::config::AugmentationConfig;
use std::fmt;
use tracing::debug;

/// Parameter values for one replica, one entry per axis of the pass it
/// belongs to, in that pass's axis order.
pub type Combination = Vec<Param>;

/// Ordered axis functions paired with one combination per replica.
#[derive(Clone)]
pub struct Pass {
    pub axes: Vec<AxisKind>,
    pub functions: Vec<TransformFn>,
    pub combinations: Vec<Combination>,
}

impl fmt::Debug for Pass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Pass")
            .field("axes", &self.axes)
            .field("combinations", &self.combinations.len())
            .finish()
    }
}

impl Pass {
    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }
}

/// Every combination of axis values, plus for each one the sequence that
/// undoes its geometric part.
///
/// Index `i` names the same replica in the forward and the backward list.
/// Photometric axes only appear in the forward pass.
#[derive(Clone, Debug)]
pub struct ParameterSpace {
    axes: Vec<Axis>,
    forward: Vec<Combination>,
    backward: Vec<Combination>,
}

impl ParameterSpace {
    pub fn new(axes: Vec<Axis>) -> Result<Self, BellandeError> {
        for (i, axis) in axes.iter().enumerate() {
            if axes[..i].iter().any(|other| other.kind == axis.kind) {
                return Err(BellandeError::InvalidConfiguration(format!(
                    "axis {} given more than once",
                    axis.kind
                )));
            }
            if axis.values.first() != Some(&axis.kind.identity()) {
                return Err(BellandeError::InvalidConfiguration(format!(
                    "axis {} must start with its identity value",
                    axis.kind
                )));
            }
        }

        let forward = cartesian_product(&axes)?;
        let backward = forward
            .iter()
            .map(|combination| invert(&axes, combination))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            axes = ?axes.iter().filter(|a| a.is_enabled()).map(|a| a.kind.name()).collect::<Vec<_>>(),
            n_transforms = forward.len(),
            "built augmentation parameter space"
        );

        Ok(ParameterSpace {
            axes,
            forward,
            backward,
        })
    }

    /// Builds all axes in their fixed order from wrapper options. Disabled
    /// axes still take part with their identity value.
    pub fn from_config(config: &AugmentationConfig) -> Result<Self, BellandeError> {
        config.validate()?;

        let pixels = |values: &Option<Vec<i32>>| -> Vec<Param> {
            values
                .iter()
                .flatten()
                .map(|&v| Param::Pixels(v))
                .collect()
        };
        let scalars = |values: &Option<Vec<f32>>| -> Vec<Param> {
            values
                .iter()
                .flatten()
                .map(|&v| Param::Scalar(v))
                .collect()
        };

        let axes = AXIS_ORDER
            .iter()
            .map(|&kind| match kind {
                AxisKind::HFlip => Axis::flip(kind, config.h_flip),
                AxisKind::VFlip => Axis::flip(kind, config.v_flip),
                AxisKind::Rotation => {
                    let angles: Vec<Param> = config
                        .rotation
                        .iter()
                        .flatten()
                        .map(|&a| Param::Angle(a))
                        .collect();
                    Axis::enabled(kind, &angles)
                }
                AxisKind::HShift => Axis::enabled(kind, &pixels(&config.h_shift)),
                AxisKind::VShift => Axis::enabled(kind, &pixels(&config.v_shift)),
                AxisKind::Contrast => Axis::enabled(kind, &scalars(&config.contrast)),
                AxisKind::Add => Axis::enabled(kind, &scalars(&config.add)),
                AxisKind::Mul => Axis::enabled(kind, &scalars(&config.mul)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        ParameterSpace::new(axes)
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn n_transforms(&self) -> usize {
        self.forward.len()
    }

    /// True when some enabled axis moves pixels, i.e. spatial outputs need realigning.
    pub fn has_geometric_axes(&self) -> bool {
        self.axes
            .iter()
            .any(|axis| axis.kind.is_geometric() && axis.is_enabled())
    }

    /// Axes in application order with one combination per replica.
    pub fn forward(&self) -> Pass {
        Pass {
            axes: self.axes.iter().map(|axis| axis.kind).collect(),
            functions: self.axes.iter().map(|axis| axis.function).collect(),
            combinations: self.forward.clone(),
        }
    }

    /// Geometric axes in reverse order with the inverted combinations.
    pub fn backward(&self) -> Pass {
        let reversed: Vec<&Axis> = self.geometric_axes().rev().collect();
        Pass {
            axes: reversed.iter().map(|axis| axis.kind).collect(),
            functions: reversed.iter().map(|axis| axis.function).collect(),
            combinations: self.backward.clone(),
        }
    }

    pub fn forward_combinations(&self) -> &[Combination] {
        &self.forward
    }

    pub fn backward_combinations(&self) -> &[Combination] {
        &self.backward
    }

    fn geometric_axes(&self) -> impl DoubleEndedIterator<Item = &Axis> {
        self.axes.iter().filter(|axis| axis.kind.is_geometric())
    }
}

/// All combinations of axis values; the last axis varies fastest.
/// Product of the axis lengths, refused when it does not fit in `usize`.
fn transform_count<I>(lengths: I) -> Result<usize, BellandeError>
where
    I: IntoIterator<Item = usize>,
{
    lengths.into_iter().try_fold(1usize, |total, n| {
        total.checked_mul(n).ok_or_else(|| {
            BellandeError::InvalidConfiguration(
                "number of augmentation combinations overflows usize".to_string(),
            )
        })
    })
}

fn cartesian_product(axes: &[Axis]) -> Result<Vec<Combination>, BellandeError> {
    let total = transform_count(axes.iter().map(|axis| axis.values.len()))?;
    let mut combinations = Vec::with_capacity(total);

    for index in 0..total {
        let mut remaining = index;
        let mut combination = Vec::with_capacity(axes.len());
        for axis in axes.iter().rev() {
            let n = axis.values.len();
            combination.push(axis.values[remaining % n]);
            remaining /= n;
        }
        combination.reverse();
        combinations.push(combination);
    }

    Ok(combinations)
}

/// Inverted geometric values of `combination`, in reversed axis order.
fn invert(axes: &[Axis], combination: &[Param]) -> Result<Combination, BellandeError> {
    axes.iter()
        .zip(combination)
        .filter(|(axis, _)| axis.kind.is_geometric())
        .rev()
        .map(|(axis, param)| {
            param.inverse().ok_or_else(|| {
                BellandeError::InvalidParameter(format!(
                    "value {} of axis {} cannot be inverted",
                    param, axis.kind
                ))
            })
        })
        .collect()
}
