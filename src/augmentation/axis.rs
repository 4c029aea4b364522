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
use crate::functional::transforms as F;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Value one axis takes for one replica.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Param {
    Flip(bool),
    /// Rotation in degrees, a multiple of 90.
    Angle(i32),
    /// Cyclic shift in pixels.
    Pixels(i32),
    /// Photometric contrast factor, offset or gain.
    Scalar(f32),
}

impl Param {
    /// Parameter that undoes this one. Flips are their own inverse, angles and
    /// shifts change sign. Photometric values, and `i32::MIN`, have no inverse.
    pub fn inverse(&self) -> Option<Param> {
        match *self {
            Param::Flip(apply) => Some(Param::Flip(apply)),
            Param::Angle(angle) => angle.checked_neg().map(Param::Angle),
            Param::Pixels(distance) => distance.checked_neg().map(Param::Pixels),
            Param::Scalar(_) => None,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Param::Flip(apply) => write!(f, "{}", apply),
            Param::Angle(angle) => write!(f, "{}deg", angle),
            Param::Pixels(distance) => write!(f, "{}px", distance),
            Param::Scalar(value) => write!(f, "{}", value),
        }
    }
}

/// Signature shared by every axis function.
pub type TransformFn = fn(&Tensor, Param) -> Result<Tensor, BellandeError>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisKind {
    HFlip,
    VFlip,
    Rotation,
    HShift,
    VShift,
    Contrast,
    Add,
    Mul,
}

/// Order in which axes are applied in the forward pass. The backward pass
/// walks the geometric part of it in reverse.
pub const AXIS_ORDER: [AxisKind; 8] = [
    AxisKind::HFlip,
    AxisKind::VFlip,
    AxisKind::Rotation,
    AxisKind::HShift,
    AxisKind::VShift,
    AxisKind::Contrast,
    AxisKind::Add,
    AxisKind::Mul,
];

impl AxisKind {
    pub fn name(&self) -> &'static str {
        match self {
            AxisKind::HFlip => "h_flip",
            AxisKind::VFlip => "v_flip",
            AxisKind::Rotation => "rotation",
            AxisKind::HShift => "h_shift",
            AxisKind::VShift => "v_shift",
            AxisKind::Contrast => "contrast",
            AxisKind::Add => "add",
            AxisKind::Mul => "mul",
        }
    }

    /// The no-op value, always the first entry of an axis.
    pub fn identity(&self) -> Param {
        match self {
            AxisKind::HFlip | AxisKind::VFlip => Param::Flip(false),
            AxisKind::Rotation => Param::Angle(0),
            AxisKind::HShift | AxisKind::VShift => Param::Pixels(0),
            AxisKind::Contrast | AxisKind::Mul => Param::Scalar(1.0),
            AxisKind::Add => Param::Scalar(0.0),
        }
    }

    /// Geometric axes move pixels and can be undone on a spatial output.
    pub fn is_geometric(&self) -> bool {
        !matches!(self, AxisKind::Contrast | AxisKind::Add | AxisKind::Mul)
    }

    pub fn function(&self) -> TransformFn {
        match self {
            AxisKind::HFlip => apply_h_flip,
            AxisKind::VFlip => apply_v_flip,
            AxisKind::Rotation => apply_rotation,
            AxisKind::HShift => apply_h_shift,
            AxisKind::VShift => apply_v_shift,
            AxisKind::Contrast => apply_contrast,
            AxisKind::Add => apply_add,
            AxisKind::Mul => apply_mul,
        }
    }

    /// Checks that `param` has the variant this axis expects and a legal value.
    pub fn check(&self, param: Param) -> Result<(), BellandeError> {
        match (*self, param) {
            (AxisKind::HFlip | AxisKind::VFlip, Param::Flip(_)) => Ok(()),
            (AxisKind::Rotation, Param::Angle(angle)) => {
                if angle % 90 == 0 {
                    Ok(())
                } else {
                    Err(BellandeError::InvalidConfiguration(format!(
                        "rotation angle {} is not divisible by 90",
                        angle
                    )))
                }
            }
            (AxisKind::HShift | AxisKind::VShift, Param::Pixels(distance)) => {
                if distance == i32::MIN {
                    Err(BellandeError::InvalidConfiguration(format!(
                        "{} distance {} cannot be inverted",
                        self.name(),
                        distance
                    )))
                } else {
                    Ok(())
                }
            }
            (AxisKind::Contrast | AxisKind::Add | AxisKind::Mul, Param::Scalar(value)) => {
                if value.is_finite() {
                    Ok(())
                } else {
                    Err(BellandeError::InvalidConfiguration(format!(
                        "{} value {} is not finite",
                        self.name(),
                        value
                    )))
                }
            }
            (kind, param) => Err(BellandeError::InvalidConfiguration(format!(
                "axis {} does not accept value {:?}",
                kind.name(),
                param
            ))),
        }
    }
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AxisKind {
    type Err = BellandeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AXIS_ORDER
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| BellandeError::InvalidConfiguration(format!("unknown axis '{}'", s)))
    }
}

fn mismatch(axis: AxisKind, param: Param) -> BellandeError {
    BellandeError::InvalidParameter(format!("axis {} cannot apply value {:?}", axis, param))
}

fn apply_h_flip(x: &Tensor, param: Param) -> Result<Tensor, BellandeError> {
    match param {
        Param::Flip(apply) => F::h_flip(x, apply),
        other => Err(mismatch(AxisKind::HFlip, other)),
    }
}

fn apply_v_flip(x: &Tensor, param: Param) -> Result<Tensor, BellandeError> {
    match param {
        Param::Flip(apply) => F::v_flip(x, apply),
        other => Err(mismatch(AxisKind::VFlip, other)),
    }
}

fn apply_rotation(x: &Tensor, param: Param) -> Result<Tensor, BellandeError> {
    match param {
        Param::Angle(angle) => F::rotate(x, angle),
        other => Err(mismatch(AxisKind::Rotation, other)),
    }
}

fn apply_h_shift(x: &Tensor, param: Param) -> Result<Tensor, BellandeError> {
    match param {
        Param::Pixels(distance) => F::h_shift(x, distance),
        other => Err(mismatch(AxisKind::HShift, other)),
    }
}

fn apply_v_shift(x: &Tensor, param: Param) -> Result<Tensor, BellandeError> {
    match param {
        Param::Pixels(distance) => F::v_shift(x, distance),
        other => Err(mismatch(AxisKind::VShift, other)),
    }
}

fn apply_contrast(x: &Tensor, param: Param) -> Result<Tensor, BellandeError> {
    match param {
        Param::Scalar(factor) => F::contrast(x, factor),
        other => Err(mismatch(AxisKind::Contrast, other)),
    }
}

fn apply_add(x: &Tensor, param: Param) -> Result<Tensor, BellandeError> {
    match param {
        Param::Scalar(value) => F::add(x, value),
        other => Err(mismatch(AxisKind::Add, other)),
    }
}

fn apply_mul(x: &Tensor, param: Param) -> Result<Tensor, BellandeError> {
    match param {
        Param::Scalar(value) => F::mul(x, value),
        other => Err(mismatch(AxisKind::Mul, other)),
    }
}

/// One augmentation dimension: which transform, the function applying it and
/// the values replicas take along it. `values[0]` is always the identity.
#[derive(Clone)]
pub struct Axis {
    pub kind: AxisKind,
    pub function: TransformFn,
    pub values: Vec<Param>,
}

impl fmt::Debug for Axis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Axis")
            .field("kind", &self.kind)
            .field("values", &self.values)
            .finish()
    }
}

impl Axis {
    /// Axis contributing only the identity value.
    pub fn disabled(kind: AxisKind) -> Self {
        Axis {
            kind,
            function: kind.function(),
            values: vec![kind.identity()],
        }
    }

    /// Identity followed by `values`, in the given order and without
    /// deduplication. No values means a disabled axis.
    pub fn enabled(kind: AxisKind, values: &[Param]) -> Result<Self, BellandeError> {
        let mut axis = Axis::disabled(kind);
        for &value in values {
            kind.check(value)?;
            axis.values.push(value);
        }
        Ok(axis)
    }

    /// Flip axes are switched on or off rather than given values.
    pub fn flip(kind: AxisKind, enabled: bool) -> Result<Self, BellandeError> {
        if enabled {
            Axis::enabled(kind, &[Param::Flip(true)])
        } else {
            Ok(Axis::disabled(kind))
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.values.len() > 1
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
