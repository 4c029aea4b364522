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

//! Stateless per-image transforms. Every function takes one image laid out as
//! `(H, W, ...)` (no batch axis) and returns a new tensor; trailing axes after
//! the width are moved as a block, so `(H, W)` and `(H, W, C)` both work.

use crate::core::{error::BellandeError, tensor::Tensor};

/// Height, width and number of values per pixel of an image tensor.
fn image_dims(x: &Tensor) -> Result<(usize, usize, usize), BellandeError> {
    let shape = x.shape();
    if shape.len() < 2 {
        return Err(BellandeError::InvalidShape(format!(
            "expected an image of shape (H, W, ...), got {:?}",
            shape
        )));
    }
    Ok((shape[0], shape[1], shape[2..].iter().product()))
}

/// Builds an image of the given height and width where each output pixel
/// `(h, w)` is copied from the input pixel returned by `source`.
fn remap<F>(
    x: &Tensor,
    out_height: usize,
    out_width: usize,
    source: F,
) -> Result<Tensor, BellandeError>
where
    F: Fn(usize, usize) -> (usize, usize),
{
    let (_, in_width, pixel) = image_dims(x)?;
    let mut data = Vec::with_capacity(x.numel());
    for h in 0..out_height {
        for w in 0..out_width {
            let (sh, sw) = source(h, w);
            let src = (sh * in_width + sw) * pixel;
            data.extend_from_slice(&x.data()[src..src + pixel]);
        }
    }

    let mut shape = vec![out_height, out_width];
    shape.extend_from_slice(&x.shape()[2..]);
    Ok(Tensor::new(data, shape, false))
}

/// Mirrors the image along the width axis when `apply` is set.
pub fn h_flip(x: &Tensor, apply: bool) -> Result<Tensor, BellandeError> {
    let (height, width, _) = image_dims(x)?;
    if !apply {
        return Ok(x.clone());
    }
    remap(x, height, width, |h, w| (h, width - 1 - w))
}

/// Mirrors the image along the height axis when `apply` is set.
pub fn v_flip(x: &Tensor, apply: bool) -> Result<Tensor, BellandeError> {
    let (height, width, _) = image_dims(x)?;
    if !apply {
        return Ok(x.clone());
    }
    remap(x, height, width, |h, w| (height - 1 - h, w))
}

/// Rotates counter-clockwise by `angle` degrees. The angle must be a multiple
/// of 90; negative angles turn the other way, so `rotate(x, -90)` equals
/// `rotate(x, 270)`. Odd quarter-turns swap height and width.
pub fn rotate(x: &Tensor, angle: i32) -> Result<Tensor, BellandeError> {
    if angle % 90 != 0 {
        return Err(BellandeError::InvalidParameter(format!(
            "rotation angle must be a multiple of 90 degrees, got {}",
            angle
        )));
    }
    let (height, width, _) = image_dims(x)?;

    match angle.rem_euclid(360) / 90 {
        0 => Ok(x.clone()),
        1 => remap(x, width, height, |h, w| (w, width - 1 - h)),
        2 => remap(x, height, width, |h, w| (height - 1 - h, width - 1 - w)),
        _ => remap(x, width, height, |h, w| (height - 1 - w, h)),
    }
}

/// Cyclic translation along the width axis; positive distances move content
/// towards larger column indices and pixels leaving one edge re-enter at the other.
pub fn h_shift(x: &Tensor, distance: i32) -> Result<Tensor, BellandeError> {
    let (height, width, _) = image_dims(x)?;
    if width == 0 {
        return Ok(x.clone());
    }
    let offset = wrap(distance, width);
    remap(x, height, width, |h, w| (h, (w + width - offset) % width))
}

/// Cyclic translation along the height axis; positive distances move content down.
pub fn v_shift(x: &Tensor, distance: i32) -> Result<Tensor, BellandeError> {
    let (height, width, _) = image_dims(x)?;
    if height == 0 {
        return Ok(x.clone());
    }
    let offset = wrap(distance, height);
    remap(x, height, width, |h, w| ((h + height - offset) % height, w))
}

fn wrap(distance: i32, size: usize) -> usize {
    (distance as i64).rem_euclid(size as i64) as usize
}

/// Scales every value's distance from the image mean by `factor`.
/// Values are not clamped.
pub fn contrast(x: &Tensor, factor: f32) -> Result<Tensor, BellandeError> {
    image_dims(x)?;
    // (v - mean) + mean is not exact in floating point
    if factor == 1.0 {
        return Ok(x.clone());
    }
    let mean = x.mean_all();
    Ok(x.map(|v| (v - mean) * factor + mean))
}

pub fn add(x: &Tensor, value: f32) -> Result<Tensor, BellandeError> {
    image_dims(x)?;
    Ok(x.map(|v| v + value))
}

pub fn mul(x: &Tensor, value: f32) -> Result<Tensor, BellandeError> {
    image_dims(x)?;
    Ok(x.map(|v| v * value))
}
