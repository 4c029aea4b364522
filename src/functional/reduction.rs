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

//! Reductions over the leading (replica) axis. Each returns a tensor whose
//! leading axis has size 1 and whose remaining axes are unchanged.

use crate::core::{error::BellandeError, tensor::Tensor};

fn reduce_batch<F, G>(x: &Tensor, init: f32, fold: F, finish: G) -> Result<Tensor, BellandeError>
where
    F: Fn(f32, f32) -> f32,
    G: Fn(f32, usize) -> f32,
{
    let shape = x.shape();
    if shape.is_empty() || shape[0] == 0 {
        return Err(BellandeError::InvalidShape(format!(
            "cannot reduce over an empty batch axis, shape {:?}",
            shape
        )));
    }

    let n = shape[0];
    let inner: usize = shape[1..].iter().product();
    let mut acc = vec![init; inner];
    for replica in x.data().chunks_exact(inner.max(1)).take(n) {
        for (a, &v) in acc.iter_mut().zip(replica) {
            *a = fold(*a, v);
        }
    }

    let mut out_shape = shape.to_vec();
    out_shape[0] = 1;
    Ok(Tensor::new(
        acc.into_iter().map(|a| finish(a, n)).collect(),
        out_shape,
        false,
    ))
}

pub fn mean(x: &Tensor) -> Result<Tensor, BellandeError> {
    reduce_batch(x, 0.0, |a, v| a + v, |a, n| a / n as f32)
}

/// `(x₁ · x₂ · … · x_N)^(1/N)` per element.
///
/// Only meaningful for strictly positive inputs such as probabilities. Zero
/// or negative values are passed through the power unchanged (yielding zero
/// or NaN); keeping inputs positive is the caller's responsibility.
pub fn geometric_mean(x: &Tensor) -> Result<Tensor, BellandeError> {
    reduce_batch(x, 1.0, |a, v| a * v, |a, n| a.powf(1.0 / n as f32))
}

pub fn max(x: &Tensor) -> Result<Tensor, BellandeError> {
    reduce_batch(x, f32::NEG_INFINITY, f32::max, |a, _| a)
}

pub fn sum(x: &Tensor) -> Result<Tensor, BellandeError> {
    reduce_batch(x, 0.0, |a, v| a + v, |a, _| a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> Tensor {
        Tensor::from_vec(vec![1.0, 8.0, 4.0, 2.0], &[2, 2]).unwrap()
    }

    #[test]
    fn test_mean() {
        let out = mean(&batch()).unwrap();
        assert_eq!(out.shape(), &[1, 2]);
        assert_eq!(out.data(), &[2.5, 5.0]);
    }

    #[test]
    fn test_geometric_mean() {
        let out = geometric_mean(&batch()).unwrap();
        assert!(out.all_close(&Tensor::from_vec(vec![2.0, 4.0], &[1, 2]).unwrap(), 1e-5));
        let ones = geometric_mean(&Tensor::ones(&[5, 3, 3, 1])).unwrap();
        assert_eq!(ones, Tensor::ones(&[1, 3, 3, 1]));
    }

    #[test]
    fn test_max() {
        assert_eq!(max(&batch()).unwrap().data(), &[4.0, 8.0]);
    }

    #[test]
    fn test_max_returns_the_dominant_replica() {
        let dominant = vec![5.0, 6.0, 7.0, -0.5];
        let replicas = Tensor::from_vec(
            [
                vec![1.0, 2.0, 3.0, -2.0],
                dominant.clone(),
                vec![0.0, -1.0, 2.0, -0.5],
            ]
            .concat(),
            &[3, 2, 2, 1],
        )
        .unwrap();
        let out = max(&replicas).unwrap();
        assert_eq!(out, Tensor::from_vec(dominant, &[1, 2, 2, 1]).unwrap());
    }

    #[test]
    fn test_identical_replicas_collapse_to_the_replica() {
        let replica = Tensor::arange(&[1, 3, 3, 2]);
        let repeated = Tensor::stack(&vec![replica.batch(0).unwrap(); 4]).unwrap();
        assert_eq!(mean(&repeated).unwrap(), replica);
        assert_eq!(max(&repeated).unwrap(), replica);
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        assert!(mean(&Tensor::zeros(&[0, 3])).is_err());
    }
}
