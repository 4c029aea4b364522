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

use crate::core::error::BellandeError;

/// Dense row-major `f32` tensor. Images are stored channel-last, `(H, W, C)`,
/// and batches of images as `(N, H, W, C)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
    /// Set on parameters an external optimizer updates, such as merge weights.
    pub requires_grad: bool,
}

impl Tensor {
    pub fn new(data: Vec<f32>, shape: Vec<usize>, requires_grad: bool) -> Self {
        let size: usize = shape.iter().product();
        assert_eq!(data.len(), size, "Data size does not match shape");

        Tensor {
            data,
            shape,
            requires_grad,
        }
    }

    /// Checked constructor for data coming from outside the crate.
    pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> Result<Self, BellandeError> {
        let size: usize = shape.iter().product();
        if data.len() != size {
            return Err(BellandeError::InvalidShape(format!(
                "{} values cannot fill shape {:?}",
                data.len(),
                shape
            )));
        }
        Ok(Tensor::new(data, shape.to_vec(), false))
    }

    // Data access methods
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Tensor::full(shape, 0.0)
    }

    pub fn ones(shape: &[usize]) -> Self {
        Tensor::full(shape, 1.0)
    }

    pub fn full(shape: &[usize], value: f32) -> Self {
        let size = shape.iter().product();
        Tensor::new(vec![value; size], shape.to_vec(), false)
    }

    /// `0, 1, …, n - 1` laid out in `shape`, which must hold exactly `n` values.
    pub fn arange(shape: &[usize]) -> Self {
        let size: usize = shape.iter().product();
        Tensor::new((0..size).map(|v| v as f32).collect(), shape.to_vec(), false)
    }

    pub fn randn(shape: &[usize]) -> Result<Self, BellandeError> {
        let size = shape.iter().product();
        Ok(Tensor::new(
            crate::core::random::normal(0.0, 1.0, size)?,
            shape.to_vec(),
            false,
        ))
    }

    /// Marks the tensor as an optimizable parameter.
    pub fn trainable(mut self) -> Self {
        self.requires_grad = true;
        self
    }

    pub fn reshape(&self, new_shape: &[usize]) -> Result<Tensor, BellandeError> {
        let new_size: usize = new_shape.iter().product();
        if new_size != self.data.len() {
            return Err(BellandeError::InvalidShape(format!(
                "Cannot reshape tensor of size {} to shape {:?}",
                self.data.len(),
                new_shape
            )));
        }

        Ok(Tensor {
            data: self.data.clone(),
            shape: new_shape.to_vec(),
            requires_grad: self.requires_grad,
        })
    }

    /// Stacks equally shaped tensors along a new leading axis, keeping their order.
    pub fn stack(tensors: &[Tensor]) -> Result<Tensor, BellandeError> {
        if tensors.is_empty() {
            return Err(BellandeError::InvalidInputs(
                "cannot stack an empty list of tensors".into(),
            ));
        }

        let base_shape = tensors[0].shape();

        // Verify all tensors have the same shape
        for (i, tensor) in tensors.iter().enumerate().skip(1) {
            if tensor.shape() != base_shape {
                return Err(BellandeError::ShapeMismatch(format!(
                    "tensor 0 has shape {:?} but tensor {} has shape {:?}",
                    base_shape,
                    i,
                    tensor.shape()
                )));
            }
        }

        let mut new_shape = vec![tensors.len()];
        new_shape.extend(base_shape);

        let mut result_data = Vec::with_capacity(new_shape.iter().product());
        for tensor in tensors {
            result_data.extend_from_slice(&tensor.data);
        }

        Ok(Tensor::new(result_data, new_shape, false))
    }

    /// Slice `index` of the leading axis, with that axis removed.
    pub fn batch(&self, index: usize) -> Result<Tensor, BellandeError> {
        if self.shape.is_empty() {
            return Err(BellandeError::InvalidShape(
                "scalar tensor has no batch axis".into(),
            ));
        }
        if index >= self.shape[0] {
            return Err(BellandeError::IndexOutOfBounds);
        }

        let batch_stride: usize = self.shape[1..].iter().product();
        let start = index * batch_stride;
        Ok(Tensor::new(
            self.data[start..start + batch_stride].to_vec(),
            self.shape[1..].to_vec(),
            false,
        ))
    }

    /// Splits the leading axis into its slices, in index order.
    pub fn batches(&self) -> Result<Vec<Tensor>, BellandeError> {
        if self.shape.is_empty() {
            return Err(BellandeError::InvalidShape(
                "scalar tensor has no batch axis".into(),
            ));
        }
        (0..self.shape[0]).map(|i| self.batch(i)).collect()
    }

    pub fn map<F>(&self, f: F) -> Tensor
    where
        F: Fn(f32) -> f32,
    {
        Tensor::new(
            self.data.iter().map(|&x| f(x)).collect(),
            self.shape.clone(),
            false,
        )
    }

    pub fn scale(&self, factor: f32) -> Tensor {
        self.map(|x| x * factor)
    }

    pub fn mean_all(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }

    pub fn mul(&self, other: &Tensor) -> Result<Tensor, BellandeError> {
        if self.shape != other.shape {
            return Err(BellandeError::ShapeMismatch(format!(
                "Shapes must match for element-wise multiplication: {:?} vs {:?}",
                self.shape, other.shape
            )));
        }

        let output: Vec<f32> = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| a * b)
            .collect();

        Ok(Tensor::new(output, self.shape.clone(), false))
    }

    /// Element-wise comparison with absolute tolerance `tol`; false on shape mismatch.
    pub fn all_close(&self, other: &Tensor, tol: f32) -> bool {
        self.shape == other.shape
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(&a, &b)| (a - b).abs() <= tol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_and_batch_keep_order() {
        let a = Tensor::full(&[2, 2], 1.0);
        let b = Tensor::full(&[2, 2], 2.0);
        let stacked = Tensor::stack(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(stacked.shape(), &[2, 2, 2]);
        assert_eq!(stacked.batch(0).unwrap(), a);
        assert_eq!(stacked.batch(1).unwrap(), b);
        assert!(matches!(
            stacked.batch(2),
            Err(BellandeError::IndexOutOfBounds)
        ));
    }

    #[test]
    fn test_stack_rejects_mixed_shapes() {
        let result = Tensor::stack(&[Tensor::zeros(&[2, 3]), Tensor::zeros(&[3, 2])]);
        assert!(matches!(result, Err(BellandeError::ShapeMismatch(_))));
    }

    #[test]
    fn test_seeded_randn_is_reproducible() {
        crate::core::random::set_seed(7);
        let a = Tensor::randn(&[4, 4]).unwrap();
        crate::core::random::set_seed(7);
        let b = Tensor::randn(&[4, 4]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.shape(), &[4, 4]);
    }

    #[test]
    fn test_mul_checks_shapes() {
        let a = Tensor::full(&[2, 2], 3.0);
        assert_eq!(a.mul(&Tensor::full(&[2, 2], 2.0)).unwrap().data(), &[6.0; 4]);
        assert!(a.mul(&Tensor::zeros(&[4])).unwrap_err().is_shape());
    }

    #[test]
    fn test_from_vec_checks_size() {
        assert!(Tensor::from_vec(vec![1.0, 2.0], &[3]).is_err());
        assert_eq!(Tensor::from_vec(vec![1.0, 2.0], &[2, 1]).unwrap().shape(), &[2, 1]);
    }
}
