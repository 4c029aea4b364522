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
use crate::functional::reduction as R;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use tracing::{trace, warn};

/// How the replica axis is collapsed into one prediction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeStrategy {
    Mean,
    /// Only defined for positive values; see `reduction::geometric_mean`.
    GeometricMean,
    Max,
    /// Mean of `w ⊙ x` with one weight per replica output value, `(N, ...)`.
    ClassWeighted,
    /// Mean of `w ⊙ x` with one weight per pixel, `(1, H, W)`, shared by all
    /// replicas and channels.
    SpatialWeighted,
    /// `Σᵢ wᵢ xᵢ` with one weight per replica, `(1, N)`.
    AugmentationWeighted,
}

impl MergeStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            MergeStrategy::Mean => "mean",
            MergeStrategy::GeometricMean => "gmean",
            MergeStrategy::Max => "max",
            MergeStrategy::ClassWeighted => "class_weighted",
            MergeStrategy::SpatialWeighted => "spatial_weighted",
            MergeStrategy::AugmentationWeighted => "augmentation_weighted",
        }
    }

    pub fn is_trainable(&self) -> bool {
        matches!(
            self,
            MergeStrategy::ClassWeighted
                | MergeStrategy::SpatialWeighted
                | MergeStrategy::AugmentationWeighted
        )
    }

    /// Weight shape for a replica output batch of `replica_shape`, `None` for
    /// parameter-free strategies.
    pub fn weight_shape(&self, replica_shape: &[usize]) -> Result<Option<Vec<usize>>, BellandeError> {
        if replica_shape.is_empty() || replica_shape[0] == 0 {
            return Err(BellandeError::InvalidShape(format!(
                "replica outputs need a non-empty batch axis, got {:?}",
                replica_shape
            )));
        }

        Ok(match self {
            MergeStrategy::Mean | MergeStrategy::GeometricMean | MergeStrategy::Max => None,
            MergeStrategy::ClassWeighted => Some(replica_shape.to_vec()),
            MergeStrategy::SpatialWeighted => {
                if replica_shape.len() >= 3 {
                    Some(vec![1, replica_shape[1], replica_shape[2]])
                } else {
                    Some(vec![1])
                }
            }
            MergeStrategy::AugmentationWeighted => Some(vec![1, replica_shape[0]]),
        })
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for MergeStrategy {
    type Err = BellandeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(MergeStrategy::Mean),
            "gmean" => Ok(MergeStrategy::GeometricMean),
            "max" => Ok(MergeStrategy::Max),
            "class_weighted" | "ClassTTA" => Ok(MergeStrategy::ClassWeighted),
            "spatial_weighted" => Ok(MergeStrategy::SpatialWeighted),
            "augmentation_weighted" | "AugTTA" => Ok(MergeStrategy::AugmentationWeighted),
            other => Err(BellandeError::InvalidConfiguration(format!(
                "Wrong merge type '{}'",
                other
            ))),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SaveFormat {
    Json,
    Binary,
}

#[derive(Serialize, Deserialize)]
struct WeightsState {
    strategy: MergeStrategy,
    shape: Vec<usize>,
    data: Vec<f32>,
}

/// Trainable merge parameters. Owned by whoever optimizes them and lent to
/// the merge step for each call.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeWeights {
    strategy: MergeStrategy,
    weights: Tensor,
}

impl MergeWeights {
    /// All-ones weights for `strategy` and replica outputs of `replica_shape`.
    pub fn ones(strategy: MergeStrategy, replica_shape: &[usize]) -> Result<Self, BellandeError> {
        let shape = strategy.weight_shape(replica_shape)?.ok_or_else(|| {
            BellandeError::InvalidConfiguration(format!(
                "merge strategy '{}' has no weights",
                strategy
            ))
        })?;
        Ok(MergeWeights {
            strategy,
            weights: Tensor::ones(&shape).trainable(),
        })
    }

    pub fn from_tensor(strategy: MergeStrategy, weights: Tensor) -> Result<Self, BellandeError> {
        if !strategy.is_trainable() {
            return Err(BellandeError::InvalidConfiguration(format!(
                "merge strategy '{}' has no weights",
                strategy
            )));
        }
        Ok(MergeWeights {
            strategy,
            weights: weights.trainable(),
        })
    }

    pub fn strategy(&self) -> MergeStrategy {
        self.strategy
    }

    pub fn tensor(&self) -> &Tensor {
        &self.weights
    }

    /// Mutable access for an external optimizer.
    pub fn tensor_mut(&mut self) -> &mut Tensor {
        &mut self.weights
    }

    pub fn shape(&self) -> &[usize] {
        self.weights.shape()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P, format: SaveFormat) -> Result<(), BellandeError> {
        let state = WeightsState {
            strategy: self.strategy,
            shape: self.weights.shape.clone(),
            data: self.weights.data.clone(),
        };

        let file = File::create(path.as_ref()).map_err(|e| {
            BellandeError::IOError(format!("Failed to create weights file: {}", e))
        })?;
        match format {
            SaveFormat::Json => serde_json::to_writer(file, &state).map_err(|e| {
                BellandeError::SerializationError(format!("Failed to serialize weights: {}", e))
            }),
            SaveFormat::Binary => bincode::serialize_into(file, &state).map_err(|e| {
                BellandeError::SerializationError(format!("Failed to serialize weights: {}", e))
            }),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P, format: SaveFormat) -> Result<Self, BellandeError> {
        let file = File::open(path.as_ref())
            .map_err(|e| BellandeError::IOError(format!("Failed to open weights file: {}", e)))?;
        let state: WeightsState = match format {
            SaveFormat::Json => serde_json::from_reader(file).map_err(|e| {
                BellandeError::SerializationError(format!("Failed to deserialize weights: {}", e))
            })?,
            SaveFormat::Binary => bincode::deserialize_from(file).map_err(|e| {
                BellandeError::SerializationError(format!("Failed to deserialize weights: {}", e))
            })?,
        };

        MergeWeights::from_tensor(state.strategy, Tensor::from_vec(state.data, &state.shape)?)
    }
}

/// Collapses a replica batch `(N, ...)` into a single prediction `(1, ...)`.
pub struct Merge {
    strategy: MergeStrategy,
}

impl Merge {
    pub fn new(strategy: MergeStrategy) -> Self {
        Merge { strategy }
    }

    pub fn strategy(&self) -> MergeStrategy {
        self.strategy
    }

    pub fn compute_output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, BellandeError> {
        if input_shape.is_empty() || input_shape[0] == 0 {
            return Err(BellandeError::InvalidShape(format!(
                "Merge expects a non-empty replica batch, got {:?}",
                input_shape
            )));
        }
        let mut shape = input_shape.to_vec();
        shape[0] = 1;
        Ok(shape)
    }

    /// Merges `x`. Trainable strategies read `weights`, which must have been
    /// built for the same strategy and replica shape.
    pub fn merge(&self, x: &Tensor, weights: Option<&MergeWeights>) -> Result<Tensor, BellandeError> {
        self.compute_output_shape(x.shape())?;
        trace!(strategy = %self.strategy, shape = ?x.shape(), "merging replicas");

        match self.strategy {
            MergeStrategy::Mean => R::mean(x),
            MergeStrategy::Max => R::max(x),
            MergeStrategy::GeometricMean => {
                if x.data().iter().any(|&v| v <= 0.0) {
                    warn!("geometric-mean merge over non-positive values; result may be zero or NaN");
                }
                R::geometric_mean(x)
            }
            MergeStrategy::ClassWeighted => {
                let w = self.weights_for(x, weights)?;
                R::mean(&x.mul(w)?)
            }
            MergeStrategy::SpatialWeighted => {
                let w = self.weights_for(x, weights)?;
                R::mean(&broadcast_spatial(x, w)?)
            }
            MergeStrategy::AugmentationWeighted => {
                let w = self.weights_for(x, weights)?;
                weighted_sum(x, w)
            }
        }
    }

    fn weights_for<'a>(
        &self,
        x: &Tensor,
        weights: Option<&'a MergeWeights>,
    ) -> Result<&'a Tensor, BellandeError> {
        let weights = weights.ok_or_else(|| {
            BellandeError::InvalidConfiguration(format!(
                "merge strategy '{}' needs weights",
                self.strategy
            ))
        })?;
        if weights.strategy != self.strategy {
            return Err(BellandeError::InvalidConfiguration(format!(
                "weights built for '{}' cannot drive '{}' merge",
                weights.strategy, self.strategy
            )));
        }

        let expected = self.strategy.weight_shape(x.shape())?;
        if expected.as_deref() != Some(weights.shape()) {
            return Err(BellandeError::ShapeMismatch(format!(
                "merge weights have shape {:?}, replicas of shape {:?} need {:?}",
                weights.shape(),
                x.shape(),
                expected
            )));
        }
        Ok(&weights.weights)
    }
}

/// `x ⊙ w` with `w` of shape `(1, H, W)` repeated over replicas and
/// trailing axes, or a single weight of shape `(1,)`.
fn broadcast_spatial(x: &Tensor, w: &Tensor) -> Result<Tensor, BellandeError> {
    if w.numel() == 1 {
        return Ok(x.scale(w.data()[0]));
    }

    let shape = x.shape();
    let pixels = shape[1] * shape[2];
    let inner: usize = shape[3..].iter().product();
    let data = x
        .data()
        .iter()
        .enumerate()
        .map(|(i, &v)| v * w.data()[(i / inner) % pixels])
        .collect();
    Tensor::from_vec(data, shape)
}

/// `Σᵢ wᵢ xᵢ` over the replica axis, for `w` of shape `(1, N)`.
fn weighted_sum(x: &Tensor, w: &Tensor) -> Result<Tensor, BellandeError> {
    let replicas = x.batches()?;
    let scaled: Vec<Tensor> = replicas
        .iter()
        .zip(w.data())
        .map(|(replica, &weight)| replica.scale(weight))
        .collect();
    R::sum(&Tensor::stack(&scaled)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replicas() -> Tensor {
        // two replicas of a 1x2 image with two channels
        Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], &[2, 1, 2, 2]).unwrap()
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!("gmean".parse::<MergeStrategy>().unwrap(), MergeStrategy::GeometricMean);
        assert_eq!("ClassTTA".parse::<MergeStrategy>().unwrap(), MergeStrategy::ClassWeighted);
        assert_eq!("AugTTA".parse::<MergeStrategy>().unwrap(), MergeStrategy::AugmentationWeighted);
        assert!("Mean".parse::<MergeStrategy>().unwrap_err().is_configuration());
    }

    #[test]
    fn test_parameter_free_merges() {
        let mean = Merge::new(MergeStrategy::Mean).merge(&replicas(), None).unwrap();
        assert_eq!(mean.shape(), &[1, 1, 2, 2]);
        assert_eq!(mean.data(), &[3.0, 4.0, 5.0, 6.0]);

        let max = Merge::new(MergeStrategy::Max).merge(&replicas(), None).unwrap();
        assert_eq!(max.data(), &[5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_all_ones_weights_match_the_mean() {
        let x = replicas();
        let mean = Merge::new(MergeStrategy::Mean).merge(&x, None).unwrap();
        for strategy in [MergeStrategy::ClassWeighted, MergeStrategy::SpatialWeighted] {
            let weights = MergeWeights::ones(strategy, x.shape()).unwrap();
            assert!(weights.tensor().requires_grad);
            let out = Merge::new(strategy).merge(&x, Some(&weights)).unwrap();
            assert_eq!(out, mean, "{}", strategy);
        }
    }

    #[test]
    fn test_weight_shapes() {
        let shape = [4, 3, 5, 2];
        assert_eq!(
            MergeStrategy::ClassWeighted.weight_shape(&shape).unwrap(),
            Some(vec![4, 3, 5, 2])
        );
        assert_eq!(
            MergeStrategy::SpatialWeighted.weight_shape(&shape).unwrap(),
            Some(vec![1, 3, 5])
        );
        assert_eq!(
            MergeStrategy::AugmentationWeighted.weight_shape(&shape).unwrap(),
            Some(vec![1, 4])
        );
        assert_eq!(MergeStrategy::SpatialWeighted.weight_shape(&[4, 10]).unwrap(), Some(vec![1]));
        assert_eq!(MergeStrategy::Max.weight_shape(&shape).unwrap(), None);
    }

    #[test]
    fn test_spatial_weights_scale_pixels() {
        let x = replicas();
        let w = Tensor::from_vec(vec![2.0, 0.0], &[1, 1, 2]).unwrap();
        let weights = MergeWeights::from_tensor(MergeStrategy::SpatialWeighted, w).unwrap();
        let out = Merge::new(MergeStrategy::SpatialWeighted)
            .merge(&x, Some(&weights))
            .unwrap();
        assert_eq!(out.data(), &[6.0, 8.0, 0.0, 0.0]);
    }

    #[test]
    fn test_augmentation_weights_sum_replicas() {
        let x = replicas();
        let w = Tensor::from_vec(vec![0.25, 0.75], &[1, 2]).unwrap();
        let weights = MergeWeights::from_tensor(MergeStrategy::AugmentationWeighted, w).unwrap();
        let out = Merge::new(MergeStrategy::AugmentationWeighted)
            .merge(&x, Some(&weights))
            .unwrap();
        assert_eq!(out.shape(), &[1, 1, 2, 2]);
        assert_eq!(out.data(), &[4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_weighted_merge_checks_its_weights() {
        let x = replicas();
        let merge = Merge::new(MergeStrategy::ClassWeighted);
        assert!(merge.merge(&x, None).unwrap_err().is_configuration());

        let wrong_strategy = MergeWeights::ones(MergeStrategy::SpatialWeighted, x.shape()).unwrap();
        assert!(merge.merge(&x, Some(&wrong_strategy)).unwrap_err().is_configuration());

        let wrong_shape = MergeWeights::ones(MergeStrategy::ClassWeighted, &[3, 1, 2, 2]).unwrap();
        assert!(merge.merge(&x, Some(&wrong_shape)).unwrap_err().is_shape());

        assert!(MergeWeights::ones(MergeStrategy::Mean, x.shape()).is_err());
    }

    #[test]
    fn test_geometric_mean_does_not_clamp() {
        let x = Tensor::from_vec(vec![-1.0, 4.0], &[2, 1]).unwrap();
        let out = Merge::new(MergeStrategy::GeometricMean).merge(&x, None).unwrap();
        assert!(out.data()[0].is_nan());
    }
}
