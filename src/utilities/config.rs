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
use crate::layer::merge::MergeStrategy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Options accepted when wrapping a model. Every axis is off by default and
/// replicas are merged with `mean`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AugmentationConfig {
    pub h_flip: bool,
    pub v_flip: bool,
    pub h_shift: Option<Vec<i32>>,
    pub v_shift: Option<Vec<i32>>,
    /// Degrees, multiples of 90 in `[0, 360)`.
    pub rotation: Option<Vec<i32>>,

    // Photometric axes, applied before inference only
    pub contrast: Option<Vec<f32>>,
    pub add: Option<Vec<f32>>,
    pub mul: Option<Vec<f32>>,

    pub merge: String,

    /// Model input shape without the batch axis, e.g. `[H, W, C]`. Needed
    /// when the model cannot report it.
    pub input_shape: Option<Vec<usize>>,
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        AugmentationConfig {
            h_flip: false,
            v_flip: false,
            h_shift: None,
            v_shift: None,
            rotation: None,
            contrast: None,
            add: None,
            mul: None,
            merge: "mean".to_string(),
            input_shape: None,
        }
    }
}

impl AugmentationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_h_flip(mut self, enabled: bool) -> Self {
        self.h_flip = enabled;
        self
    }

    pub fn with_v_flip(mut self, enabled: bool) -> Self {
        self.v_flip = enabled;
        self
    }

    pub fn with_h_shift(mut self, distances: Vec<i32>) -> Self {
        self.h_shift = Some(distances);
        self
    }

    pub fn with_v_shift(mut self, distances: Vec<i32>) -> Self {
        self.v_shift = Some(distances);
        self
    }

    pub fn with_rotation(mut self, angles: Vec<i32>) -> Self {
        self.rotation = Some(angles);
        self
    }

    pub fn with_contrast(mut self, factors: Vec<f32>) -> Self {
        self.contrast = Some(factors);
        self
    }

    pub fn with_add(mut self, values: Vec<f32>) -> Self {
        self.add = Some(values);
        self
    }

    pub fn with_mul(mut self, values: Vec<f32>) -> Self {
        self.mul = Some(values);
        self
    }

    pub fn with_merge(mut self, merge: &str) -> Self {
        self.merge = merge.to_string();
        self
    }

    pub fn with_input_shape(mut self, shape: Vec<usize>) -> Self {
        self.input_shape = Some(shape);
        self
    }

    pub fn merge_strategy(&self) -> Result<MergeStrategy, BellandeError> {
        self.merge.parse()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BellandeError> {
        let content = fs::read_to_string(path)?;
        let config: AugmentationConfig = serde_yaml::from_str(&content).map_err(|e| {
            BellandeError::InvalidConfiguration(format!("Failed to parse configuration: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), BellandeError> {
        let content = serde_yaml::to_string(self).map_err(|e| {
            BellandeError::SerializationError(format!("Failed to serialize configuration: {}", e))
        })?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), BellandeError> {
        // Validate rotation angles
        if let Some(angles) = &self.rotation {
            for &angle in angles {
                if angle % 90 != 0 {
                    return Err(BellandeError::InvalidConfiguration(format!(
                        "rotation angle {} is not divisible by 90",
                        angle
                    )));
                }
                if !(0..360).contains(&angle) {
                    return Err(BellandeError::InvalidConfiguration(format!(
                        "rotation angle {} is outside [0, 360)",
                        angle
                    )));
                }
            }
        }

        // Validate photometric values
        for (name, values) in [
            ("contrast", &self.contrast),
            ("add", &self.add),
            ("mul", &self.mul),
        ] {
            if let Some(values) = values {
                if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
                    return Err(BellandeError::InvalidConfiguration(format!(
                        "{} value {} is not finite",
                        name, bad
                    )));
                }
            }
        }

        self.merge_strategy()?;

        if let Some(shape) = &self.input_shape {
            if shape.len() < 2 {
                return Err(BellandeError::InvalidConfiguration(format!(
                    "input shape {:?} needs at least height and width",
                    shape
                )));
            }
            if shape.contains(&0) {
                return Err(BellandeError::InvalidConfiguration(format!(
                    "input shape {:?} has an empty dimension",
                    shape
                )));
            }
        }

        Ok(())
    }
}
