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

//! Test-time augmentation for trained vision models.
//!
//! A wrapped model clones its single input into one replica per combination
//! of augmentation values, runs the model once on the whole replica batch,
//! undoes the geometric augmentations on spatial outputs and merges the
//! replicas back into one prediction.

pub mod augmentation;
pub mod core;
pub mod functional;
pub mod layer;
pub mod models;
pub mod utilities;
pub mod wrappers;

pub use crate::core::{error::BellandeError, tensor::Tensor};
pub use crate::layer::merge::{MergeStrategy, MergeWeights, SaveFormat};
pub use crate::models::models::Model;
pub use crate::utilities::config::AugmentationConfig;
pub use crate::wrappers::wrappers::{tta_classification, tta_segmentation, Task, TtaModel};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn get_version() -> &'static str {
    VERSION
}
