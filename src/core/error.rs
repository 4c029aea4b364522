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

use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum BellandeError {
    InvalidShape(String),
    ShapeMismatch(String),
    IndexOutOfBounds,
    InvalidInputs(String),
    InvalidConfiguration(String),
    InvalidParameter(String),
    SerializationError(String),
    IOError(String),
}

impl BellandeError {
    /// True for errors raised while building a wrapper, before any inference.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BellandeError::InvalidConfiguration(_) | BellandeError::InvalidParameter(_)
        )
    }

    /// True for errors caused by tensors whose shape disagrees with the pipeline.
    pub fn is_shape(&self) -> bool {
        matches!(
            self,
            BellandeError::InvalidShape(_) | BellandeError::ShapeMismatch(_)
        )
    }
}

impl Error for BellandeError {}

impl fmt::Display for BellandeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BellandeError::InvalidShape(msg) => write!(f, "Invalid tensor shape: {}", msg),
            BellandeError::ShapeMismatch(msg) => write!(f, "Shape mismatch: {}", msg),
            BellandeError::IndexOutOfBounds => write!(f, "Index out of bounds"),
            BellandeError::InvalidInputs(msg) => write!(f, "Invalid inputs: {}", msg),
            BellandeError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            BellandeError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            BellandeError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            BellandeError::IOError(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl From<std::io::Error> for BellandeError {
    fn from(err: std::io::Error) -> Self {
        BellandeError::IOError(err.to_string())
    }
}
