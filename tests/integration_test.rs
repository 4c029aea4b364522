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

use bellande_test_time_augmentation::{
    core::tensor::Tensor,
    layer::merge::{MergeStrategy, MergeWeights, SaveFormat},
    models::lambda::{identity, Lambda},
    tta_classification, tta_segmentation, AugmentationConfig, Model, Task,
};

fn full_config() -> AugmentationConfig {
    AugmentationConfig::new()
        .with_h_flip(true)
        .with_v_flip(true)
        .with_h_shift(vec![10, -10])
        .with_v_shift(vec![10, -10])
        .with_rotation(vec![90, 180, 270])
        .with_merge("mean")
}

#[test]
fn test_classification_identity_config() -> Result<(), Box<dyn Error>> {
    let input = Tensor::arange(&[1, 3, 3, 1]);
    let mut model = tta_classification(identity(&[3, 3, 1]), &AugmentationConfig::default())?;

    assert_eq!(model.n_transforms(), 1);
    assert_eq!(model.task(), Task::Classification);
    assert_eq!(model.predict(&input)?, input);
    Ok(())
}

#[test]
fn test_segmentation_restores_input() -> Result<(), Box<dyn Error>> {
    let input = Tensor::arange(&[1, 3, 3, 1]);
    let mut model = tta_segmentation(identity(&[3, 3, 1]), &full_config())?;

    assert_eq!(model.n_transforms(), 2 * 2 * 3 * 3 * 4);
    assert_eq!(model.predict(&input)?, input);
    Ok(())
}

#[test]
fn test_segmentation_flips_and_rotation() -> Result<(), Box<dyn Error>> {
    let config = AugmentationConfig::new()
        .with_h_flip(true)
        .with_v_flip(true)
        .with_rotation(vec![90, 180, 270]);
    let input = Tensor::arange(&[1, 4, 4, 2]);
    let mut model = tta_segmentation(identity(&[4, 4, 2]), &config)?;

    assert_eq!(model.n_transforms(), 16);
    assert_eq!(model.predict(&input)?, input);
    Ok(())
}

#[test]
fn test_classification_averages_augmented_views() -> Result<(), Box<dyn Error>> {
    // Every pixel of a 3x3 image visits every position across the +/-10 shifts,
    // so the average of the views is the image mean everywhere.
    let input = Tensor::arange(&[1, 3, 3, 1]);
    let mut model = tta_classification(identity(&[3, 3, 1]), &full_config())?;

    let prediction = model.predict(&input)?;
    assert!(prediction.all_close(&Tensor::full(&[1, 3, 3, 1], 4.0), 1e-5));
    Ok(())
}

#[test]
fn test_classification_flips_only() -> Result<(), Box<dyn Error>> {
    // 0 1 2      views: identity, h-flip, v-flip, both
    // 3 4 5      the per-position average mirrors values around the centre
    // 6 7 8
    let input = Tensor::arange(&[1, 3, 3, 1]);
    let config = AugmentationConfig::new().with_h_flip(true).with_v_flip(true);
    let mut model = tta_classification(identity(&[3, 3, 1]), &config)?;

    let prediction = model.predict(&input)?;
    assert_eq!(prediction.data(), &[4.0; 9]);

    let config = AugmentationConfig::new().with_h_flip(true);
    let mut model = tta_classification(identity(&[3, 3, 1]), &config)?;
    let prediction = model.predict(&input)?;
    assert_eq!(
        prediction.data(),
        &[1.0, 1.0, 1.0, 4.0, 4.0, 4.0, 7.0, 7.0, 7.0]
    );
    Ok(())
}

#[test]
fn test_classification_vector_outputs() -> Result<(), Box<dyn Error>> {
    // Per-channel global average pooling; any flip or rotation leaves it unchanged.
    let model = Lambda::new(|x: &Tensor| {
        let shape = x.shape().to_vec();
        let (n, c) = (shape[0], shape[3]);
        let per_image = shape[1] * shape[2];
        let mut out = vec![0.0; n * c];
        for (i, v) in x.data().iter().enumerate() {
            let image = i / (per_image * c);
            out[image * c + i % c] += v / per_image as f32;
        }
        Tensor::from_vec(out, &[n, c])
    })
    .with_input_shape(&[4, 4, 3]);

    let config = AugmentationConfig::new()
        .with_h_flip(true)
        .with_rotation(vec![90, 180])
        .with_merge("max");
    let mut wrapped = tta_classification(model, &config)?;

    let input = Tensor::arange(&[1, 4, 4, 3]);
    let prediction = wrapped.predict(&input)?;
    assert_eq!(prediction.shape(), &[1, 3]);
    assert!(prediction.all_close(
        &Tensor::from_vec(vec![22.5, 23.5, 24.5], &[1, 3])?,
        1e-4
    ));
    Ok(())
}

#[test]
fn test_photometric_axes_are_forward_only() -> Result<(), Box<dyn Error>> {
    let config = AugmentationConfig::new()
        .with_h_flip(true)
        .with_add(vec![2.0])
        .with_mul(vec![3.0]);
    let input = Tensor::arange(&[1, 2, 2, 1]);
    let mut model = tta_segmentation(identity(&[2, 2, 1]), &config)?;

    assert_eq!(model.n_transforms(), 8);
    assert_eq!(model.parameter_space().backward().axes.len(), 5);

    // replicas see x, x*3, x+2, (x+2)*3, each twice; the flip is undone
    let outputs = model.replica_outputs(&input)?;
    assert_eq!(outputs.batch(1)?, input.batch(0)?.scale(3.0));
    assert_eq!(outputs.batch(6)?, input.batch(0)?.map(|v| (v + 2.0) * 3.0));

    let expected = input.map(|v| (v + v * 3.0 + (v + 2.0) + (v + 2.0) * 3.0) / 4.0);
    assert!(model.predict(&input)?.all_close(&expected, 1e-5));
    Ok(())
}

#[test]
fn test_gmean_of_ones() -> Result<(), Box<dyn Error>> {
    let model = Lambda::new(|x: &Tensor| Ok(Tensor::ones(x.shape()))).with_input_shape(&[3, 3, 1]);
    let mut wrapped = tta_segmentation(model, &full_config().with_merge("gmean"))?;
    assert_eq!(wrapped.predict(&Tensor::arange(&[1, 3, 3, 1]))?, Tensor::ones(&[1, 3, 3, 1]));
    Ok(())
}

#[test]
fn test_caller_owned_weights() -> Result<(), Box<dyn Error>> {
    let config = AugmentationConfig::new()
        .with_v_flip(true)
        .with_merge("AugTTA");
    let mut model = tta_segmentation(identity(&[2, 2, 1]), &config)?;
    let input = Tensor::arange(&[1, 2, 2, 1]);

    let mut weights = MergeWeights::ones(MergeStrategy::AugmentationWeighted, &[2, 2, 2, 1])?;
    assert_eq!(model.predict_with_weights(&input, &weights)?, input.scale(2.0));

    weights.tensor_mut().data_mut().copy_from_slice(&[0.5, 0.5]);
    assert_eq!(model.predict_with_weights(&input, &weights)?, input);

    model.set_merge_weights(weights.clone())?;
    assert_eq!(model.merge_weights(), Some(&weights));
    assert_eq!(model.forward(&input)?, input);

    let spatial = MergeWeights::ones(MergeStrategy::SpatialWeighted, &[2, 2, 2, 1])?;
    assert!(model.set_merge_weights(spatial).is_err());
    Ok(())
}

#[test]
fn test_merge_weights_round_trip() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mut weights = MergeWeights::ones(MergeStrategy::SpatialWeighted, &[4, 3, 3, 2])?;
    weights.tensor_mut().data_mut()[4] = 0.25;

    for (name, format) in [("weights.json", SaveFormat::Json), ("weights.bin", SaveFormat::Binary)] {
        let path = dir.path().join(name);
        weights.save(&path, format)?;
        let loaded = MergeWeights::load(&path, format)?;
        assert_eq!(loaded, weights);
    }
    Ok(())
}

#[test]
fn test_config_file_round_trip() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tta.yaml");

    let config = full_config().with_contrast(vec![0.8, 1.2]).with_input_shape(vec![3, 3, 1]);
    config.save(&path)?;
    let loaded = AugmentationConfig::from_file(&path)?;
    assert_eq!(loaded, config);

    std::fs::write(&path, "rotation: [45]\n")?;
    let err = AugmentationConfig::from_file(&path).unwrap_err();
    assert!(err.is_configuration());
    Ok(())
}

#[test]
fn test_wrapped_model_is_a_model() -> Result<(), Box<dyn Error>> {
    let config = AugmentationConfig::new().with_h_flip(true);
    let inner = tta_segmentation(identity(&[3, 3, 1]), &config)?;
    let mut boxed: Box<dyn Model> = Box::new(inner);

    assert_eq!(boxed.input_shape(), Some(vec![3, 3, 1]));
    let input = Tensor::arange(&[1, 3, 3, 1]);
    assert_eq!(boxed.forward(&input)?, input);
    Ok(())
}

#[test]
fn test_unknown_merge_fails_at_wrap_time() -> Result<(), Box<dyn Error>> {
    let config = AugmentationConfig::new().with_merge("median");
    let err = tta_segmentation(identity(&[3, 3, 1]), &config).err().unwrap();
    assert!(err.is_configuration());
    Ok(())
}

#[test]
fn test_version() {
    assert_eq!(
        bellande_test_time_augmentation::get_version(),
        env!("CARGO_PKG_VERSION")
    );
}
