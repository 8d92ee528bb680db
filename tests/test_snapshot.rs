//! Tests for saving and restoring layer parameters
//!
//! This file tests:
//! - LayerSnapshot: JSON round trip through a temporary file
//! - Deconvolution2DLayer::restore: lazy layers, validation failures

use deconv_layers::layers::{Deconvolution2DLayer, Deconvolution2DOptions, Layer};
use deconv_layers::snapshot::{LayerSnapshot, ParameterSnapshot};
use deconv_layers::{Error, Tensor};
use ndarray::IxDyn;
use tempfile::NamedTempFile;

fn trained_layer() -> Deconvolution2DLayer {
    let options = Deconvolution2DOptions::default().stride(2).pad(1).seed(31);
    let mut layer = Deconvolution2DLayer::new(3, 5, 4, options).unwrap();
    let mut params = layer.parameters_mut();
    if let Some(b) = params[1].data_mut() {
        b.mapv_inplace(|v| v + 0.5);
    }
    drop(params);
    layer
}

// ============================================================================
// Round Trip Tests
// ============================================================================

mod round_trip_tests {
    use super::*;

    #[test]
    fn test_snapshot_holds_all_parameters() {
        let layer = trained_layer();
        let snapshot = layer.snapshot();

        assert_eq!(snapshot.params.len(), 2);
        assert_eq!(snapshot.get("W").unwrap().shape, vec![3, 5, 4, 4]);
        assert_eq!(snapshot.get("b").unwrap().data, vec![0.5; 5]);
    }

    #[test]
    fn test_lazy_snapshot_skips_pending_weight() {
        let layer = Deconvolution2DLayer::lazy(5, 4, Deconvolution2DOptions::default()).unwrap();
        let snapshot = layer.snapshot();

        assert!(snapshot.get("W").is_none());
        assert!(snapshot.get("b").is_some());
    }

    #[test]
    fn test_save_and_load_file() {
        let layer = trained_layer();
        let file = NamedTempFile::new().expect("Failed to create temp file");

        layer.snapshot().save(file.path()).unwrap();
        let loaded = LayerSnapshot::load(file.path()).unwrap();

        assert_eq!(loaded, layer.snapshot());
    }

    #[test]
    fn test_restore_into_lazy_layer_fixes_in_channels() {
        let source = trained_layer();
        let file = NamedTempFile::new().expect("Failed to create temp file");
        source.snapshot().save(file.path()).unwrap();

        let options = Deconvolution2DOptions::default().stride(2).pad(1);
        let mut target = Deconvolution2DLayer::lazy(5, 4, options).unwrap();
        target.restore(&LayerSnapshot::load(file.path()).unwrap()).unwrap();

        assert_eq!(target.in_channels(), Some(3));
        assert_eq!(target.weight().data(), source.weight().data());
        assert_eq!(target.bias().unwrap().data(), source.bias().unwrap().data());
    }

    #[test]
    fn test_restored_layer_produces_same_output() {
        let mut source = trained_layer();
        let mut target = Deconvolution2DLayer::new(
            3,
            5,
            4,
            Deconvolution2DOptions::default().stride(2).pad(1).seed(0),
        )
        .unwrap();
        target.restore(&source.snapshot()).unwrap();

        let x = Tensor::from_shape_fn(IxDyn(&[2, 3, 4, 4]), |idx| {
            (idx[1] * 16 + idx[2] * 4 + idx[3]) as f32 / 48.0
        });
        assert_eq!(source.forward(&x).unwrap(), target.forward(&x).unwrap());
    }
}

// ============================================================================
// Validation Tests
// ============================================================================

mod validation_tests {
    use super::*;

    fn param(name: &str, shape: &[usize]) -> ParameterSnapshot {
        ParameterSnapshot {
            name: name.to_string(),
            shape: shape.to_vec(),
            data: vec![0.0; shape.iter().product()],
        }
    }

    #[test]
    fn test_wrong_in_channels_rejected() {
        let mut layer = trained_layer();
        let before = layer.snapshot();
        let snapshot = LayerSnapshot {
            params: vec![param("W", &[2, 5, 4, 4]), param("b", &[5])],
        };

        let err = layer.restore(&snapshot).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
        assert_eq!(layer.snapshot(), before);
    }

    #[test]
    fn test_wrong_kernel_rejected_for_lazy_layer() {
        let mut layer = Deconvolution2DLayer::lazy(5, 4, Deconvolution2DOptions::default()).unwrap();
        let snapshot = LayerSnapshot {
            params: vec![param("W", &[3, 5, 3, 3]), param("b", &[5])],
        };

        let err = layer.restore(&snapshot).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
        assert_eq!(layer.in_channels(), None);
    }

    #[test]
    fn test_wrong_bias_length_rejected() {
        let mut layer = trained_layer();
        let snapshot = LayerSnapshot {
            params: vec![param("W", &[3, 5, 4, 4]), param("b", &[4])],
        };

        let err = layer.restore(&snapshot).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
    }

    #[test]
    fn test_bias_for_nobias_layer_rejected() {
        let options = Deconvolution2DOptions::default().nobias(true);
        let mut layer = Deconvolution2DLayer::new(3, 5, 4, options).unwrap();
        let snapshot = LayerSnapshot {
            params: vec![param("W", &[3, 5, 4, 4]), param("b", &[5])],
        };

        let err = layer.restore(&snapshot).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_bias_rejected() {
        let mut layer = trained_layer();
        let snapshot = LayerSnapshot {
            params: vec![param("W", &[3, 5, 4, 4])],
        };

        let err = layer.restore(&snapshot).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let mut layer = trained_layer();
        let snapshot = LayerSnapshot {
            params: vec![param("gamma", &[5])],
        };

        let err = layer.restore(&snapshot).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_inconsistent_data_length_rejected() {
        let mut layer = trained_layer();
        let snapshot = LayerSnapshot {
            params: vec![
                ParameterSnapshot {
                    name: "W".to_string(),
                    shape: vec![3, 5, 4, 4],
                    data: vec![0.0; 10],
                },
                param("b", &[5]),
            ],
        };

        let err = layer.restore(&snapshot).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = LayerSnapshot::load("does/not/exist.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
