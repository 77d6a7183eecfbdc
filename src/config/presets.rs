//! Classifier backbone presets.
//!
//! Each backbone name maps to the evaluation transform its weights were
//! trained with: resize the shorter side to `input_size / crop_pct`, center
//! crop `input_size`, then normalize by `mean`/`std`.

use crate::constants::imagenet;
use crate::error::{Error, Result};

/// Preprocessing parameters for a classifier backbone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierPreset {
    /// Backbone name as written in the config.
    pub name: &'static str,
    /// Square model input size in pixels.
    pub input_size: u32,
    /// Ratio of the center crop to the resized image.
    pub crop_pct: f32,
    /// Per-channel normalization mean (RGB).
    pub mean: [f32; 3],
    /// Per-channel normalization standard deviation (RGB).
    pub std: [f32; 3],
}

impl ClassifierPreset {
    /// Length of the shorter side after the resize step.
    pub fn resize_size(&self) -> u32 {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let size = (self.input_size as f32 / self.crop_pct).floor() as u32;
        size.max(self.input_size)
    }
}

const PRESETS: &[ClassifierPreset] = &[
    ClassifierPreset {
        name: "tf_efficientnet_b5.ns_jft_in1k",
        input_size: 456,
        crop_pct: 0.934,
        mean: imagenet::MEAN,
        std: imagenet::STD,
    },
    ClassifierPreset {
        name: "tf_efficientnet_b3.ns_jft_in1k",
        input_size: 300,
        crop_pct: 0.904,
        mean: imagenet::MEAN,
        std: imagenet::STD,
    },
    ClassifierPreset {
        name: "tf_efficientnet_b0.ns_jft_in1k",
        input_size: 224,
        crop_pct: 0.875,
        mean: imagenet::MEAN,
        std: imagenet::STD,
    },
    ClassifierPreset {
        name: "efficientnet_b0",
        input_size: 224,
        crop_pct: 0.875,
        mean: imagenet::MEAN,
        std: imagenet::STD,
    },
];

/// Look up the preset for a backbone name.
pub fn classifier_preset(name: &str) -> Result<ClassifierPreset> {
    PRESETS
        .iter()
        .find(|p| p.name == name)
        .copied()
        .ok_or_else(|| Error::UnknownClassifierBase {
            name: name.to_string(),
            known: PRESETS
                .iter()
                .map(|p| p.name)
                .collect::<Vec<_>>()
                .join(", "),
        })
}
