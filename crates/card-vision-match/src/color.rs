//! Red/black suit family from HSV pixel ratios.
//!
//! The result is a prior for ranking template candidates. It never names an
//! exact suit on its own.

use card_vision_core::{fraction_in_ranges, HsvRange, SuitColor};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Red covers both ends of the 0–180 hue circle.
pub const CLASSIC_RED_RANGES: [HsvRange; 2] = [
    HsvRange::new((0, 15), (70, 255), (50, 255)),
    HsvRange::new((160, 180), (70, 255), (50, 255)),
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuitColorParams {
    pub red_ranges: Vec<HsvRange>,
    /// Minimum fraction of red pixels for a "red" verdict.
    pub red_fraction_threshold: f32,
    /// Relative band around the threshold in which the verdict is flagged
    /// as not confident (`0.5` means `[0.5 t, 1.5 t]`).
    pub uncertain_band: f32,
}

impl Default for SuitColorParams {
    fn default() -> Self {
        Self {
            red_ranges: CLASSIC_RED_RANGES.to_vec(),
            red_fraction_threshold: 0.03,
            uncertain_band: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SuitColorReading {
    pub color: SuitColor,
    pub red_fraction: f32,
    pub confident: bool,
}

#[derive(Clone, Debug, Default)]
pub struct SuitColorClassifier {
    params: SuitColorParams,
}

impl SuitColorClassifier {
    pub fn new(params: SuitColorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SuitColorParams {
        &self.params
    }

    /// Classify the raw color crop of one card. `None` for an empty crop.
    pub fn classify(&self, crop: &RgbImage) -> Option<SuitColorReading> {
        if crop.width() == 0 || crop.height() == 0 {
            return None;
        }
        let red_fraction = fraction_in_ranges(crop, &self.params.red_ranges);
        let t = self.params.red_fraction_threshold;
        let color = if red_fraction > t {
            SuitColor::Red
        } else {
            SuitColor::Black
        };
        let band = self.params.uncertain_band.max(0.0);
        let lo = t * (1.0 - band);
        let hi = t * (1.0 + band);
        let confident = red_fraction < lo || red_fraction > hi;
        Some(SuitColorReading {
            color,
            red_fraction,
            confident,
        })
    }
}
