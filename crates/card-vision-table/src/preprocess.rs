//! Card crop normalization: grayscale, Otsu binarization, polarity.

use card_vision_core::{binarize, otsu_threshold, GrayImage};
use image::RgbImage;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Result of normalizing one crop.
#[derive(Clone, Debug, PartialEq)]
pub enum Preprocessed {
    /// Zero-size or malformed input.
    Empty,
    /// Binary image (0 / 255) with ink as the 255 minority class.
    Binary(GrayImage),
}

impl Preprocessed {
    pub fn image(&self) -> Option<&GrayImage> {
        match self {
            Self::Empty => None,
            Self::Binary(img) => Some(img),
        }
    }

    pub fn into_image(self) -> Option<GrayImage> {
        match self {
            Self::Empty => None,
            Self::Binary(img) => Some(img),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Deterministic crop normalizer.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Luma conversion of a color crop.
    pub fn grayscale(crop: &RgbImage) -> Option<GrayImage> {
        if crop.width() == 0 || crop.height() == 0 {
            return None;
        }
        let luma = image::imageops::grayscale(crop);
        Some(GrayImage::from_luma(&luma))
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(crop), fields(w = crop.width(), h = crop.height()))
    )]
    pub fn process(crop: &RgbImage) -> Preprocessed {
        match Self::grayscale(crop) {
            Some(gray) => Self::process_gray(&gray),
            None => Preprocessed::Empty,
        }
    }

    /// Binarize an already gray crop.
    pub fn process_gray(gray: &GrayImage) -> Preprocessed {
        let Some(view) = card_vision_core::GrayImageView::new(gray.width, gray.height, &gray.data)
        else {
            return Preprocessed::Empty;
        };
        let t = otsu_threshold(&view);
        let mut bin = binarize(&view, t);
        if bin.view().mean() > 127.5 {
            for v in bin.data.iter_mut() {
                *v = 255 - *v;
            }
        }
        Preprocessed::Binary(bin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn card_like() -> RgbImage {
        // White face with a dark 4x6 blob.
        let mut img = RgbImage::from_pixel(20, 30, Rgb([240, 240, 240]));
        for y in 5..11 {
            for x in 3..7 {
                img.put_pixel(x, y, Rgb([20, 20, 20]));
            }
        }
        img
    }

    #[test]
    fn ink_becomes_foreground() {
        let Preprocessed::Binary(bin) = ImagePreprocessor::process(&card_like()) else {
            panic!("expected a binary image");
        };
        assert_eq!(bin.get(4, 6), 255);
        assert_eq!(bin.get(15, 20), 0);
        assert!(bin.data.iter().all(|&v| v == 0 || v == 255));
    }

    #[test]
    fn polarity_is_normalized() {
        let light = card_like();
        let mut dark = light.clone();
        for p in dark.pixels_mut() {
            *p = Rgb([255 - p[0], 255 - p[1], 255 - p[2]]);
        }
        assert_eq!(
            ImagePreprocessor::process(&light),
            ImagePreprocessor::process(&dark)
        );
    }

    #[test]
    fn empty_crop_is_a_sentinel() {
        assert!(ImagePreprocessor::process(&RgbImage::new(0, 0)).is_empty());
        let bad = GrayImage {
            width: 4,
            height: 4,
            data: vec![0; 3],
        };
        assert!(ImagePreprocessor::process_gray(&bad).is_empty());
    }

    #[test]
    fn deterministic() {
        let img = card_like();
        assert_eq!(
            ImagePreprocessor::process(&img),
            ImagePreprocessor::process(&img)
        );
    }
}
