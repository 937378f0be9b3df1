//! Normalized cross-correlation between gray rasters.

use card_vision_core::{resize_bilinear, GrayImage, GrayImageView};

/// Zero-mean normalized cross-correlation of two equal-size rasters.
///
/// Returns a score in `[-1, 1]`, or `None` if the views are empty or differ in
/// size. When either input is flat (zero variance) the correlation is
/// undefined; the score is then `1.0` for identical rasters and `0.0`
/// otherwise.
pub fn ncc(a: &GrayImageView<'_>, b: &GrayImageView<'_>) -> Option<f32> {
    if a.is_empty() || b.is_empty() || a.width != b.width || a.height != b.height {
        return None;
    }

    let n = a.data.len() as f64;
    let mean_a = a.data.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_b = b.data.iter().map(|&v| v as f64).sum::<f64>() / n;

    let mut cov = 0.0f64;
    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    for (&pa, &pb) in a.data.iter().zip(b.data) {
        let da = pa as f64 - mean_a;
        let db = pb as f64 - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    if var_a <= f64::EPSILON || var_b <= f64::EPSILON {
        return Some(if a.data == b.data { 1.0 } else { 0.0 });
    }

    let score = cov / (var_a.sqrt() * var_b.sqrt());
    Some(score.clamp(-1.0, 1.0) as f32)
}

/// Score `template` against `crop`, resampling the template to the crop's size.
///
/// `None` if either raster is empty or malformed.
pub fn score_against(crop: &GrayImageView<'_>, template: &GrayImage) -> Option<f32> {
    let tview = GrayImageView::new(template.width, template.height, &template.data)?;
    if crop.is_empty() {
        return None;
    }
    if tview.width == crop.width && tview.height == crop.height {
        return ncc(crop, &tview);
    }
    let resized = resize_bilinear(&tview, crop.width, crop.height)?;
    ncc(crop, &resized.view())
}
