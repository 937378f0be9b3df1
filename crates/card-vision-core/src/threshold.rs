//! Automatic threshold selection and binarization.

use crate::{GrayImage, GrayImageView};

/// 256-bin intensity histogram.
pub fn histogram(samples: &[u8]) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    hist
}

/// Otsu threshold of a card crop.
///
/// A card slot is ink on a face, so its histogram is bimodal and the level
/// maximizing between-class variance separates rank and suit glyphs from
/// the face. Degenerate crops are handled without a search: an empty crop
/// gives 127, a flat one its only level, and one with exactly two levels
/// their midpoint. Binarize with [`binarize`] (`> t` is foreground).
pub fn otsu_threshold(crop: &GrayImageView<'_>) -> u8 {
    otsu_threshold_from_samples(crop.data)
}

/// Otsu threshold of raw intensities. See [`otsu_threshold`].
pub fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    let hist = histogram(samples);
    let mut levels = hist.iter().enumerate().filter(|&(_, &h)| h > 0).map(|(i, _)| i);
    let Some(lo) = levels.next() else {
        return 127;
    };
    let (hi, distinct) = levels.fold((lo, 1usize), |(_, n), i| (i, n + 1));
    match distinct {
        1 => return lo as u8,
        2 => return ((lo + hi) / 2) as u8,
        _ => {}
    }

    let total = samples.len() as f64;
    let mass: f64 = hist.iter().enumerate().map(|(i, &h)| i as f64 * h as f64).sum();

    let mut below = 0f64;
    let mut below_mass = 0f64;
    let mut best = (lo as u8, f64::MIN);
    // A split after `hi` leaves the upper class empty.
    for (t, &h) in hist.iter().enumerate().take(hi).skip(lo) {
        below += h as f64;
        below_mass += t as f64 * h as f64;
        let above = total - below;
        let spread = below_mass / below - (mass - below_mass) / above;
        let between = below * above * spread * spread;
        if between > best.1 {
            best = (t as u8, between);
        }
    }
    best.0
}

/// Binarize: pixels strictly above `threshold` become 255, the rest 0.
pub fn binarize(src: &GrayImageView<'_>, threshold: u8) -> GrayImage {
    GrayImage {
        width: src.width,
        height: src.height,
        data: src
            .data
            .iter()
            .map(|&v| if v > threshold { 255 } else { 0 })
            .collect(),
    }
}
