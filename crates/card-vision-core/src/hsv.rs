//! HSV conversion on the 0–180 hue / 0–255 saturation and value scale.

use image::RgbImage;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hsv {
    /// Hue in `0..180` (degrees / 2).
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = (max - min) as f32;

    let v = max;
    let s = if max == 0 {
        0
    } else {
        (255.0 * delta / max as f32).round() as u8
    };

    if delta == 0.0 {
        return Hsv { h: 0, s, v };
    }

    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let mut deg = if max == r {
        60.0 * (gf - bf) / delta
    } else if max == g {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if deg < 0.0 {
        deg += 360.0;
    }

    let h = ((deg / 2.0).round() as u16 % 180) as u8;
    Hsv { h, s, v }
}

/// Inclusive HSV box. Hue bounds are on the 0–180 scale; a range with
/// `h_min > h_max` wraps through 180.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HsvRange {
    pub h_min: u8,
    pub h_max: u8,
    #[serde(default)]
    pub s_min: u8,
    #[serde(default = "full_scale")]
    pub s_max: u8,
    #[serde(default)]
    pub v_min: u8,
    #[serde(default = "full_scale")]
    pub v_max: u8,
}

fn full_scale() -> u8 {
    255
}

impl HsvRange {
    pub const fn new(h: (u8, u8), s: (u8, u8), v: (u8, u8)) -> Self {
        Self {
            h_min: h.0,
            h_max: h.1,
            s_min: s.0,
            s_max: s.1,
            v_min: v.0,
            v_max: v.1,
        }
    }

    #[inline]
    pub fn contains(&self, px: Hsv) -> bool {
        let hue_ok = if self.h_min <= self.h_max {
            px.h >= self.h_min && px.h <= self.h_max
        } else {
            px.h >= self.h_min || px.h <= self.h_max
        };
        hue_ok
            && px.s >= self.s_min
            && px.s <= self.s_max
            && px.v >= self.v_min
            && px.v <= self.v_max
    }
}

#[inline]
pub fn in_any_range(px: Hsv, ranges: &[HsvRange]) -> bool {
    ranges.iter().any(|r| r.contains(px))
}

/// Fraction of pixels of `img` that fall inside any of `ranges`.
///
/// Returns `0.0` for an empty image.
pub fn fraction_in_ranges(img: &RgbImage, ranges: &[HsvRange]) -> f32 {
    let total = img.width() as usize * img.height() as usize;
    if total == 0 || ranges.is_empty() {
        return 0.0;
    }
    let hits = img
        .pixels()
        .filter(|p| in_any_range(rgb_to_hsv(p[0], p[1], p[2]), ranges))
        .count();
    hits as f32 / total as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn primary_colors() {
        assert_eq!(rgb_to_hsv(255, 0, 0), Hsv { h: 0, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv(0, 255, 0), Hsv { h: 60, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv(0, 0, 255), Hsv { h: 120, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv(40, 40, 40), Hsv { h: 0, s: 0, v: 40 });
    }

    #[test]
    fn magenta_side_of_red_wraps_high() {
        let hsv = rgb_to_hsv(255, 0, 40);
        assert!(hsv.h > 170, "hue {}", hsv.h);
    }

    #[test]
    fn wrapping_range() {
        let red = HsvRange::new((170, 10), (50, 255), (50, 255));
        assert!(red.contains(Hsv { h: 175, s: 200, v: 200 }));
        assert!(red.contains(Hsv { h: 5, s: 200, v: 200 }));
        assert!(!red.contains(Hsv { h: 90, s: 200, v: 200 }));
        assert!(!red.contains(Hsv { h: 5, s: 10, v: 200 }));
    }

    #[test]
    fn fraction_counts_matching_pixels() {
        let img = RgbImage::from_fn(10, 10, |x, _| {
            if x < 3 {
                image::Rgb([0, 200, 0])
            } else {
                image::Rgb([30, 30, 30])
            }
        });
        let green = HsvRange::new((40, 80), (80, 255), (60, 255));
        let f = fraction_in_ranges(&img, &[green]);
        assert_relative_eq!(f, 0.3, epsilon = 1e-6);
    }
}
