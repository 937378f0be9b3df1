//! Fractional and pixel rectangles.

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RegionError {
    #[error("bounds must be finite, got ({x1}, {y1}, {x2}, {y2})")]
    NotFinite { x1: f32, y1: f32, x2: f32, y2: f32 },
    #[error("bounds must satisfy 0 <= x1 < x2 <= 1 and 0 <= y1 < y2 <= 1, got ({x1}, {y1}, {x2}, {y2})")]
    OutOfRange { x1: f32, y1: f32, x2: f32, y2: f32 },
}

/// Rectangle expressed as fractions of a parent rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FracRect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Axis-aligned pixel rectangle, `x..x+width`, `y..y+height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FracRect {
    pub const FULL: FracRect = FracRect {
        x1: 0.0,
        y1: 0.0,
        x2: 1.0,
        y2: 1.0,
    };

    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Check `0 <= x1 < x2 <= 1` and `0 <= y1 < y2 <= 1`.
    pub fn validate(&self) -> Result<(), RegionError> {
        let Self { x1, y1, x2, y2 } = *self;
        if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
            return Err(RegionError::NotFinite { x1, y1, x2, y2 });
        }
        let ok = 0.0 <= x1 && x1 < x2 && x2 <= 1.0 && 0.0 <= y1 && y1 < y2 && y2 <= 1.0;
        if !ok {
            return Err(RegionError::OutOfRange { x1, y1, x2, y2 });
        }
        Ok(())
    }

    /// Map into absolute pixels inside `base`, clipped to `base`.
    ///
    /// Unlike [`FracRect::validate`] this tolerates out-of-range fractions
    /// (they are clipped), but returns `None` when the result is degenerate
    /// or lies entirely outside `base`.
    pub fn to_pixels(&self, base: PixelRect) -> Option<PixelRect> {
        let Self { x1, y1, x2, y2 } = *self;
        if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) || x2 <= x1 || y2 <= y1 {
            return None;
        }
        let bw = base.width as f32;
        let bh = base.height as f32;

        let px1 = (x1 * bw).round().clamp(0.0, bw) as u32;
        let py1 = (y1 * bh).round().clamp(0.0, bh) as u32;
        let px2 = (x2 * bw).round().clamp(0.0, bw) as u32;
        let py2 = (y2 * bh).round().clamp(0.0, bh) as u32;
        if px2 <= px1 || py2 <= py1 {
            return None;
        }

        Some(PixelRect {
            x: base.x + px1,
            y: base.y + py1,
            width: px2 - px1,
            height: py2 - py1,
        })
    }

    /// Split horizontally into `n` equal-width slots.
    pub fn split_columns(&self, n: usize) -> Vec<FracRect> {
        if n == 0 {
            return Vec::new();
        }
        let w = (self.x2 - self.x1) / n as f32;
        (0..n)
            .map(|i| FracRect {
                x1: self.x1 + w * i as f32,
                y1: self.y1,
                x2: if i + 1 == n {
                    self.x2
                } else {
                    self.x1 + w * (i + 1) as f32
                },
                y2: self.y2,
            })
            .collect()
    }
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width × height` image.
    pub const fn frame(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    #[inline]
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Intersection with `other`, or `None` if they do not overlap.
    pub fn intersect(&self, other: &PixelRect) -> Option<PixelRect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 as u64 || y2 <= y1 as u64 {
            return None;
        }
        Some(PixelRect {
            x: x1,
            y: y1,
            width: (x2 - x1 as u64) as u32,
            height: (y2 - y1 as u64) as u32,
        })
    }

    /// Clip to a `width × height` image.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<PixelRect> {
        self.intersect(&PixelRect::frame(width, height))
    }

    pub fn contains_rect(&self, other: &PixelRect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}
