//! Table presence and region geometry.
//!
//! The table is found by color mass: the fraction of frame pixels inside the
//! felt HSV band must reach `min_felt_fraction`. The table box is then the
//! span of rows and columns that are at least `min_line_fraction` felt, and
//! every region is mapped proportionally into that box.

use card_vision_core::{in_any_range, rgb_to_hsv, Frame, PixelRect};
use serde::{Deserialize, Serialize};

use crate::profile::{NamedRegion, RegionRole, TableParams};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Located table surface.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableLocation {
    pub rect: PixelRect,
    pub felt_fraction: f32,
}

/// A profile region mapped into frame pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct LocatedRegion {
    pub name: String,
    pub role: RegionRole,
    pub rect: PixelRect,
    /// Card slots, left to right. Empty for non-card regions.
    pub slots: Vec<PixelRect>,
}

#[derive(Clone, Debug, Default)]
pub struct RegionLocator {
    params: TableParams,
}

impl RegionLocator {
    pub fn new(params: TableParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TableParams {
        &self.params
    }

    /// Find the table surface, or `None` when not enough felt is visible.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(w = frame.width(), h = frame.height()))
    )]
    pub fn locate_table(&self, frame: &Frame) -> Option<TableLocation> {
        let w = frame.width() as usize;
        let h = frame.height() as usize;
        if w == 0 || h == 0 || self.params.felt_ranges.is_empty() {
            return None;
        }

        let mut row_hits = vec![0usize; h];
        let mut col_hits = vec![0usize; w];
        let mut total = 0usize;
        for (x, y, p) in frame.image.enumerate_pixels() {
            if in_any_range(rgb_to_hsv(p[0], p[1], p[2]), &self.params.felt_ranges) {
                row_hits[y as usize] += 1;
                col_hits[x as usize] += 1;
                total += 1;
            }
        }

        let felt_fraction = total as f32 / (w * h) as f32;
        if felt_fraction < self.params.min_felt_fraction || total == 0 {
            log::debug!(
                "table not found: felt fraction {:.3} < {:.3}",
                felt_fraction,
                self.params.min_felt_fraction
            );
            return None;
        }

        let min_row = (self.params.min_line_fraction * w as f32).ceil().max(1.0) as usize;
        let min_col = (self.params.min_line_fraction * h as f32).ceil().max(1.0) as usize;
        let (y0, y1) = span(&row_hits, min_row)?;
        let (x0, x1) = span(&col_hits, min_col)?;

        let rect = PixelRect::new(
            x0 as u32,
            y0 as u32,
            (x1 - x0 + 1) as u32,
            (y1 - y0 + 1) as u32,
        );
        log::trace!("table at {rect:?}, felt fraction {felt_fraction:.3}");
        Some(TableLocation {
            rect,
            felt_fraction,
        })
    }

    /// Map regions into frame pixels relative to `table`.
    ///
    /// Regions that clip away to nothing are dropped with a debug log.
    pub fn locate_regions(
        &self,
        frame: &Frame,
        table: &TableLocation,
        regions: &[NamedRegion],
    ) -> Vec<LocatedRegion> {
        let bounds = frame.bounds();
        let Some(base) = table.rect.intersect(&bounds) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(regions.len());
        for region in regions {
            let Some(rect) = region.bounds.to_pixels(base) else {
                log::debug!("region {} is empty inside {:?}", region.name, base);
                continue;
            };
            out.push(LocatedRegion {
                name: region.name.clone(),
                role: region.role,
                rect,
                slots: slot_rects(region, base),
            });
        }
        out
    }
}

/// Card slot rectangles of `region` inside `base`, left to right.
///
/// Slots that clip away are skipped.
pub fn slot_rects(region: &NamedRegion, base: PixelRect) -> Vec<PixelRect> {
    region
        .bounds
        .split_columns(region.slots)
        .iter()
        .filter_map(|slot| slot.to_pixels(base))
        .collect()
}

/// First and last index whose count reaches `min`.
fn span(hits: &[usize], min: usize) -> Option<(usize, usize)> {
    let first = hits.iter().position(|&c| c >= min)?;
    let last = hits.iter().rposition(|&c| c >= min)?;
    Some((first, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::PlatformProfile;
    use image::{Rgb, RgbImage};

    const FELT: Rgb<u8> = Rgb([35, 110, 50]);
    const DARK: Rgb<u8> = Rgb([18, 18, 22]);

    fn table_frame(w: u32, h: u32, felt: PixelRect) -> Frame {
        let mut img = RgbImage::from_pixel(w, h, DARK);
        for y in felt.y..felt.y + felt.height {
            for x in felt.x..felt.x + felt.width {
                img.put_pixel(x, y, FELT);
            }
        }
        Frame::now(img)
    }

    #[test]
    fn no_felt_means_no_table() {
        let frame = Frame::now(RgbImage::from_pixel(320, 240, DARK));
        assert!(RegionLocator::default().locate_table(&frame).is_none());
    }

    #[test]
    fn small_felt_patch_is_not_a_table() {
        let frame = table_frame(320, 240, PixelRect::new(0, 0, 40, 40));
        assert!(RegionLocator::default().locate_table(&frame).is_none());
    }

    #[test]
    fn finds_felt_box() {
        let felt = PixelRect::new(30, 20, 250, 190);
        let frame = table_frame(320, 240, felt);
        let t = RegionLocator::default().locate_table(&frame).unwrap();
        assert_eq!(t.rect, felt);
        assert!(t.felt_fraction > 0.5);
    }

    #[test]
    fn regions_are_inside_the_frame() {
        let felt = PixelRect::new(30, 20, 250, 190);
        let frame = table_frame(320, 240, felt);
        let locator = RegionLocator::default();
        let t = locator.locate_table(&frame).unwrap();
        let regions = PlatformProfile::classic().named_regions();
        let located = locator.locate_regions(&frame, &t, &regions);
        assert_eq!(located.len(), regions.len());
        for r in &located {
            assert!(frame.bounds().contains_rect(&r.rect), "{r:?}");
            assert!(felt.contains_rect(&r.rect), "{r:?}");
            for s in &r.slots {
                assert!(r.rect.contains_rect(s), "{s:?} outside {r:?}");
            }
        }
        let board = located
            .iter()
            .find(|r| r.role == RegionRole::BoardCards)
            .unwrap();
        assert_eq!(board.slots.len(), 5);
        assert!(board.slots.windows(2).all(|w| w[0].x < w[1].x));
    }
}
