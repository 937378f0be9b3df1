//! Lightweight 8-bit grayscale rasters used for card crops and templates.

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl<'a> GrayImageView<'a> {
    /// Build a view, checking that the buffer matches the dimensions.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Option<Self> {
        if width == 0 || height == 0 || width.checked_mul(height)? != data.len() {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.len() != self.width * self.height
    }

    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.data.iter().map(|&v| v as u64).sum();
        sum as f32 / self.data.len() as f32
    }
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    pub fn from_luma(img: &::image::GrayImage) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.as_raw().clone(),
        }
    }

    /// Convert into an `image::GrayImage` for encoding.
    pub fn to_luma(&self) -> Option<::image::GrayImage> {
        let w = u32::try_from(self.width).ok()?;
        let h = u32::try_from(self.height).ok()?;
        ::image::GrayImage::from_raw(w, h, self.data.clone())
    }
}

#[inline]
fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return 0;
    }
    src.data[y as usize * src.width + x as usize]
}

#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray(src, x0, y0) as f32;
    let p10 = get_gray(src, x0 + 1, y0) as f32;
    let p01 = get_gray(src, x0, y0 + 1) as f32;
    let p11 = get_gray(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).round().clamp(0.0, 255.0) as u8
}

/// Resample `src` to `width × height` with pixel-center aligned bilinear
/// interpolation. Sample positions are clamped to the source so borders
/// never pick up out-of-image zeros.
///
/// Returns `None` for empty inputs or a zero-sized target.
pub fn resize_bilinear(src: &GrayImageView<'_>, width: usize, height: usize) -> Option<GrayImage> {
    if src.is_empty() || width == 0 || height == 0 {
        return None;
    }
    if src.width == width && src.height == height {
        return Some(GrayImage {
            width,
            height,
            data: src.data.to_vec(),
        });
    }

    let sx = src.width as f32 / width as f32;
    let sy = src.height as f32 / height as f32;
    let max_x = (src.width - 1) as f32;
    let max_y = (src.height - 1) as f32;

    Some(GrayImage::from_fn(width, height, |x, y| {
        let u = ((x as f32 + 0.5) * sx - 0.5).clamp(0.0, max_x);
        let v = ((y as f32 + 0.5) * sy - 0.5).clamp(0.0, max_y);
        sample_bilinear_u8(src, u, v)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_rejects_mismatched_buffers() {
        let data = [0u8; 6];
        assert!(GrayImageView::new(2, 3, &data).is_some());
        assert!(GrayImageView::new(3, 3, &data).is_none());
        assert!(GrayImageView::new(0, 3, &data[..0]).is_none());
    }

    #[test]
    fn resize_identity_copies() {
        let img = GrayImage::from_fn(4, 3, |x, y| (x * 10 + y) as u8);
        let out = resize_bilinear(&img.view(), 4, 3).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn resize_keeps_flat_images_flat() {
        let img = GrayImage::from_fn(7, 5, |_, _| 200);
        let out = resize_bilinear(&img.view(), 13, 11).unwrap();
        assert!(out.data.iter().all(|&v| v == 200));
    }

    #[test]
    fn downscale_averages_neighbours() {
        let img = GrayImage::from_fn(2, 1, |x, _| if x == 0 { 0 } else { 200 });
        let out = resize_bilinear(&img.view(), 1, 1).unwrap();
        assert_eq!(out.data, vec![100]);
    }

    #[test]
    fn luma_roundtrip() {
        let img = GrayImage::from_fn(5, 4, |x, y| (x * 40 + y * 3) as u8);
        let luma = img.to_luma().unwrap();
        assert_eq!(GrayImage::from_luma(&luma), img);
    }
}
