use chrono::{DateTime, Utc};
use image::{GenericImageView, RgbImage};

use crate::PixelRect;

/// One captured screen image. Owned by the cycle that captured it.
#[derive(Clone, Debug)]
pub struct Frame {
    pub image: RgbImage,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(image: RgbImage, captured_at: DateTime<Utc>) -> Self {
        Self { image, captured_at }
    }

    /// Frame stamped with the current time.
    pub fn now(image: RgbImage) -> Self {
        Self::new(image, Utc::now())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[inline]
    pub fn bounds(&self) -> PixelRect {
        PixelRect::frame(self.width(), self.height())
    }

    /// Copy out `rect`, clipped to the frame. `None` if nothing remains.
    pub fn crop(&self, rect: &PixelRect) -> Option<RgbImage> {
        let r = rect.clip_to(self.width(), self.height())?;
        Some(self.image.view(r.x, r.y, r.width, r.height).to_image())
    }
}
