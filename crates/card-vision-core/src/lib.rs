//! Core types and utilities for reading cards off table screenshots.
//!
//! This crate is intentionally small: card identities, frames, a plain
//! grayscale raster, HSV helpers, rectangles and thresholding. Matching,
//! learning and the per-frame pipeline live in `card-vision-match` and
//! `card-vision-table`.

mod card;
mod frame;
mod hsv;
mod logger;
mod raster;
mod region;
mod threshold;

pub use card::{parse_cards, Card, CardParseError, Rank, Suit, SuitColor};
pub use frame::Frame;
pub use hsv::{fraction_in_ranges, in_any_range, rgb_to_hsv, Hsv, HsvRange};
pub use raster::{
    resize_bilinear, sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView,
};
pub use region::{FracRect, PixelRect, RegionError};
pub use threshold::{binarize, histogram, otsu_threshold, otsu_threshold_from_samples};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, parse_level, LOG_ENV};
