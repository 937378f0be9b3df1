//! Frame acquisition.
//!
//! A [`FrameSource`] hands out one [`Frame`] per poll or `None` when nothing
//! could be captured this time. `None` is a skipped cycle, not an error: the
//! session keeps polling until the source reports it is exhausted.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use card_vision_core::Frame;
use card_vision_table::PlatformProfile;
use image::RgbImage;

use crate::synthetic::{render_table, TableScene};

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error("no images in {0}")]
    EmptyDirectory(PathBuf),
    #[error("screen capture failed: {0}")]
    Capture(String),
    #[error("screen capture support is not compiled in (enable the `capture` feature)")]
    CaptureUnavailable,
}

/// Something that produces frames on demand.
pub trait FrameSource {
    /// Capture the next frame. `None` on a transient failure.
    fn next_frame(&mut self) -> Option<Frame>;

    /// `true` once no further frame will ever be produced.
    fn is_exhausted(&self) -> bool {
        false
    }

    fn name(&self) -> &str;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Option<Frame> {
        (**self).next_frame()
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

fn load_rgb(path: &Path) -> Result<RgbImage, SourceError> {
    Ok(image::ImageReader::open(path)?.decode()?.to_rgb8())
}

/// The same image over and over, optionally a limited number of times.
#[derive(Clone, Debug)]
pub struct StillSource {
    image: RgbImage,
    remaining: Option<usize>,
}

impl StillSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        Ok(Self::from_image(load_rgb(path.as_ref())?))
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self {
            image,
            remaining: None,
        }
    }

    /// Stop after `count` frames.
    pub fn with_limit(mut self, count: usize) -> Self {
        self.remaining = Some(count);
        self
    }
}

impl FrameSource for StillSource {
    fn next_frame(&mut self) -> Option<Frame> {
        match &mut self.remaining {
            Some(0) => return None,
            Some(n) => *n -= 1,
            None => {}
        }
        Some(Frame::now(self.image.clone()))
    }

    fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    fn name(&self) -> &str {
        "still"
    }
}

/// Every `png`/`jpg`/`jpeg` in a directory, in file name order, once each.
///
/// A file that fails to decode is logged and yields a skipped cycle.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    files: Vec<PathBuf>,
    next: usize,
}

impl DirectorySource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                .unwrap_or(false);
            if is_image && path.is_file() {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(SourceError::EmptyDirectory(dir.to_path_buf()));
        }
        files.sort();
        Ok(Self { files, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for DirectorySource {
    fn next_frame(&mut self) -> Option<Frame> {
        let path = self.files.get(self.next)?;
        self.next += 1;
        match load_rgb(path) {
            Ok(img) => Some(Frame::now(img)),
            Err(e) => {
                log::warn!("skipping {}: {e}", path.display());
                None
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.next >= self.files.len()
    }

    fn name(&self) -> &str {
        "directory"
    }
}

/// Renders a fixed list of scenes, one per poll.
#[derive(Clone, Debug)]
pub struct SyntheticSource {
    profile: PlatformProfile,
    scenes: Vec<TableScene>,
    width: u32,
    height: u32,
    next: usize,
}

impl SyntheticSource {
    pub fn new(profile: PlatformProfile, scenes: Vec<TableScene>, width: u32, height: u32) -> Self {
        Self {
            profile,
            scenes,
            width,
            height,
            next: 0,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Option<Frame> {
        let scene = self.scenes.get(self.next)?;
        self.next += 1;
        Some(Frame::now(render_table(
            &self.profile,
            scene,
            self.width,
            self.height,
        )))
    }

    fn is_exhausted(&self) -> bool {
        self.next >= self.scenes.len()
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Primary monitor capture.
#[cfg(feature = "capture")]
#[derive(Debug, Default)]
pub struct ScreenSource;

#[cfg(feature = "capture")]
impl ScreenSource {
    pub fn new() -> Self {
        Self
    }

    /// Capture the primary monitor once.
    pub fn capture(&self) -> Result<RgbImage, SourceError> {
        let monitors = xcap::Monitor::all().map_err(|e| SourceError::Capture(e.to_string()))?;
        let monitor = monitors
            .iter()
            .find(|m| m.is_primary())
            .or_else(|| monitors.first())
            .ok_or_else(|| SourceError::Capture("no monitor found".to_string()))?;
        let shot = monitor
            .capture_image()
            .map_err(|e| SourceError::Capture(e.to_string()))?;
        let (w, h) = (shot.width(), shot.height());
        let rgba = image::RgbaImage::from_raw(w, h, shot.into_raw())
            .ok_or_else(|| SourceError::Capture(format!("bad {w}x{h} buffer")))?;
        Ok(image::DynamicImage::ImageRgba8(rgba).to_rgb8())
    }
}

#[cfg(feature = "capture")]
impl FrameSource for ScreenSource {
    fn next_frame(&mut self) -> Option<Frame> {
        match self.capture() {
            Ok(img) => Some(Frame::now(img)),
            Err(e) => {
                log::warn!("{e}");
                None
            }
        }
    }

    fn name(&self) -> &str {
        "screen"
    }
}

/// Polls the inner source no more often than once per `interval`.
#[derive(Debug)]
pub struct RateLimitedSource<S> {
    inner: S,
    interval: Duration,
    last_poll: Option<Instant>,
}

impl<S: FrameSource> RateLimitedSource<S> {
    pub fn new(inner: S, interval: Duration) -> Self {
        Self {
            inner,
            interval,
            last_poll: None,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: FrameSource> FrameSource for RateLimitedSource<S> {
    fn next_frame(&mut self) -> Option<Frame> {
        if let Some(last) = self.last_poll {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                std::thread::sleep(self.interval - elapsed);
            }
        }
        self.last_poll = Some(Instant::now());
        self.inner.next_frame()
    }

    fn is_exhausted(&self) -> bool {
        self.inner.is_exhausted()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn still_source_honours_limit() {
        let mut src = StillSource::from_image(RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))).with_limit(2);
        assert!(src.next_frame().is_some());
        assert!(!src.is_exhausted());
        assert!(src.next_frame().is_some());
        assert!(src.is_exhausted());
        assert!(src.next_frame().is_none());
    }

    #[test]
    fn directory_source_reads_sorted_images() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(3, 3, Rgb([200, 0, 0]))
            .save(dir.path().join("b.png"))
            .unwrap();
        RgbImage::from_pixel(5, 5, Rgb([0, 200, 0]))
            .save(dir.path().join("a.png"))
            .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut src = DirectorySource::open(dir.path()).unwrap();
        assert_eq!(src.len(), 2);
        assert_eq!(src.next_frame().unwrap().width(), 5);
        assert_eq!(src.next_frame().unwrap().width(), 3);
        assert!(src.is_exhausted());
        assert!(src.next_frame().is_none());
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DirectorySource::open(dir.path()),
            Err(SourceError::EmptyDirectory(_))
        ));
    }

    #[test]
    fn rate_limit_spaces_polls() {
        let inner = StillSource::from_image(RgbImage::new(2, 2)).with_limit(3);
        let mut src = RateLimitedSource::new(inner, Duration::from_millis(20));
        let start = Instant::now();
        for _ in 0..3 {
            assert!(src.next_frame().is_some());
        }
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert!(src.is_exhausted());
    }
}
