//! Application configuration (JSON).
//!
//! ```json
//! {
//!   "profile": "profiles/classic.json",
//!   "templates": "templates",
//!   "source": { "kind": "directory", "path": "captures" },
//!   "cycle_interval_ms": 1000,
//!   "flush_every_hands": 10,
//!   "log_level": "info"
//! }
//! ```
//!
//! Without `profile` the built-in classic profile is used.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use card_vision_match::{TemplateStore, TemplateStoreError};
use card_vision_table::{PlatformProfile, ProfileError};
use serde::{Deserialize, Serialize};

use crate::session::SessionConfig;
use crate::source::{DirectorySource, FrameSource, RateLimitedSource, SourceError, StillSource};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("profile: {0}")]
    Profile(#[from] ProfileError),
    #[error("frame source: {0}")]
    Source(#[from] SourceError),
    #[error("template store: {0}")]
    Store(#[from] TemplateStoreError),
}

/// Where frames come from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Primary monitor; needs the `capture` feature.
    Screen,
    /// One image file, read every cycle.
    Still { path: PathBuf },
    /// Every image in a directory, once each.
    Directory { path: PathBuf },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub profile: Option<PathBuf>,
    pub templates: PathBuf,
    pub source: SourceConfig,
    pub cycle_interval_ms: u64,
    pub flush_every_hands: u32,
    /// `error` .. `trace`; the environment wins when set.
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: None,
            templates: PathBuf::from("templates"),
            source: SourceConfig::Screen,
            cycle_interval_ms: 1000,
            flush_every_hands: 10,
            log_level: None,
        }
    }
}

impl AppConfig {
    /// Load a config from JSON. Relative paths resolve against the file's
    /// directory.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let mut cfg: Self = serde_json::from_str(&raw)?;
        if let Some(base) = path.parent() {
            cfg.resolve_paths(base);
        }
        Ok(cfg)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(p) = &mut self.profile {
            join(p);
        }
        join(&mut self.templates);
        match &mut self.source {
            SourceConfig::Still { path } | SourceConfig::Directory { path } => join(path),
            SourceConfig::Screen => {}
        }
    }

    pub fn load_profile(&self) -> Result<PlatformProfile, ConfigError> {
        match &self.profile {
            Some(path) => Ok(PlatformProfile::load_json(path)?),
            None => Ok(PlatformProfile::classic()),
        }
    }

    /// Open the template store, empty when the directory does not exist yet.
    pub fn open_store(&self) -> Result<TemplateStore, ConfigError> {
        Ok(TemplateStore::open(self.templates.clone())?)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    pub fn session_config(&self, max_cycles: Option<u64>) -> SessionConfig {
        SessionConfig {
            flush_every_hands: self.flush_every_hands,
            max_cycles,
        }
    }

    /// The configured source, polled at most once per cycle interval.
    pub fn open_source(&self) -> Result<Box<dyn FrameSource>, ConfigError> {
        let interval = self.cycle_interval();
        let source: Box<dyn FrameSource> = match &self.source {
            SourceConfig::Still { path } => {
                Box::new(RateLimitedSource::new(StillSource::open(path)?, interval))
            }
            SourceConfig::Directory { path } => {
                Box::new(RateLimitedSource::new(DirectorySource::open(path)?, interval))
            }
            SourceConfig::Screen => screen_source(interval)?,
        };
        Ok(source)
    }
}

#[cfg(feature = "capture")]
fn screen_source(interval: Duration) -> Result<Box<dyn FrameSource>, ConfigError> {
    use crate::source::ScreenSource;
    Ok(Box::new(RateLimitedSource::new(ScreenSource::new(), interval)))
}

#[cfg(not(feature = "capture"))]
fn screen_source(_interval: Duration) -> Result<Box<dyn FrameSource>, ConfigError> {
    Err(SourceError::CaptureUnavailable.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: AppConfig = serde_json::from_str(r#"{ "source": { "kind": "screen" } }"#).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.cycle_interval(), Duration::from_secs(1));
    }

    #[test]
    fn relative_paths_follow_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        fs::write(
            &path,
            r#"{ "templates": "tpl", "source": { "kind": "still", "path": "shot.png" } }"#,
        )
        .unwrap();
        let cfg = AppConfig::load_json(&path).unwrap();
        assert_eq!(cfg.templates, dir.path().join("tpl"));
        assert_eq!(
            cfg.source,
            SourceConfig::Still {
                path: dir.path().join("shot.png")
            }
        );
        assert_eq!(cfg.load_profile().unwrap().name, "classic");
    }

    #[test]
    fn missing_still_image_is_reported() {
        let cfg = AppConfig {
            source: SourceConfig::Still {
                path: PathBuf::from("/nonexistent/shot.png"),
            },
            ..AppConfig::default()
        };
        assert!(matches!(cfg.open_source(), Err(ConfigError::Source(_))));
    }
}
