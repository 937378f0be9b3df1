//! Per-platform configuration: table color, region layout, color themes and
//! thresholds, loaded from human-editable JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use card_vision_core::{FracRect, HsvRange, RegionError};
use card_vision_match::{MatchParams, SuitColorParams, CLASSIC_RED_RANGES};
use serde::{Deserialize, Serialize};

use crate::gate::{GateParams, MAX_BOARD_CARDS, MAX_HERO_CARDS};
use crate::learner::LearnerParams;

#[derive(thiserror::Error, Debug)]
pub enum ProfileError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("region {name}: {source}")]
    Region {
        name: String,
        #[source]
        source: RegionError,
    },
    #[error("region {name}: {slots} slots, a {role} region holds 1..={max}")]
    Slots {
        name: String,
        role: RegionRole,
        slots: usize,
        max: usize,
    },
    #[error("unknown theme {0:?}")]
    UnknownTheme(String),
    #[error("invalid threshold {name} = {value}")]
    Threshold { name: &'static str, value: f32 },
}

/// Semantic role of a region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionRole {
    HeroCards,
    BoardCards,
    PotText,
    StackText,
    Other,
}

impl RegionRole {
    /// Role implied by a conventional region name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "hero_cards" | "hero" => Self::HeroCards,
            "board_cards" | "board" => Self::BoardCards,
            "pot_text" | "pot" => Self::PotText,
            "stack_text" | "hero_stack" => Self::StackText,
            _ => Self::Other,
        }
    }

    /// Card capacity for card regions.
    pub fn max_cards(self) -> Option<usize> {
        match self {
            Self::HeroCards => Some(MAX_HERO_CARDS),
            Self::BoardCards => Some(MAX_BOARD_CARDS),
            _ => None,
        }
    }

    pub fn is_text(self) -> bool {
        matches!(self, Self::PotText | Self::StackText)
    }
}

impl fmt::Display for RegionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HeroCards => "hero_cards",
            Self::BoardCards => "board_cards",
            Self::PotText => "pot_text",
            Self::StackText => "stack_text",
            Self::Other => "other",
        })
    }
}

/// One region, as fractions of the located table rectangle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// Defaults to the role implied by the region name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RegionRole>,
    /// Number of equal-width card slots; defaults to the role's capacity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<usize>,
}

impl RegionSpec {
    pub fn new(bounds: FracRect, role: RegionRole) -> Self {
        Self {
            x1: bounds.x1,
            y1: bounds.y1,
            x2: bounds.x2,
            y2: bounds.y2,
            role: Some(role),
            slots: None,
        }
    }

    #[inline]
    pub fn bounds(&self) -> FracRect {
        FracRect::new(self.x1, self.y1, self.x2, self.y2)
    }
}

/// A region with its name and resolved role and slot count.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedRegion {
    pub name: String,
    pub role: RegionRole,
    pub bounds: FracRect,
    /// Zero for text and other non-card regions.
    pub slots: usize,
}

/// Felt detection parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableParams {
    pub felt_ranges: Vec<HsvRange>,
    /// Fraction of frame pixels that must be felt for a table to be present.
    pub min_felt_fraction: f32,
    /// A row or column belongs to the table box when at least this fraction
    /// of it is felt.
    pub min_line_fraction: f32,
}

impl Default for TableParams {
    fn default() -> Self {
        Self {
            felt_ranges: vec![HsvRange::new((35, 85), (60, 255), (40, 255))],
            min_felt_fraction: 0.10,
            min_line_fraction: 0.25,
        }
    }
}

fn default_uncertain_band() -> f32 {
    0.5
}

/// Color calibration for one card deck theme.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub red_ranges: Vec<HsvRange>,
    pub red_fraction_threshold: f32,
    #[serde(default = "default_uncertain_band")]
    pub uncertain_band: f32,
    /// Pixels of an empty card face (bright, unsaturated).
    pub card_face: HsvRange,
    /// A slot holds a card when at least this fraction of it is card face.
    pub min_face_fraction: f32,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            red_ranges: CLASSIC_RED_RANGES.to_vec(),
            red_fraction_threshold: 0.03,
            uncertain_band: default_uncertain_band(),
            card_face: HsvRange::new((0, 180), (0, 60), (180, 255)),
            min_face_fraction: 0.35,
        }
    }

    pub fn suit_color_params(&self) -> SuitColorParams {
        SuitColorParams {
            red_ranges: self.red_ranges.clone(),
            red_fraction_threshold: self.red_fraction_threshold,
            uncertain_band: self.uncertain_band,
        }
    }
}

fn default_active_theme() -> String {
    "classic".to_string()
}

/// Everything the table reader needs to know about one poker client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatformProfile {
    pub name: String,
    #[serde(default)]
    pub table: TableParams,
    pub regions: BTreeMap<String, RegionSpec>,
    pub themes: BTreeMap<String, Theme>,
    #[serde(default = "default_active_theme")]
    pub active_theme: String,
    #[serde(default)]
    pub gate: GateParams,
    #[serde(default)]
    pub matching: MatchParams,
    #[serde(default)]
    pub learner: LearnerParams,
}

impl PlatformProfile {
    /// Built-in layout for a classic green-felt client.
    pub fn classic() -> Self {
        let mut regions = BTreeMap::new();
        regions.insert(
            "board_cards".to_string(),
            RegionSpec::new(FracRect::new(0.30, 0.38, 0.70, 0.56), RegionRole::BoardCards),
        );
        regions.insert(
            "hero_cards".to_string(),
            RegionSpec::new(FracRect::new(0.42, 0.68, 0.58, 0.86), RegionRole::HeroCards),
        );
        regions.insert(
            "pot_text".to_string(),
            RegionSpec::new(FracRect::new(0.40, 0.28, 0.60, 0.35), RegionRole::PotText),
        );
        let mut themes = BTreeMap::new();
        themes.insert("classic".to_string(), Theme::classic());

        Self {
            name: "classic".to_string(),
            table: TableParams::default(),
            regions,
            themes,
            active_theme: default_active_theme(),
            gate: GateParams::default(),
            matching: MatchParams::default(),
            learner: LearnerParams::default(),
        }
    }

    /// Load a JSON profile from disk and validate it.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let raw = fs::read_to_string(path)?;
        let profile: Self = serde_json::from_str(&raw)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Write this profile to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ProfileError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn theme(&self) -> Result<&Theme, ProfileError> {
        self.themes
            .get(&self.active_theme)
            .ok_or_else(|| ProfileError::UnknownTheme(self.active_theme.clone()))
    }

    /// Regions with roles and slot counts resolved.
    pub fn named_regions(&self) -> Vec<NamedRegion> {
        self.regions
            .iter()
            .map(|(name, spec)| {
                let role = spec.role.unwrap_or_else(|| RegionRole::from_name(name));
                let slots = match role.max_cards() {
                    Some(max) => spec.slots.unwrap_or(max),
                    None => 0,
                };
                NamedRegion {
                    name: name.clone(),
                    role,
                    bounds: spec.bounds(),
                    slots,
                }
            })
            .collect()
    }

    /// Check region bounds, slot counts, thresholds and the active theme.
    pub fn validate(&self) -> Result<(), ProfileError> {
        for region in self.named_regions() {
            region
                .bounds
                .validate()
                .map_err(|source| ProfileError::Region {
                    name: region.name.clone(),
                    source,
                })?;
            if let Some(max) = region.role.max_cards() {
                if region.slots == 0 || region.slots > max {
                    return Err(ProfileError::Slots {
                        name: region.name,
                        role: region.role,
                        slots: region.slots,
                        max,
                    });
                }
            }
        }

        let theme = self.theme()?;
        let fractions = [
            ("table.min_felt_fraction", self.table.min_felt_fraction),
            ("table.min_line_fraction", self.table.min_line_fraction),
            ("theme.red_fraction_threshold", theme.red_fraction_threshold),
            ("theme.min_face_fraction", theme.min_face_fraction),
            ("gate.accept_threshold", self.gate.accept_threshold),
            ("learner.blend_weight", self.learner.blend_weight),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ProfileError::Threshold { name, value });
            }
        }
        let bootstrap = self.gate.bootstrap_threshold;
        if !bootstrap.is_finite() || bootstrap > self.gate.accept_threshold {
            return Err(ProfileError::Threshold {
                name: "gate.bootstrap_threshold",
                value: bootstrap,
            });
        }
        Ok(())
    }
}
