use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use keyplace_core::Point;
use keyplace_export::svg::SvgOptions;
use keyplace_pcb::{DEFAULT_PITCH_MM, PlacementOptions, ReferenceScheme, SortMode};
use serde::Deserialize;

/// Defaults loaded from `--config`. Command line flags win over these.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub render: SvgOptions,
    pub placement: PlacementSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlacementSettings {
    pub sort: SortMode,
    pub references: ReferenceScheme,
    pub pitch_mm: f64,
    pub origin_mm: [f64; 2],
    pub delay_ms: u64,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            sort: SortMode::default(),
            references: ReferenceScheme::default(),
            pitch_mm: DEFAULT_PITCH_MM,
            origin_mm: [0.0, 0.0],
            delay_ms: 0,
        }
    }
}

impl PlacementSettings {
    pub fn to_options(&self) -> PlacementOptions {
        PlacementOptions {
            sort: self.sort,
            references: self.references.clone(),
            pitch_mm: self.pitch_mm,
            origin_mm: Point::new(self.origin_mm[0], self.origin_mm[1]),
            delay: Duration::from_millis(self.delay_ms),
        }
    }
}

pub fn load(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("could not read config {}", path.display()))?;
    parse(&raw).with_context(|| format!("invalid config {}", path.display()))
}

fn parse(raw: &str) -> Result<Settings> {
    if raw.trim().is_empty() {
        return Ok(Settings::default());
    }
    Ok(serde_yaml::from_str(raw)?)
}
