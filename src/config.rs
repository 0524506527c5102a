use crate::error::LayoutError;
use crate::geometry::Size;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Grid sizes offered by the canvas toolbar.
pub const GRID_SIZES: [f32; 3] = [10.0, 20.0, 40.0];

const DEFAULT_KIND_SIZES: [(&str, f32, f32); 6] = [
    ("TEXT", 600.0, 240.0),
    ("FLASHCARDS", 600.0, 260.0),
    ("QUIZ", 600.0, 220.0),
    ("CROSSWORD", 600.0, 220.0),
    ("IMAGE", 480.0, 320.0),
    ("VIDEO", 640.0, 360.0),
];

const DEFAULT_REQUIRED_META: [&str; 4] = ["title", "topic", "grade", "visualTheme"];

pub fn validate_grid_size(size: f32) -> Result<f32, LayoutError> {
    if GRID_SIZES.contains(&size) {
        Ok(size)
    } else {
        Err(LayoutError::InvalidGridSize(size))
    }
}

/// How the snap resolver picks between several guide matches on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GuideTieBreak {
    /// Later siblings in insertion order overwrite earlier matches.
    #[default]
    LastMatch,
    /// The match with the smallest distance wins; ties keep the earlier one.
    Nearest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapConfig {
    pub grid_size: f32,
    pub grid_enabled: bool,
    pub guides_enabled: bool,
    pub guide_threshold: f32,
    pub tie_break: GuideTieBreak,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            grid_size: 20.0,
            grid_enabled: true,
            guides_enabled: true,
            guide_threshold: 6.0,
            tie_break: GuideTieBreak::LastMatch,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemConfig {
    pub min_size: Size,
    pub default_size: Size,
    pub kind_sizes: BTreeMap<String, Size>,
    pub spawn_x: f32,
    pub spawn_gap: f32,
    pub duplicate_offset: f32,
    pub nudge_step: f32,
    pub nudge_step_large: f32,
}

impl ItemConfig {
    pub fn default_size_for(&self, kind: &str) -> Size {
        self.kind_sizes
            .get(kind)
            .copied()
            .unwrap_or(self.default_size)
    }
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self {
            min_size: Size::new(240.0, 140.0),
            default_size: Size::new(600.0, 240.0),
            kind_sizes: DEFAULT_KIND_SIZES
                .iter()
                .map(|(kind, w, h)| (kind.to_string(), Size::new(*w, *h)))
                .collect(),
            spawn_x: 40.0,
            spawn_gap: 40.0,
            duplicate_offset: 20.0,
            nudge_step: 1.0,
            nudge_step_large: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    pub design_width: f32,
    pub min_height: f32,
    pub grow_padding: f32,
    pub nudge_padding: f32,
    pub load_padding: f32,
    pub clamp_to_width: bool,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            design_width: 1280.0,
            min_height: 800.0,
            grow_padding: 80.0,
            nudge_padding: 40.0,
            load_padding: 40.0,
            clamp_to_width: true,
        }
    }
}

/// Size estimate constants for one card kind on the discovery board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EstimateConfig {
    pub min: Size,
    pub max: Size,
    pub chars_per_width_step: usize,
    pub width_step: f32,
    pub chars_per_height_step: usize,
    pub height_step: f32,
    pub extra_height: f32,
    pub expanded_width_scale: f32,
    pub expanded_height_scale: f32,
}

impl EstimateConfig {
    pub fn fact() -> Self {
        Self {
            min: Size::new(220.0, 160.0),
            max: Size::new(400.0, 350.0),
            chars_per_width_step: 70,
            width_step: 25.0,
            chars_per_height_step: 100,
            height_step: 25.0,
            extra_height: 70.0,
            expanded_width_scale: 1.2,
            expanded_height_scale: 1.2,
        }
    }

    pub fn info() -> Self {
        Self {
            min: Size::new(256.0, 160.0),
            max: Size::new(450.0, 380.0),
            chars_per_width_step: 60,
            width_step: 25.0,
            chars_per_height_step: 100,
            height_step: 20.0,
            extra_height: 60.0,
            expanded_width_scale: 1.2,
            expanded_height_scale: 1.3,
        }
    }
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self::info()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    pub margin: f32,
    pub min_distance: f32,
    pub max_attempts: usize,
    pub measure_delay_ms: u64,
    pub estimates: BTreeMap<String, EstimateConfig>,
    pub fallback_estimate: EstimateConfig,
}

impl PlacementConfig {
    pub fn estimate_for(&self, kind: &str) -> &EstimateConfig {
        self.estimates.get(kind).unwrap_or(&self.fallback_estimate)
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        let mut estimates = BTreeMap::new();
        estimates.insert("FACT".to_string(), EstimateConfig::fact());
        estimates.insert("INFO".to_string(), EstimateConfig::info());
        Self {
            margin: 20.0,
            min_distance: 30.0,
            max_attempts: 50,
            measure_delay_ms: 100,
            estimates,
            fallback_estimate: EstimateConfig::info(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    pub autosave_delay_ms: u64,
    pub required_meta: Vec<String>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            autosave_delay_ms: 1500,
            required_meta: DEFAULT_REQUIRED_META
                .iter()
                .map(|field| field.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub snap: SnapConfig,
    pub items: ItemConfig,
    pub canvas: CanvasConfig,
    pub placement: PlacementConfig,
    pub persistence: PersistenceConfig,
}

/// Partial configuration as written by hosts and config files.
///
/// Every key is optional; present keys override the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverrides {
    grid_size: Option<f32>,
    snap_enabled: Option<bool>,
    guides_enabled: Option<bool>,
    guide_threshold: Option<f32>,
    guide_tie_break: Option<GuideTieBreak>,
    min_item_size: Option<Size>,
    default_item_size: Option<Size>,
    kind_sizes: Option<BTreeMap<String, Size>>,
    design_width: Option<f32>,
    min_canvas_height: Option<f32>,
    clamp_to_design_width: Option<bool>,
    margin: Option<f32>,
    min_distance: Option<f32>,
    max_attempts: Option<usize>,
    measure_delay_ms: Option<u64>,
    estimates: Option<BTreeMap<String, EstimateConfig>>,
    autosave_delay_ms: Option<u64>,
    required_meta: Option<Vec<String>>,
}

impl ConfigOverrides {
    pub fn apply(self, config: &mut EngineConfig) -> Result<(), LayoutError> {
        if let Some(v) = self.grid_size {
            config.snap.grid_size = validate_grid_size(v)?;
        }
        if let Some(v) = self.snap_enabled {
            config.snap.grid_enabled = v;
        }
        if let Some(v) = self.guides_enabled {
            config.snap.guides_enabled = v;
        }
        if let Some(v) = self.guide_threshold {
            config.snap.guide_threshold = v.max(0.0);
        }
        if let Some(v) = self.guide_tie_break {
            config.snap.tie_break = v;
        }
        if let Some(v) = self.min_item_size {
            config.items.min_size = Size::new(v.w.max(1.0), v.h.max(1.0));
        }
        if let Some(v) = self.default_item_size {
            config.items.default_size = v;
        }
        if let Some(sizes) = self.kind_sizes {
            config.items.kind_sizes.extend(sizes);
        }
        if let Some(v) = self.design_width {
            config.canvas.design_width = v;
        }
        if let Some(v) = self.min_canvas_height {
            config.canvas.min_height = v;
        }
        if let Some(v) = self.clamp_to_design_width {
            config.canvas.clamp_to_width = v;
        }
        if let Some(v) = self.margin {
            config.placement.margin = v;
        }
        if let Some(v) = self.min_distance {
            config.placement.min_distance = v;
        }
        if let Some(v) = self.max_attempts {
            config.placement.max_attempts = v;
        }
        if let Some(v) = self.measure_delay_ms {
            config.placement.measure_delay_ms = v;
        }
        if let Some(estimates) = self.estimates {
            config.placement.estimates.extend(estimates);
        }
        if let Some(v) = self.autosave_delay_ms {
            config.persistence.autosave_delay_ms = v;
        }
        if let Some(v) = self.required_meta {
            config.persistence.required_meta = v;
        }
        Ok(())
    }
}

/// Parses a JSON (or JSON5) config document on top of the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<EngineConfig> {
    let mut config = EngineConfig::default();
    let overrides: ConfigOverrides = json5::from_str(contents)?;
    overrides.apply(&mut config)?;
    Ok(config)
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_builder_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.snap.grid_size, 20.0);
        assert_eq!(config.snap.guide_threshold, 6.0);
        assert_eq!(config.items.min_size, Size::new(240.0, 140.0));
        assert_eq!(config.items.default_size_for("VIDEO"), Size::new(640.0, 360.0));
        assert_eq!(config.items.default_size_for("POLL"), Size::new(600.0, 240.0));
        assert_eq!(config.placement.max_attempts, 50);
        assert_eq!(config.persistence.autosave_delay_ms, 1500);
    }

    #[test]
    fn parses_json5_overrides() {
        let config = parse_config(
            r#"{
                // coarse grid for the projector layout
                gridSize: 40,
                guideThreshold: 8,
                guideTieBreak: "nearest",
                kindSizes: { POLL: { w: 300, h: 200 } },
                requiredMeta: ["title"],
            }"#,
        )
        .unwrap();
        assert_eq!(config.snap.grid_size, 40.0);
        assert_eq!(config.snap.guide_threshold, 8.0);
        assert_eq!(config.snap.tie_break, GuideTieBreak::Nearest);
        assert_eq!(config.items.default_size_for("POLL"), Size::new(300.0, 200.0));
        assert_eq!(config.items.default_size_for("TEXT"), Size::new(600.0, 240.0));
        assert_eq!(config.persistence.required_meta, vec!["title".to_string()]);
    }

    #[test]
    fn rejects_unsupported_grid_size() {
        let err = parse_config(r#"{ "gridSize": 15 }"#).unwrap_err();
        assert!(err.to_string().contains("unsupported grid size"));
    }

    #[test]
    fn estimate_overrides_fill_missing_keys_from_defaults() {
        let config = parse_config(r#"{ "estimates": { "TIP": { "extraHeight": 10 } } }"#).unwrap();
        let tip = config.placement.estimate_for("TIP");
        assert_eq!(tip.extra_height, 10.0);
        assert_eq!(tip.min, Size::new(256.0, 160.0));
        assert_eq!(config.placement.estimate_for("FACT").extra_height, 70.0);
    }
}
