//! Widget geometry and the per-breakpoint configuration set.

use crate::breakpoint::Breakpoint;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Geometry of one widget at one breakpoint.
///
/// Serialized with the camelCase field names used by the local cache and the
/// remote store (`zIndex`). Missing fields fall back to [`WidgetConfig::FALLBACK`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetConfig {
    /// Left offset in pixels.
    pub x: f64,
    /// Top offset in pixels.
    pub y: f64,
    /// Width in pixels, at least 1.
    pub width: f64,
    /// Height in pixels, at least 1.
    pub height: f64,
    /// Content scale hint, passed through to the widget.
    pub scale: f64,
    /// Stacking order; higher draws on top.
    pub z_index: i32,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Rotation in degrees around the top-left corner.
    pub rotation: f64,
}

impl WidgetConfig {
    /// Built-in geometry used when a set has neither the active nor the base entry.
    pub const FALLBACK: WidgetConfig = WidgetConfig {
        x: 74.0,
        y: 70.0,
        width: 400.0,
        height: 200.0,
        scale: 1.0,
        z_index: 1,
        opacity: 1.0,
        rotation: 0.0,
    };

    /// Top-left corner.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Content size.
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Content rectangle in page coordinates (rotation ignored).
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position(), self.size())
    }

    /// Copy with a new top-left corner.
    pub fn with_position(mut self, position: Point) -> Self {
        self.x = position.x;
        self.y = position.y;
        self
    }

    /// Replace values that would make the config unusable.
    ///
    /// Non-finite numbers take the fallback value, width and height are floored
    /// at 1, scale must be positive and opacity is clamped to `[0, 1]`.
    pub fn sanitized(mut self) -> Self {
        let fb = Self::FALLBACK;
        let finite_or = |v: f64, default: f64| if v.is_finite() { v } else { default };

        self.x = finite_or(self.x, fb.x);
        self.y = finite_or(self.y, fb.y);
        self.width = finite_or(self.width, fb.width).max(1.0);
        self.height = finite_or(self.height, fb.height).max(1.0);
        self.scale = if self.scale.is_finite() && self.scale > 0.0 {
            self.scale
        } else {
            fb.scale
        };
        self.opacity = finite_or(self.opacity, fb.opacity).clamp(0.0, 1.0);
        self.rotation = finite_or(self.rotation, fb.rotation);
        self
    }

    /// Constrain the config to a viewport.
    ///
    /// `x` ends up in `[margin, viewport.width - width - margin]` and `y`
    /// likewise. When the viewport is too small for the widget the lower bound
    /// wins. Never fails.
    pub fn clamp_to(&self, viewport: Size, margin: f64) -> Self {
        let mut config = self.sanitized();
        config.x = clamp_axis(config.x, config.width, viewport.width, margin);
        config.y = clamp_axis(config.y, config.height, viewport.height, margin);
        config
    }

    /// Stacking order to render with; selected widgets in edit mode float above the rest.
    pub fn effective_z_index(&self, selected: bool, floor: i32) -> i32 {
        if selected {
            self.z_index.max(floor)
        } else {
            self.z_index
        }
    }

    /// Hit area for selection, enlarged and centred for widgets smaller than `min_extent`.
    pub fn selection_bounds(&self, min_extent: f64) -> Rect {
        let width = self.width.max(min_extent);
        let height = self.height.max(min_extent);
        let offset_x = (width - self.width) / 2.0;
        let offset_y = (height - self.height) / 2.0;
        Rect::new(
            self.x - offset_x,
            self.y - offset_y,
            self.x - offset_x + width,
            self.y - offset_y + height,
        )
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Clamp one coordinate so the widget stays inside the viewport minus `margin`.
pub fn clamp_axis(value: f64, extent: f64, viewport_extent: f64, margin: f64) -> f64 {
    let upper = viewport_extent - extent - margin;
    margin.max(value.min(upper))
}

/// Constrain a config to a `viewport_width` × `viewport_height` viewport.
pub fn clamp(config: &WidgetConfig, viewport_width: f64, viewport_height: f64, margin: f64) -> WidgetConfig {
    config.clamp_to(Size::new(viewport_width, viewport_height), margin)
}

/// Config for `breakpoint`, falling back to the base entry and then the built-in fallback.
pub fn resolve(configs: &ConfigSet, breakpoint: Breakpoint) -> WidgetConfig {
    configs.resolve(breakpoint)
}

/// A partial config; `Some` fields override a base config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialWidgetConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

impl PartialWidgetConfig {
    /// Overlay the `Some` fields on `base`.
    pub fn apply_to(&self, base: WidgetConfig) -> WidgetConfig {
        WidgetConfig {
            x: self.x.unwrap_or(base.x),
            y: self.y.unwrap_or(base.y),
            width: self.width.unwrap_or(base.width),
            height: self.height.unwrap_or(base.height),
            scale: self.scale.unwrap_or(base.scale),
            z_index: self.z_index.unwrap_or(base.z_index),
            opacity: self.opacity.unwrap_or(base.opacity),
            rotation: self.rotation.unwrap_or(base.rotation),
        }
    }
}

/// Caller-supplied partial defaults, per breakpoint.
pub type PartialConfigSet = BTreeMap<Breakpoint, PartialWidgetConfig>;

/// The full per-breakpoint geometry table of one widget.
///
/// Always holds an entry for [`Breakpoint::BASE`]; constructors and
/// deserialization synthesize it from [`WidgetConfig::FALLBACK`] when absent.
/// Serialized as a JSON object keyed by internal breakpoint names; unknown keys
/// are dropped on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, WidgetConfig>", into = "BTreeMap<String, WidgetConfig>")]
pub struct ConfigSet {
    entries: BTreeMap<Breakpoint, WidgetConfig>,
}

impl ConfigSet {
    /// A set holding only the base entry.
    pub fn new(base: WidgetConfig) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(Breakpoint::BASE, base);
        Self { entries }
    }

    /// Build from entries, synthesizing the base entry if missing.
    pub fn from_entries(entries: impl IntoIterator<Item = (Breakpoint, WidgetConfig)>) -> Self {
        let mut entries: BTreeMap<_, _> = entries.into_iter().collect();
        entries
            .entry(Breakpoint::BASE)
            .or_insert(WidgetConfig::FALLBACK);
        Self { entries }
    }

    /// Explicit entry for a breakpoint, if any.
    pub fn get(&self, breakpoint: Breakpoint) -> Option<&WidgetConfig> {
        self.entries.get(&breakpoint)
    }

    /// Config to use at `breakpoint`. Never absent.
    pub fn resolve(&self, breakpoint: Breakpoint) -> WidgetConfig {
        self.entries
            .get(&breakpoint)
            .or_else(|| self.entries.get(&Breakpoint::BASE))
            .copied()
            .unwrap_or(WidgetConfig::FALLBACK)
    }

    /// Set the entry for a breakpoint.
    pub fn set(&mut self, breakpoint: Breakpoint, config: WidgetConfig) {
        self.entries.insert(breakpoint, config);
    }

    /// Copy with `config` stored at `breakpoint`.
    pub fn with(mut self, breakpoint: Breakpoint, config: WidgetConfig) -> Self {
        self.set(breakpoint, config);
        self
    }

    /// Overlay entries on this set; the overlaid values win.
    pub fn overlay(&mut self, entries: impl IntoIterator<Item = (Breakpoint, WidgetConfig)>) {
        self.entries.extend(entries);
    }

    /// Whether every breakpoint has an explicit entry.
    pub fn is_complete(&self) -> bool {
        Breakpoint::ALL.iter().all(|bp| self.entries.contains_key(bp))
    }

    /// Number of explicit entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false, the base entry is never removed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in breakpoint order.
    pub fn iter(&self) -> impl Iterator<Item = (Breakpoint, &WidgetConfig)> {
        self.entries.iter().map(|(bp, config)| (*bp, config))
    }

    /// Serialize to the JSON stored in the local cache.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse the JSON stored in the local cache.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for ConfigSet {
    fn default() -> Self {
        Self::new(WidgetConfig::FALLBACK)
    }
}

impl From<BTreeMap<String, WidgetConfig>> for ConfigSet {
    fn from(raw: BTreeMap<String, WidgetConfig>) -> Self {
        let entries = raw.into_iter().filter_map(|(name, config)| match name.parse() {
            Ok(bp) => Some((bp, config.sanitized())),
            Err(_) => {
                log::debug!("Dropping config entry for unknown breakpoint {name:?}");
                None
            }
        });
        Self::from_entries(entries)
    }
}

impl From<ConfigSet> for BTreeMap<String, WidgetConfig> {
    fn from(set: ConfigSet) -> Self {
        set.entries
            .into_iter()
            .map(|(bp, config)| (bp.as_str().to_string(), config))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(x: f64, y: f64, width: f64, height: f64) -> WidgetConfig {
        WidgetConfig {
            x,
            y,
            width,
            height,
            ..WidgetConfig::FALLBACK
        }
    }

    #[test]
    fn test_clamp_keeps_widget_inside_margin() {
        let viewport = Size::new(1000.0, 800.0);
        let margin = 20.0;
        let cases = [
            (-50.0, -50.0),
            (0.0, 0.0),
            (500.0, 300.0),
            (900.0, 700.0),
            (5000.0, 5000.0),
        ];
        for (x, y) in cases {
            let clamped = config(x, y, 200.0, 100.0).clamp_to(viewport, margin);
            assert!(clamped.x >= margin);
            assert!(clamped.x <= viewport.width - 200.0 - margin);
            assert!(clamped.y >= margin);
            assert!(clamped.y <= viewport.height - 100.0 - margin);
        }
    }

    #[test]
    fn test_clamp_leaves_valid_positions_alone() {
        let c = config(120.0, 80.0, 200.0, 100.0);
        assert_eq!(clamp(&c, 1000.0, 800.0, 20.0), c);
    }

    #[test]
    fn test_clamp_tiny_viewport_prefers_margin() {
        let clamped = config(300.0, 300.0, 500.0, 500.0).clamp_to(Size::new(200.0, 200.0), 20.0);
        assert_eq!(clamped.x, 20.0);
        assert_eq!(clamped.y, 20.0);
    }

    #[test]
    fn test_clamp_fixes_opacity_and_size() {
        let mut c = config(50.0, 50.0, 0.0, -5.0);
        c.opacity = 3.5;
        c.scale = -1.0;
        c.x = f64::NAN;
        let clamped = c.clamp_to(Size::new(1000.0, 1000.0), 20.0);
        assert_eq!(clamped.opacity, 1.0);
        assert_eq!(clamped.width, 1.0);
        assert_eq!(clamped.height, 1.0);
        assert_eq!(clamped.scale, 1.0);
        assert_eq!(clamped.x, WidgetConfig::FALLBACK.x);
    }

    #[test]
    fn test_resolve_falls_back_to_base() {
        let base = config(1.0, 2.0, 3.0, 4.0);
        let set = ConfigSet::new(base).with(Breakpoint::Xs, config(9.0, 9.0, 9.0, 9.0));
        assert_eq!(resolve(&set, Breakpoint::Xs).x, 9.0);
        assert_eq!(resolve(&set, Breakpoint::Xxxxl), base);
    }

    #[test]
    fn test_from_entries_synthesizes_base() {
        let set = ConfigSet::from_entries([(Breakpoint::Sm, config(1.0, 1.0, 10.0, 10.0))]);
        assert_eq!(set.get(Breakpoint::Lg), Some(&WidgetConfig::FALLBACK));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_json_uses_internal_names_and_camel_case() {
        let set = ConfigSet::new(WidgetConfig::FALLBACK).with(Breakpoint::Xxl, config(5.0, 6.0, 7.0, 8.0));
        let json = set.to_json().unwrap();
        assert!(json.contains("\"2xl\""));
        assert!(json.contains("\"zIndex\""));
        assert_eq!(ConfigSet::from_json(&json).unwrap(), set);
    }

    #[test]
    fn test_json_missing_fields_and_base() {
        // An old cache entry without opacity and without lg.
        let json = r#"{"3xl":{"x":120,"y":70,"width":400,"height":200,"scale":1,"zIndex":1,"rotation":0},"bogus":{}}"#;
        let set = ConfigSet::from_json(json).unwrap();
        assert_eq!(set.get(Breakpoint::Xxxl).unwrap().opacity, 1.0);
        assert!(set.get(Breakpoint::Lg).is_some());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_effective_z_index_floors_selected() {
        let c = config(0.0, 0.0, 10.0, 10.0);
        assert_eq!(c.effective_z_index(false, 9998), 1);
        assert_eq!(c.effective_z_index(true, 9998), 9998);
    }

    #[test]
    fn test_selection_bounds_enlarges_small_widgets() {
        let bounds = config(100.0, 100.0, 20.0, 80.0).selection_bounds(60.0);
        assert_eq!(bounds.width(), 60.0);
        assert_eq!(bounds.height(), 80.0);
        assert_eq!(bounds.center().x, 110.0);
    }

    #[test]
    fn test_partial_overrides() {
        let partial = PartialWidgetConfig {
            x: Some(5.0),
            z_index: Some(42),
            ..Default::default()
        };
        let merged = partial.apply_to(WidgetConfig::FALLBACK);
        assert_eq!(merged.x, 5.0);
        assert_eq!(merged.z_index, 42);
        assert_eq!(merged.width, WidgetConfig::FALLBACK.width);
    }
}
