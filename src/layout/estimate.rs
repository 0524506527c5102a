//! Card size estimation for the placement planner.
//!
//! The board cannot know a card's rendered size until the host has laid it
//! out. Until then sizes are estimated from payload length, bounded per kind;
//! a host [`Measurer`] supplies the real size for the second placement pass.

use crate::config::{EstimateConfig, PlacementConfig};
use crate::document::Item;
use crate::geometry::Size;
use serde_json::Value;

/// Host capability returning an item's rendered size, if it has one yet.
pub trait Measurer {
    fn measure(&self, item_id: &str) -> Option<Size>;
}

impl<F> Measurer for F
where
    F: Fn(&str) -> Option<Size>,
{
    fn measure(&self, item_id: &str) -> Option<Size> {
        self(item_id)
    }
}

/// A measurer for hosts without a rendering surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMeasurer;

impl Measurer for NoMeasurer {
    fn measure(&self, _item_id: &str) -> Option<Size> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSource {
    Measured,
    Estimated,
}

/// Planner input: one item with the size it should be placed at.
#[derive(Debug, Clone, PartialEq)]
pub struct SizedItem {
    pub id: String,
    pub size: Size,
    pub source: SizeSource,
}

/// Length of the text the card will show, in characters.
pub fn content_length(data: &Value) -> usize {
    match data {
        Value::String(text) => text.chars().count(),
        Value::Object(map) => map
            .get("content")
            .and_then(Value::as_str)
            .map(|text| text.chars().count())
            .unwrap_or(0),
        _ => 0,
    }
}

fn stepped(base: f32, len: usize, chars_per_step: usize, step: f32) -> f32 {
    if chars_per_step == 0 {
        return base;
    }
    base + (len / chars_per_step) as f32 * step
}

pub fn estimate_size(len: usize, expanded: bool, config: &EstimateConfig) -> Size {
    let w = stepped(
        config.min.w,
        len,
        config.chars_per_width_step,
        config.width_step,
    )
    .min(config.max.w)
    .max(config.min.w);
    let h = (stepped(
        config.min.h,
        len,
        config.chars_per_height_step,
        config.height_step,
    ) + config.extra_height)
        .min(config.max.h)
        .max(config.min.h);
    if !expanded {
        return Size::new(w, h);
    }
    Size::new(
        (w * config.expanded_width_scale).min(config.max.w * config.expanded_width_scale),
        (h * config.expanded_height_scale).min(config.max.h * config.expanded_height_scale),
    )
}

pub fn estimate_item(item: &Item, expanded: bool, config: &PlacementConfig) -> Size {
    estimate_size(
        content_length(&item.data),
        expanded,
        config.estimate_for(&item.kind),
    )
}

/// Resolves a size for every item, preferring the host's measurement.
///
/// Measurements that are not positive and finite count as unavailable.
pub fn resolve_sizes<'a, M: Measurer + ?Sized>(
    items: impl IntoIterator<Item = &'a Item>,
    measurer: &M,
    expanded: Option<&str>,
    config: &PlacementConfig,
) -> Vec<SizedItem> {
    items
        .into_iter()
        .map(|item| {
            let measured = measurer
                .measure(&item.id)
                .filter(|size| size.w.is_finite() && size.h.is_finite() && size.w > 0.0 && size.h > 0.0);
            match measured {
                Some(size) => SizedItem {
                    id: item.id.clone(),
                    size,
                    source: SizeSource::Measured,
                },
                None => SizedItem {
                    id: item.id.clone(),
                    size: estimate_item(item, expanded == Some(item.id.as_str()), config),
                    source: SizeSource::Estimated,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use serde_json::json;

    #[test]
    fn short_fact_uses_minimum_plus_band() {
        let size = estimate_size(10, false, &EstimateConfig::fact());
        assert_eq!(size, Size::new(220.0, 230.0));
    }

    #[test]
    fn long_content_is_capped() {
        let fact = estimate_size(5_000, false, &EstimateConfig::fact());
        assert_eq!(fact, Size::new(400.0, 350.0));
        let info = estimate_size(5_000, false, &EstimateConfig::info());
        assert_eq!(info, Size::new(450.0, 380.0));
    }

    #[test]
    fn info_steps_with_length() {
        let size = estimate_size(130, false, &EstimateConfig::info());
        assert_eq!(size, Size::new(306.0, 240.0));
    }

    #[test]
    fn expanded_cards_scale_within_bounds() {
        let info = estimate_size(5_000, true, &EstimateConfig::info());
        assert_eq!(info, Size::new(450.0 * 1.2, 380.0 * 1.3));
        let fact = estimate_size(0, true, &EstimateConfig::fact());
        assert_eq!(fact, Size::new(220.0 * 1.2, 230.0 * 1.2));
    }

    #[test]
    fn measured_sizes_win_over_estimates() {
        let rect = Rect::new(0.0, 0.0, 1.0, 1.0);
        let items = vec![
            Item::new("a", "FACT", rect).with_data(json!({ "content": "short" })),
            Item::new("b", "INFO", rect),
        ];
        let measurer = |id: &str| (id == "a").then(|| Size::new(310.0, 200.0));
        let sizes = resolve_sizes(&items, &measurer, None, &PlacementConfig::default());
        assert_eq!(sizes[0].size, Size::new(310.0, 200.0));
        assert_eq!(sizes[0].source, SizeSource::Measured);
        assert_eq!(sizes[1].source, SizeSource::Estimated);
        assert_eq!(sizes[1].size, Size::new(256.0, 220.0));
    }

    #[test]
    fn content_length_counts_characters() {
        assert_eq!(content_length(&json!({ "content": "héllo" })), 5);
        assert_eq!(content_length(&json!("abc")), 3);
        assert_eq!(content_length(&Value::Null), 0);
    }
}
