use crate::document::{Item, LayoutDocument};
use crate::layout::{GuideSet, paint_order};
use crate::theme::Theme;
use anyhow::Result;
use serde_json::Value;
use std::fmt::Write as _;
use std::path::Path;

const MIN_SIDE: f32 = 200.0;
const LABEL_CHARS: usize = 48;
const MAX_GRID_LINES: usize = 1024;

/// What to draw on top of the items.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Draws the canvas grid at twice this spacing, as the builder does.
    pub grid_size: Option<f32>,
    pub guides: GuideSet,
    pub selected: Option<String>,
    /// Items outlined with the fallback stroke, e.g. grid-slot placements.
    pub highlight: Vec<String>,
}

/// Wireframe SVG of a document: grid, items in paint order, guides, selection.
pub fn render_svg(doc: &LayoutDocument, theme: &Theme, options: &RenderOptions) -> String {
    let items = paint_order(doc.items());
    let content_right = items.iter().map(|item| item.rect.right()).fold(0.0, f32::max);
    let content_bottom = items.iter().map(|item| item.rect.bottom()).fold(0.0, f32::max);
    let width = doc.canvas.w.max(content_right).max(MIN_SIDE);
    let height = doc.canvas.h.max(content_bottom).max(MIN_SIDE);

    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    );
    let _ = write!(
        svg,
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    );

    if let Some(grid) = options.grid_size.filter(|grid| *grid > 0.0) {
        svg.push_str(&grid_path(width, height, grid * 2.0, theme));
    }

    for item in &items {
        svg.push_str(&item_svg(item, theme, options.highlight.contains(&item.id)));
    }

    if let Some(selected) = options
        .selected
        .as_deref()
        .and_then(|id| doc.get(id))
    {
        let ring = selected.rect.inflate(3.0);
        let _ = write!(
            svg,
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"10\" ry=\"10\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\"/>",
            ring.x, ring.y, ring.w, ring.h, theme.selection_color
        );
    }

    for x in &options.guides.vertical {
        let _ = write!(
            svg,
            "<line x1=\"{x:.2}\" y1=\"0\" x2=\"{x:.2}\" y2=\"{height}\" stroke=\"{}\" stroke-width=\"1\" stroke-dasharray=\"4 4\"/>",
            theme.guide_color
        );
    }
    for y in &options.guides.horizontal {
        let _ = write!(
            svg,
            "<line x1=\"0\" y1=\"{y:.2}\" x2=\"{width}\" y2=\"{y:.2}\" stroke=\"{}\" stroke-width=\"1\" stroke-dasharray=\"4 4\"/>",
            theme.guide_color
        );
    }

    svg.push_str("</svg>");
    svg
}

fn grid_path(width: f32, height: f32, spacing: f32, theme: &Theme) -> String {
    let mut d = String::new();
    for x in grid_lines(width, spacing) {
        let _ = write!(d, "M{x:.0} 0V{height:.0}");
    }
    for y in grid_lines(height, spacing) {
        let _ = write!(d, "M0 {y:.0}H{width:.0}");
    }
    format!(
        "<path d=\"{d}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1\"/>",
        theme.grid_line
    )
}

/// Line offsets from 0 to `extent`, widening the spacing past `MAX_GRID_LINES`.
fn grid_lines(extent: f32, spacing: f32) -> impl Iterator<Item = f32> {
    let spacing = spacing.max(extent / MAX_GRID_LINES as f32);
    let count = if extent.is_finite() && spacing.is_finite() && spacing > 0.0 {
        ((extent / spacing).floor() as usize).min(MAX_GRID_LINES)
    } else {
        0
    };
    (0..=count).map(move |idx| idx as f32 * spacing)
}

fn item_svg(item: &Item, theme: &Theme, highlight: bool) -> String {
    let r = item.rect;
    let stroke = if highlight {
        theme.fallback_stroke.as_str()
    } else {
        theme.item_stroke.as_str()
    };
    let mut out = String::new();
    let _ = write!(
        out,
        "<g data-id=\"{}\"><rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"8\" ry=\"8\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
        escape_xml(&item.id),
        r.x,
        r.y,
        r.w,
        r.h,
        theme.item_fill,
        stroke
    );
    let _ = write!(
        out,
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"6\" rx=\"3\" ry=\"3\" fill=\"{}\"/>",
        r.x,
        r.y,
        r.w,
        theme.kind_accent(&item.kind)
    );
    let _ = write!(
        out,
        "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" font-weight=\"600\" fill=\"{}\">{}</text>",
        r.x + 12.0,
        r.y + 28.0,
        theme.font_family,
        theme.font_size,
        theme.label_color,
        escape_xml(&item.kind)
    );
    if let Some(summary) = payload_summary(&item.data) {
        let _ = write!(
            out,
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            r.x + 12.0,
            r.y + 50.0,
            theme.font_family,
            theme.font_size - 1.0,
            theme.muted_text_color,
            escape_xml(&summary)
        );
    }
    let _ = write!(
        out,
        "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"11\" fill=\"{}\">z {}  {:.0}×{:.0}</text></g>",
        r.x + 12.0,
        r.bottom() - 10.0,
        theme.font_family,
        theme.muted_text_color,
        item.z,
        r.w,
        r.h
    );
    out
}

/// First line of whatever readable text the payload carries.
fn payload_summary(data: &Value) -> Option<String> {
    let text = match data {
        Value::String(text) => text.as_str(),
        Value::Object(map) => ["title", "text", "content", "prompt", "caption"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))?,
        _ => return None,
    };
    let line = text.lines().map(str::trim).find(|line| !line.is_empty())?;
    if line.chars().count() <= LABEL_CHARS {
        return Some(line.to_string());
    }
    let mut cut: String = line.chars().take(LABEL_CHARS - 1).collect();
    cut.push('…');
    Some(cut)
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, width: f32, height: f32) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Inter".to_string();
    opt.default_size = usvg::Size::from_wh(width, height)
        .or_else(|| usvg::Size::from_wh(1280.0, 800.0))
        .ok_or_else(|| anyhow::anyhow!("Invalid output size {width}x{height}"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::geometry::{Rect, Size};
    use serde_json::json;

    #[test]
    fn render_svg_basic() {
        let doc = LayoutDocument::lesson_template(&EngineConfig::default());
        let svg = render_svg(&doc, &Theme::builder(), &RenderOptions::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("FLASHCARDS"));
        assert!(svg.contains("Lesson Introduction"));
    }

    #[test]
    fn draws_guides_and_selection() {
        let doc = LayoutDocument::with_items(
            Size::new(1280.0, 800.0),
            vec![Item::new("a", "TEXT", Rect::new(40.0, 40.0, 600.0, 260.0))
                .with_data(json!({ "text": "<b>Tides</b>" }))],
        );
        let options = RenderOptions {
            grid_size: Some(20.0),
            guides: GuideSet {
                vertical: vec![40.0],
                horizontal: vec![300.0],
            },
            selected: Some("a".to_string()),
            highlight: Vec::new(),
        };
        let svg = render_svg(&doc, &Theme::builder(), &options);
        assert!(svg.contains("stroke-dasharray=\"4 4\""));
        assert!(svg.contains("&lt;b&gt;Tides&lt;/b&gt;"));
        assert!(svg.contains(&Theme::builder().selection_color));
    }

    #[test]
    fn far_away_item_keeps_grid_bounded() {
        let doc = LayoutDocument::from_json(
            r#"{ "items": [ { "id": "far", "kind": "TEXT", "x": 2000000000, "y": 40, "w": 600, "h": 240 } ] }"#,
            &EngineConfig::default(),
        )
        .unwrap();
        let options = RenderOptions {
            grid_size: Some(20.0),
            ..RenderOptions::default()
        };
        let svg = render_svg(&doc, &Theme::builder(), &options);
        assert!(svg.contains("data-id=\"far\""));
        assert!(svg.matches(" 0V").count() <= MAX_GRID_LINES + 1);
    }

    #[test]
    fn grid_covers_the_canvas_at_normal_sizes() {
        let lines: Vec<f32> = grid_lines(1280.0, 40.0).collect();
        assert_eq!(lines.len(), 33);
        assert_eq!(lines.last().copied(), Some(1280.0));
    }

    #[test]
    fn long_payload_is_truncated() {
        let text = "x".repeat(100);
        let summary = payload_summary(&json!({ "content": text })).unwrap();
        assert_eq!(summary.chars().count(), LABEL_CHARS);
        assert!(summary.ends_with('…'));
    }
}
