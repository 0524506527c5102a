// Snap resolution for moves and resizes: alignment guides against sibling
// edges and centers first, grid rounding as the per-axis fallback.

use super::types::{GuideSet, ResizeHandle};
use crate::config::{EngineConfig, GuideTieBreak};
use crate::geometry::{Rect, Size};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapOptions {
    pub grid_size: f32,
    pub grid_enabled: bool,
    pub guides_enabled: bool,
    pub threshold: f32,
    pub tie_break: GuideTieBreak,
    pub min_size: Size,
    /// Right boundary of the design surface, if moves and resizes are clamped to it.
    pub max_right: Option<f32>,
}

impl SnapOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            grid_size: config.snap.grid_size,
            grid_enabled: config.snap.grid_enabled,
            guides_enabled: config.snap.guides_enabled,
            threshold: config.snap.guide_threshold,
            tie_break: config.snap.tie_break,
            min_size: config.items.min_size,
            max_right: config
                .canvas
                .clamp_to_width
                .then_some(config.canvas.design_width),
        }
    }
}

impl Default for SnapOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapResult {
    pub rect: Rect,
    pub guides: GuideSet,
}

struct AxisHit {
    origin: f32,
    distance: f32,
    line: f32,
}

struct AxisSnap {
    origin: f32,
    lines: Vec<f32>,
}

/// Matches candidate anchors against sibling lines on one axis.
///
/// `anchors` holds `(position, offset)` pairs where `offset` is the anchor's
/// distance from the rectangle origin. `lines` holds three lines per sibling
/// (near edge, far edge, center) in sibling order.
fn snap_axis(
    anchors: &[(f32, f32)],
    lines: &[f32],
    threshold: f32,
    tie_break: GuideTieBreak,
) -> Option<AxisSnap> {
    let mut best: Option<AxisHit> = None;
    let mut matched = Vec::new();
    for sibling in lines.chunks(3) {
        for &(position, offset) in anchors {
            for &line in sibling {
                let distance = (position - line).abs();
                if distance > threshold {
                    continue;
                }
                let hit = AxisHit {
                    origin: line - offset,
                    distance,
                    line,
                };
                let replace = match (&best, tie_break) {
                    (None, _) => true,
                    (Some(_), GuideTieBreak::LastMatch) => true,
                    (Some(current), GuideTieBreak::Nearest) => hit.distance < current.distance,
                };
                matched.push(line);
                if replace {
                    best = Some(hit);
                }
            }
        }
    }
    let best = best?;
    let lines = match tie_break {
        GuideTieBreak::LastMatch => matched,
        GuideTieBreak::Nearest => vec![best.line],
    };
    Some(AxisSnap {
        origin: best.origin,
        lines,
    })
}

fn vertical_lines(siblings: &[Rect]) -> Vec<f32> {
    siblings
        .iter()
        .flat_map(|r| [r.x, r.right(), r.center().cx])
        .collect()
}

fn horizontal_lines(siblings: &[Rect]) -> Vec<f32> {
    siblings
        .iter()
        .flat_map(|r| [r.y, r.bottom(), r.center().cy])
        .collect()
}

fn round_to_grid(value: f32, grid: f32) -> f32 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid).round() * grid
}

/// Grid rounding that stays at or below `upper` by stepping one cell back.
fn round_to_grid_within(value: f32, grid: f32, upper: Option<f32>) -> f32 {
    let mut snapped = round_to_grid(value, grid);
    if let Some(upper) = upper {
        if snapped > upper {
            snapped -= grid;
        }
    }
    snapped.max(0.0)
}

/// Resolves a move of `anchor` by the raw pointer delta.
///
/// Width and height never change and the origin never goes negative.
pub fn snap_move(
    anchor: Rect,
    dx: f32,
    dy: f32,
    siblings: &[Rect],
    options: &SnapOptions,
) -> SnapResult {
    let mut rect = anchor.translate(dx, dy);
    rect.x = rect.x.max(0.0);
    rect.y = rect.y.max(0.0);
    let mut guides = GuideSet::default();
    let mut guided_x = false;
    let mut guided_y = false;

    if options.guides_enabled && !siblings.is_empty() {
        let x_anchors = [
            (rect.x, 0.0),
            (rect.right(), rect.w),
            (rect.center().cx, rect.w / 2.0),
        ];
        if let Some(hit) = snap_axis(
            &x_anchors,
            &vertical_lines(siblings),
            options.threshold,
            options.tie_break,
        ) {
            rect.x = hit.origin;
            hit.lines.into_iter().for_each(|x| guides.push_vertical(x));
            guided_x = true;
        }
        let y_anchors = [
            (rect.y, 0.0),
            (rect.bottom(), rect.h),
            (rect.center().cy, rect.h / 2.0),
        ];
        if let Some(hit) = snap_axis(
            &y_anchors,
            &horizontal_lines(siblings),
            options.threshold,
            options.tie_break,
        ) {
            rect.y = hit.origin;
            hit.lines.into_iter().for_each(|y| guides.push_horizontal(y));
            guided_y = true;
        }
    }

    let upper_x = options.max_right.map(|right| right - rect.w);
    rect.x = rect.x.max(0.0);
    rect.y = rect.y.max(0.0);
    if let Some(upper) = upper_x {
        rect.x = rect.x.min(upper).max(0.0);
    }
    if options.grid_enabled {
        if !guided_x {
            rect.x = round_to_grid_within(rect.x, options.grid_size, upper_x);
        }
        if !guided_y {
            rect.y = round_to_grid_within(rect.y, options.grid_size, None);
        }
    }

    SnapResult { rect, guides }
}

/// Resolves a resize by one of the eight handles.
///
/// Only the edges the handle moves are snapped; the opposite edges stay at
/// their anchor values and the result never drops below the minimum size.
pub fn snap_resize(
    anchor: Rect,
    handle: ResizeHandle,
    dx: f32,
    dy: f32,
    siblings: &[Rect],
    options: &SnapOptions,
) -> SnapResult {
    let start = anchor.edges();
    let mut left = start.left;
    let mut right = start.right;
    let mut top = start.top;
    let mut bottom = start.bottom;
    if handle.moves_left() {
        left += dx;
    }
    if handle.moves_right() {
        right += dx;
    }
    if handle.moves_top() {
        top += dy;
    }
    if handle.moves_bottom() {
        bottom += dy;
    }

    let mut guides = GuideSet::default();
    let mut guided = [false; 4];
    if options.guides_enabled && !siblings.is_empty() {
        let xs = vertical_lines(siblings);
        let ys = horizontal_lines(siblings);
        let edges: [(bool, &mut f32, &[f32], bool); 4] = [
            (handle.moves_left(), &mut left, xs.as_slice(), true),
            (handle.moves_right(), &mut right, xs.as_slice(), true),
            (handle.moves_top(), &mut top, ys.as_slice(), false),
            (handle.moves_bottom(), &mut bottom, ys.as_slice(), false),
        ];
        for (idx, (moves, edge, lines, vertical)) in edges.into_iter().enumerate() {
            if !moves {
                continue;
            }
            if let Some(hit) = snap_axis(&[(*edge, 0.0)], lines, options.threshold, options.tie_break) {
                *edge = hit.origin;
                for line in hit.lines {
                    if vertical {
                        guides.push_vertical(line);
                    } else {
                        guides.push_horizontal(line);
                    }
                }
                guided[idx] = true;
            }
        }
    }

    if options.grid_enabled {
        let grid = options.grid_size;
        if handle.moves_left() && !guided[0] {
            left = round_to_grid(left, grid);
        }
        if handle.moves_right() && !guided[1] {
            right = round_to_grid(right, grid);
        }
        if handle.moves_top() && !guided[2] {
            top = round_to_grid(top, grid);
        }
        if handle.moves_bottom() && !guided[3] {
            bottom = round_to_grid(bottom, grid);
        }
    }

    if handle.moves_left() {
        left = left.max(0.0);
    }
    if handle.moves_top() {
        top = top.max(0.0);
    }
    if let (Some(max_right), true) = (options.max_right, handle.moves_right()) {
        right = right.min(max_right);
    }

    let min = options.min_size;
    let w = (right - left).max(min.w);
    let h = (bottom - top).max(min.h);
    let x = if handle.moves_left() { right - w } else { left };
    let y = if handle.moves_top() { bottom - h } else { top };

    SnapResult {
        rect: Rect::new(x, y, w, h),
        guides,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SnapOptions {
        SnapOptions {
            max_right: None,
            ..SnapOptions::default()
        }
    }

    #[test]
    fn aligns_to_sibling_edges_instead_of_grid() {
        let a = Rect::new(40.0, 40.0, 600.0, 260.0);
        let b = Rect::new(0.0, 0.0, 600.0, 240.0);
        let result = snap_move(b, 38.0, 298.0, &[a], &options());
        assert_eq!(result.rect, Rect::new(40.0, 300.0, 600.0, 240.0));
        assert!(result.guides.vertical.contains(&40.0));
        assert_eq!(result.guides.horizontal, vec![300.0]);
    }

    #[test]
    fn falls_back_to_grid_without_guides() {
        let a = Rect::new(40.0, 40.0, 600.0, 260.0);
        let b = Rect::new(0.0, 0.0, 300.0, 200.0);
        let result = snap_move(b, 712.0, 513.0, &[a], &options());
        assert_eq!(result.rect.x, 720.0);
        assert_eq!(result.rect.y, 520.0);
        assert!(result.guides.is_empty());
    }

    #[test]
    fn move_never_goes_negative() {
        let b = Rect::new(10.0, 10.0, 300.0, 200.0);
        let result = snap_move(b, -500.0, -37.0, &[], &options());
        assert_eq!(result.rect, Rect::new(0.0, 0.0, 300.0, 200.0));
    }

    #[test]
    fn move_clamps_to_design_width_on_grid() {
        let mut opts = options();
        opts.max_right = Some(1280.0);
        let b = Rect::new(0.0, 0.0, 610.0, 200.0);
        let result = snap_move(b, 900.0, 0.0, &[], &opts);
        assert!(result.rect.right() <= 1280.0);
        assert_eq!(result.rect.x % 20.0, 0.0);
    }

    #[test]
    fn last_match_wins_by_default() {
        let first = Rect::new(100.0, 500.0, 300.0, 100.0);
        let second = Rect::new(104.0, 800.0, 300.0, 100.0);
        let moving = Rect::new(0.0, 0.0, 300.0, 150.0);
        let mut opts = options();
        opts.grid_enabled = false;
        let result = snap_move(moving, 101.0, 0.0, &[first, second], &opts);
        assert_eq!(result.rect.x, 104.0);
        assert!(result.guides.vertical.contains(&100.0));
        assert!(result.guides.vertical.contains(&104.0));
    }

    #[test]
    fn nearest_tie_break_picks_closest_line() {
        let first = Rect::new(100.0, 500.0, 300.0, 100.0);
        let second = Rect::new(104.0, 800.0, 300.0, 100.0);
        let moving = Rect::new(0.0, 0.0, 300.0, 150.0);
        let mut opts = options();
        opts.grid_enabled = false;
        opts.tie_break = GuideTieBreak::Nearest;
        let result = snap_move(moving, 101.0, 0.0, &[first, second], &opts);
        assert_eq!(result.rect.x, 100.0);
        assert_eq!(result.guides.vertical, vec![100.0]);
    }

    #[test]
    fn resize_east_snaps_right_edge_to_sibling() {
        let sibling = Rect::new(700.0, 0.0, 300.0, 200.0);
        let item = Rect::new(40.0, 300.0, 600.0, 240.0);
        let result = snap_resize(item, ResizeHandle::E, 63.0, 0.0, &[sibling], &options());
        assert_eq!(result.rect, Rect::new(40.0, 300.0, 660.0, 240.0));
        assert_eq!(result.guides.vertical, vec![700.0]);
    }

    #[test]
    fn resize_west_keeps_right_edge_anchored_at_minimum() {
        let item = Rect::new(100.0, 100.0, 300.0, 200.0);
        let result = snap_resize(item, ResizeHandle::W, 250.0, 0.0, &[], &options());
        assert_eq!(result.rect.w, 240.0);
        assert_eq!(result.rect.right(), 400.0);
    }

    #[test]
    fn resize_north_west_floors_both_axes() {
        let item = Rect::new(100.0, 100.0, 300.0, 200.0);
        let result = snap_resize(item, ResizeHandle::Nw, 500.0, 500.0, &[], &options());
        assert_eq!(result.rect.w, 240.0);
        assert_eq!(result.rect.h, 140.0);
        assert_eq!(result.rect.right(), 400.0);
        assert_eq!(result.rect.bottom(), 300.0);
    }

    #[test]
    fn resize_south_rounds_bottom_edge_to_grid() {
        let item = Rect::new(40.0, 40.0, 600.0, 240.0);
        let result = snap_resize(item, ResizeHandle::S, 0.0, 47.0, &[], &options());
        assert_eq!(result.rect.bottom(), 320.0);
        assert_eq!(result.rect.w, 600.0);
    }
}
