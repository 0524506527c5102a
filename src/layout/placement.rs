//! Randomized trial-and-reject placement with a deterministic grid fallback.
//!
//! Each item gets up to `max_attempts` uniformly random candidates inside the
//! container margins. A candidate is accepted when it keeps `min_distance`
//! clear of everything already placed. Items that exhaust their attempts go
//! to a fixed grid slot derived from their index, so planning always
//! terminates. In a container too small for the cards a fallback slot can
//! still overlap an earlier random placement; callers can inspect
//! [`Placement::fallback_count`] to detect it.

use super::estimate::SizedItem;
use super::types::{PlacedItem, Placement, PlacementOrigin};
use crate::config::PlacementConfig;
use crate::geometry::{Rect, Size, intersects};
use rand::Rng;

fn sample_axis<R: Rng + ?Sized>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    if lo.is_finite() && hi.is_finite() && hi > lo {
        rng.random_range(lo..hi)
    } else {
        lo
    }
}

fn fallback_slot(index: usize, size: Size, container: Size, config: &PlacementConfig) -> (Rect, usize, usize) {
    let pitch_x = size.w + config.min_distance;
    let pitch_y = size.h + config.min_distance;
    let cols = if pitch_x > 0.0 {
        ((container.w / pitch_x).floor() as usize).max(1)
    } else {
        1
    };
    let col = index % cols;
    let row = index / cols;
    let rect = Rect::new(
        col as f32 * pitch_x + config.margin,
        row as f32 * pitch_y + config.margin,
        size.w,
        size.h,
    );
    (rect, col, row)
}

/// Places `items` in order inside `container`.
///
/// Uses at most `items.len() * max_attempts` random trials.
pub fn plan<R: Rng + ?Sized>(
    items: &[SizedItem],
    container: Size,
    config: &PlacementConfig,
    rng: &mut R,
) -> Placement {
    let mut placement = Placement::default();
    let mut placed: Vec<Rect> = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let size = item.size;
        let hi_x = container.w - size.w - config.margin;
        let hi_y = container.h - size.h - config.margin;
        let mut accepted = None;
        for attempt in 1..=config.max_attempts {
            placement.trials += 1;
            let candidate = Rect::new(
                sample_axis(rng, config.margin, hi_x),
                sample_axis(rng, config.margin, hi_y),
                size.w,
                size.h,
            );
            let clear = placed
                .iter()
                .all(|other| !intersects(&candidate, other, config.min_distance));
            if clear {
                accepted = Some((candidate, PlacementOrigin::Random { attempt }));
                break;
            }
        }

        let (rect, origin) = match accepted {
            Some(found) => found,
            None => {
                let (rect, col, row) = fallback_slot(index, size, container, config);
                tracing::warn!(
                    item = %item.id,
                    attempts = config.max_attempts,
                    col,
                    row,
                    "placement: random attempts exhausted, using grid slot"
                );
                (rect, PlacementOrigin::Fallback { col, row })
            }
        };
        placed.push(rect);
        placement.items.push(PlacedItem {
            id: item.id.clone(),
            rect,
            origin,
        });
    }

    tracing::debug!(
        items = placement.items.len(),
        trials = placement.trials,
        fallbacks = placement.fallback_count(),
        "placement: planned"
    );
    placement
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::estimate::SizeSource;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn cards(count: usize, size: Size) -> Vec<SizedItem> {
        (0..count)
            .map(|idx| SizedItem {
                id: format!("card-{idx}"),
                size,
                source: SizeSource::Estimated,
            })
            .collect()
    }

    #[test]
    fn roomy_container_places_everything_randomly_without_overlap() {
        let config = PlacementConfig::default();
        let items = cards(6, Size::new(256.0, 220.0));
        let mut rng = StdRng::seed_from_u64(7);
        let placement = plan(&items, Size::new(4000.0, 3000.0), &config, &mut rng);
        assert_eq!(placement.items.len(), 6);
        assert_eq!(placement.fallback_count(), 0);
        for (i, a) in placement.items.iter().enumerate() {
            assert!(a.rect.x >= config.margin && a.rect.y >= config.margin);
            assert!(a.rect.right() <= 4000.0 - config.margin);
            for b in &placement.items[i + 1..] {
                assert!(!intersects(&a.rect, &b.rect, config.min_distance));
            }
        }
    }

    #[test]
    fn unbounded_container_places_at_the_margin() {
        let config = PlacementConfig::default();
        let items = cards(2, Size::new(256.0, 220.0));
        let mut rng = StdRng::seed_from_u64(3);
        let placement = plan(&items, Size::new(f32::INFINITY, f32::NAN), &config, &mut rng);
        assert_eq!(placement.items.len(), 2);
        let first = placement.items[0].rect;
        assert_eq!((first.x, first.y), (config.margin, config.margin));
        assert!(placement.items.iter().all(|item| item.rect.x.is_finite() && item.rect.y.is_finite()));
    }

    #[test]
    fn tiny_container_falls_back_to_grid_slots() {
        let config = PlacementConfig::default();
        let items = cards(3, Size::new(400.0, 300.0));
        let mut rng = StdRng::seed_from_u64(1);
        let placement = plan(&items, Size::new(440.0, 340.0), &config, &mut rng);
        assert_eq!(placement.items[0].origin, PlacementOrigin::Random { attempt: 1 });
        assert_eq!(placement.items[0].rect.origin(), crate::geometry::Point::new(20.0, 20.0));
        assert_eq!(placement.fallback_count(), 2);
        let second = &placement.items[1];
        assert_eq!(second.origin, PlacementOrigin::Fallback { col: 0, row: 1 });
        assert_eq!(second.rect.origin(), crate::geometry::Point::new(20.0, 350.0));
        assert_eq!(placement.trials, 1 + 2 * config.max_attempts);
    }

    #[test]
    fn same_seed_gives_same_arrangement() {
        let config = PlacementConfig::default();
        let items = cards(5, Size::new(300.0, 200.0));
        let container = Size::new(1600.0, 1200.0);
        let first = plan(&items, container, &config, &mut StdRng::seed_from_u64(42));
        let again = plan(&items, container, &config, &mut StdRng::seed_from_u64(42));
        let other = plan(&items, container, &config, &mut StdRng::seed_from_u64(43));
        assert_eq!(first, again);
        assert_ne!(first, other);
    }
}
