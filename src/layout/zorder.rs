use crate::document::Item;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZOrderOp {
    Forward,
    Backward,
    ToFront,
    ToBack,
}

/// New stacking index for `target` after applying `op`.
///
/// Values are never compacted; they may go negative and leave gaps.
pub fn reorder<'a>(
    items: impl IntoIterator<Item = &'a Item>,
    target: &str,
    op: ZOrderOp,
) -> Option<i64> {
    let mut current = None;
    let mut max = i64::MIN;
    let mut min = i64::MAX;
    for item in items {
        if item.id == target {
            current = Some(item.z);
        }
        max = max.max(item.z);
        min = min.min(item.z);
    }
    let z = current?;
    Some(match op {
        ZOrderOp::Forward => z.saturating_add(1),
        ZOrderOp::Backward => z.saturating_sub(1),
        ZOrderOp::ToFront => max.saturating_add(1),
        ZOrderOp::ToBack => min.saturating_sub(1),
    })
}

/// Items sorted by z ascending; ties keep insertion order.
pub fn paint_order<'a>(items: impl IntoIterator<Item = &'a Item>) -> Vec<&'a Item> {
    let mut ordered: Vec<&Item> = items.into_iter().collect();
    ordered.sort_by_key(|item| item.z);
    ordered
}

/// Topmost first, for the inspector's layer panel.
pub fn layer_list<'a>(items: impl IntoIterator<Item = &'a Item>) -> Vec<&'a Item> {
    let mut ordered = paint_order(items);
    ordered.reverse();
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn items() -> Vec<Item> {
        let rect = Rect::new(0.0, 0.0, 300.0, 200.0);
        vec![
            Item::new("a", "TEXT", rect).with_z(1),
            Item::new("b", "TEXT", rect).with_z(4),
            Item::new("c", "TEXT", rect).with_z(-2),
            Item::new("d", "TEXT", rect).with_z(1),
        ]
    }

    #[test]
    fn steps_forward_and_backward() {
        let items = items();
        assert_eq!(reorder(&items, "a", ZOrderOp::Forward), Some(2));
        assert_eq!(reorder(&items, "a", ZOrderOp::Backward), Some(0));
    }

    #[test]
    fn front_and_back_use_extremes() {
        let items = items();
        assert_eq!(reorder(&items, "a", ZOrderOp::ToFront), Some(5));
        assert_eq!(reorder(&items, "a", ZOrderOp::ToBack), Some(-3));
        assert_eq!(reorder(&items, "missing", ZOrderOp::ToFront), None);
    }

    #[test]
    fn paint_order_is_stable_on_ties() {
        let items = items();
        let ids: Vec<&str> = paint_order(&items).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "d", "b"]);
        let layers: Vec<&str> = layer_list(&items).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(layers, vec!["b", "d", "a", "c"]);
    }
}
