use crate::geometry::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Alignment lines that fired during the current session update.
///
/// Purely a rendering hint; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuideSet {
    pub vertical: Vec<f32>,
    pub horizontal: Vec<f32>,
}

impl GuideSet {
    pub fn is_empty(&self) -> bool {
        self.vertical.is_empty() && self.horizontal.is_empty()
    }

    pub(crate) fn push_vertical(&mut self, x: f32) {
        if !self.vertical.contains(&x) {
            self.vertical.push(x);
        }
    }

    pub(crate) fn push_horizontal(&mut self, y: f32) {
        if !self.horizontal.contains(&y) {
            self.horizontal.push(y);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    N,
    S,
    E,
    W,
    Ne,
    Nw,
    Se,
    Sw,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::N,
        ResizeHandle::S,
        ResizeHandle::E,
        ResizeHandle::W,
        ResizeHandle::Ne,
        ResizeHandle::Nw,
        ResizeHandle::Se,
        ResizeHandle::Sw,
    ];

    pub fn moves_top(self) -> bool {
        matches!(self, Self::N | Self::Ne | Self::Nw)
    }

    pub fn moves_bottom(self) -> bool {
        matches!(self, Self::S | Self::Se | Self::Sw)
    }

    pub fn moves_left(self) -> bool {
        matches!(self, Self::W | Self::Nw | Self::Sw)
    }

    pub fn moves_right(self) -> bool {
        matches!(self, Self::E | Self::Ne | Self::Se)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "handle")]
pub enum SessionMode {
    Move,
    Resize(ResizeHandle),
}

/// The single live drag-or-resize interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub item_id: String,
    pub mode: SessionMode,
    pub anchor: Rect,
    pub pointer_start: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlacementOrigin {
    /// Accepted on the given 1-based random attempt.
    Random { attempt: usize },
    /// Deterministic grid slot after every random attempt was rejected.
    Fallback { col: usize, row: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedItem {
    pub id: String,
    pub rect: Rect,
    pub origin: PlacementOrigin,
}

impl PlacedItem {
    pub fn is_random(&self) -> bool {
        matches!(self.origin, PlacementOrigin::Random { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Placement {
    pub items: Vec<PlacedItem>,
    /// Random candidates tried across every item.
    pub trials: usize,
}

impl Placement {
    pub fn get(&self, id: &str) -> Option<&PlacedItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn fallback_count(&self) -> usize {
        self.items.iter().filter(|item| !item.is_random()).count()
    }
}
