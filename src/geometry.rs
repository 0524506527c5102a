use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub w: f32,
    pub h: f32,
}

impl Size {
    pub fn new(w: f32, h: f32) -> Self {
        Self { w, h }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edges {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Center {
    pub cx: f32,
    pub cy: f32,
}

/// Axis-aligned rectangle in surface units, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_edges(edges: Edges) -> Self {
        Self::new(
            edges.left,
            edges.top,
            edges.right - edges.left,
            edges.bottom - edges.top,
        )
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn edges(&self) -> Edges {
        edges(self)
    }

    pub fn center(&self) -> Center {
        center(self)
    }

    /// Grows the rectangle outward by `amount` on every side.
    pub fn inflate(&self, amount: f32) -> Self {
        Self::new(
            self.x - amount,
            self.y - amount,
            self.w + amount * 2.0,
            self.h + amount * 2.0,
        )
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.w, self.h)
    }
}

pub fn edges(rect: &Rect) -> Edges {
    Edges {
        left: rect.x,
        right: rect.x + rect.w,
        top: rect.y,
        bottom: rect.y + rect.h,
    }
}

pub fn center(rect: &Rect) -> Center {
    Center {
        cx: rect.x + rect.w / 2.0,
        cy: rect.y + rect.h / 2.0,
    }
}

/// Overlap test with both rectangles grown by `margin / 2` on every side.
///
/// Touching edges do not count as overlap, so two rectangles exactly
/// `margin` apart are considered clear of each other.
pub fn intersects(a: &Rect, b: &Rect, margin: f32) -> bool {
    let half = margin / 2.0;
    let a = a.inflate(half);
    let b = b.inflate(half);
    a.x < b.right() && b.x < a.right() && a.y < b.bottom() && b.y < a.bottom()
}
