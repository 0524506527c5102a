use super::snap::{SnapOptions, SnapResult, snap_move, snap_resize};
use super::types::{GuideSet, Session, SessionMode};
use crate::error::LayoutError;
use crate::geometry::{Point, Rect};

/// Result of feeding one pointer position into the live session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    pub item_id: String,
    pub rect: Rect,
    pub guides: GuideSet,
}

/// `Idle -> Active(move | resize) -> Idle`.
///
/// At most one session exists. While it is live it is the only writer of
/// its item's rect; pointer-up always commits.
#[derive(Debug, Clone, Default)]
pub struct SessionController {
    session: Option<Session>,
    guides: GuideSet,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// True when a live session targets `item_id`.
    pub fn owns(&self, item_id: &str) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.item_id == item_id)
    }

    pub fn guides(&self) -> &GuideSet {
        &self.guides
    }

    pub fn begin(
        &mut self,
        item_id: impl Into<String>,
        mode: SessionMode,
        anchor: Rect,
        pointer: Point,
    ) -> Result<&Session, LayoutError> {
        let item_id = item_id.into();
        if let Some(active) = &self.session {
            tracing::warn!(
                active = %active.item_id,
                requested = %item_id,
                "session: rejected start while another session is live"
            );
            return Err(LayoutError::SessionActive(active.item_id.clone()));
        }
        tracing::debug!(item = %item_id, ?mode, "session: begin");
        self.guides = GuideSet::default();
        let session = self.session.insert(Session {
            item_id,
            mode,
            anchor,
            pointer_start: pointer,
        });
        Ok(&*session)
    }

    /// Converts the pointer position into a snapped rect for the session item.
    ///
    /// `scale` is the host's view zoom; screen deltas are divided by it.
    pub fn update(
        &mut self,
        pointer: Point,
        scale: f32,
        siblings: &[Rect],
        options: &SnapOptions,
    ) -> Result<SessionUpdate, LayoutError> {
        let session = self.session.as_ref().ok_or(LayoutError::NoSession)?;
        let scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        };
        let dx = (pointer.x - session.pointer_start.x) / scale;
        let dy = (pointer.y - session.pointer_start.y) / scale;
        let SnapResult { rect, guides } = match session.mode {
            SessionMode::Move => snap_move(session.anchor, dx, dy, siblings, options),
            SessionMode::Resize(handle) => {
                snap_resize(session.anchor, handle, dx, dy, siblings, options)
            }
        };
        self.guides = guides.clone();
        Ok(SessionUpdate {
            item_id: session.item_id.clone(),
            rect,
            guides,
        })
    }

    /// Ends the live session and clears the guides.
    pub fn end(&mut self) -> Result<Session, LayoutError> {
        let session = self.session.take().ok_or(LayoutError::NoSession)?;
        self.guides = GuideSet::default();
        tracing::debug!(item = %session.item_id, "session: end");
        Ok(session)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    Up,
    Down,
    Left,
    Right,
}

impl Nudge {
    /// Maps DOM-style key names (`ArrowUp`, ...) to a nudge direction.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowUp" => Some(Self::Up),
            "ArrowDown" => Some(Self::Down),
            "ArrowLeft" => Some(Self::Left),
            "ArrowRight" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn apply(self, rect: Rect, step: f32) -> Rect {
        let (dx, dy) = match self {
            Self::Up => (0.0, -step),
            Self::Down => (0.0, step),
            Self::Left => (-step, 0.0),
            Self::Right => (step, 0.0),
        };
        let mut next = rect.translate(dx, dy);
        next.x = next.x.max(0.0);
        next.y = next.y.max(0.0);
        next
    }
}
