//! Spatial layout: snap resolution, drag/resize sessions, stacking order and
//! automatic card placement. Everything here works on bounding geometry only;
//! payloads stay opaque.

pub mod estimate;
pub mod placement;
pub mod session;
pub mod snap;
pub(crate) mod types;
pub mod zorder;

pub use estimate::{Measurer, NoMeasurer, SizeSource, SizedItem, estimate_size, resolve_sizes};
pub use placement::plan;
pub use session::{Nudge, SessionController, SessionUpdate};
pub use snap::{SnapOptions, SnapResult, snap_move, snap_resize};
pub use types::*;
pub use zorder::{ZOrderOp, layer_list, paint_order, reorder};
