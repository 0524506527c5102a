#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod layout_dump;
pub mod persistence;
pub mod render;
pub mod scheduler;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{EngineConfig, GuideTieBreak, load_config, parse_config};
pub use document::{DocumentRecord, DocumentStatus, Item, ItemPatch, LayoutDocument};
pub use engine::{Action, Engine, EngineEvent, EngineInit, TimedAction};
pub use error::{LayoutError, PersistError};
pub use geometry::{Rect, Size, intersects};
pub use layout::{GuideSet, Measurer, ResizeHandle, ZOrderOp, snap_move, snap_resize};
pub use persistence::{MemoryStore, PersistOptions, PersistSink};
pub use render::render_svg;
pub use theme::Theme;
