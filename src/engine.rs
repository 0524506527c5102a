//! Reducer-style engine: `(state, action, now) -> events`.
//!
//! The engine combines the document controller, the drag/resize session,
//! selection and the automatic placement deferral behind one `dispatch`
//! entry point. Hosts feed it pointer and keyboard actions with their current
//! time in milliseconds and render from the events it returns.

use crate::config::{ConfigOverrides, EngineConfig, validate_grid_size};
use crate::document::{Item, ItemPatch, LayoutDocument, RawDocument, RawItem, new_item_id};
use crate::error::LayoutError;
use crate::geometry::{Point, Rect, Size};
use crate::layout::{
    GuideSet, Measurer, NoMeasurer, Nudge, Placement, ResizeHandle, SessionController, SessionMode,
    SizedItem, SnapOptions, ZOrderOp, layer_list, paint_order, plan, reorder, resolve_sizes,
};
use crate::persistence::{DocumentController, PersistSink, WriteSource};
use crate::scheduler::Task;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

pub const MIN_VIEW_SCALE: f32 = 0.5;
pub const MAX_VIEW_SCALE: f32 = 1.5;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    PointerDown {
        item_id: String,
        #[serde(default)]
        handle: Option<ResizeHandle>,
        x: f32,
        y: f32,
    },
    PointerMove {
        x: f32,
        y: f32,
    },
    PointerUp,
    Key {
        key: String,
        #[serde(default)]
        shift: bool,
    },
    Select {
        #[serde(default)]
        item_id: Option<String>,
    },
    Activate {
        #[serde(default)]
        item_id: Option<String>,
    },
    AddItem {
        kind: String,
    },
    DuplicateItem {
        item_id: String,
    },
    DeleteItem {
        item_id: String,
    },
    UpdatePayload {
        item_id: String,
        data: Value,
    },
    Reorder {
        item_id: String,
        op: ZOrderOp,
    },
    SetMeta {
        meta: Map<String, Value>,
    },
    SetGridSize {
        size: f32,
    },
    SetSnap {
        #[serde(default)]
        grid: Option<bool>,
        #[serde(default)]
        guides: Option<bool>,
    },
    SetViewScale {
        scale: f32,
    },
    OpenSettings,
    CloseSettings,
    Arrange {
        width: f32,
        height: f32,
    },
    Save,
    Publish,
    Tick,
}

/// An action stamped with the host time it happened at.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimedAction {
    #[serde(default)]
    pub at: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EngineEvent {
    /// All items in paint order after a geometry, z or payload change.
    ItemsChanged { items: Vec<Item> },
    GuidesChanged { guides: GuideSet },
    SelectionChanged { item_id: Option<String> },
    CanvasResized { width: f32, height: f32 },
    /// The host should confirm, then send `deleteItem`.
    ConfirmDelete { item_id: String },
    Persisted { id: String, explicit: bool },
    Published { id: String },
}

/// Initialization input from an embedding host.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineInit {
    pub items: Vec<RawItem>,
    pub container_size: Size,
    pub config: ConfigOverrides,
}

impl EngineInit {
    /// Resolves the configuration and builds the initial document.
    pub fn into_document(self) -> Result<(LayoutDocument, Size, EngineConfig), LayoutError> {
        let mut config = EngineConfig::default();
        self.config.apply(&mut config)?;
        let raw = RawDocument {
            items: self.items,
            ..Default::default()
        };
        let doc = LayoutDocument::from_raw(raw, &config);
        Ok((doc, self.container_size, config))
    }
}

pub struct Engine<S, M = NoMeasurer> {
    config: EngineConfig,
    docs: DocumentController<S>,
    sessions: SessionController,
    measurer: M,
    rng: StdRng,
    selected: Option<String>,
    active: Option<String>,
    view_scale: f32,
    container: Size,
    last_placement: Option<Placement>,
}

impl<S: PersistSink> Engine<S, NoMeasurer> {
    pub fn new(doc: LayoutDocument, config: EngineConfig, sink: S) -> Self {
        Self::with_measurer(doc, config, sink, NoMeasurer)
    }
}

impl<S: PersistSink, M: Measurer> Engine<S, M> {
    pub fn with_measurer(doc: LayoutDocument, config: EngineConfig, sink: S, measurer: M) -> Self {
        let container = doc.canvas;
        Self {
            docs: DocumentController::new(doc, sink, &config),
            config,
            sessions: SessionController::new(),
            measurer,
            rng: StdRng::from_os_rng(),
            selected: None,
            active: None,
            view_scale: 1.0,
            container,
            last_placement: None,
        }
    }

    pub fn from_init(init: EngineInit, sink: S, measurer: M) -> Result<Self, LayoutError> {
        let (doc, container, config) = init.into_document()?;
        let mut engine = Self::with_measurer(doc, config, sink, measurer);
        if container.w > 0.0 && container.h > 0.0 {
            engine.container = container;
        }
        Ok(engine)
    }

    /// Replaces the random stream used by placement, for reproducible arrangements.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn document(&self) -> &LayoutDocument {
        self.docs.document()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        self.docs.sink()
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.docs.sink_mut()
    }

    pub fn into_parts(self) -> (LayoutDocument, S) {
        self.docs.into_parts()
    }

    /// Hosts that measure rendered cards update sizes through this.
    pub fn measurer_mut(&mut self) -> &mut M {
        &mut self.measurer
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn guides(&self) -> &GuideSet {
        self.sessions.guides()
    }

    pub fn session_active(&self) -> bool {
        self.sessions.is_active()
    }

    pub fn view_scale(&self) -> f32 {
        self.view_scale
    }

    pub fn settings_open(&self) -> bool {
        self.docs.settings_open()
    }

    /// Host time at which the next `tick` has work to do.
    pub fn next_due(&self) -> Option<u64> {
        self.docs.scheduler().next_due()
    }

    /// Most recent automatic placement pass, if any ran.
    pub fn last_placement(&self) -> Option<&Placement> {
        self.last_placement.as_ref()
    }

    pub fn paint_order(&self) -> Vec<&Item> {
        paint_order(self.document().items())
    }

    pub fn layers(&self) -> Vec<&Item> {
        layer_list(self.document().items())
    }

    pub fn dispatch(&mut self, action: Action, now_ms: u64) -> Result<Vec<EngineEvent>, LayoutError> {
        match action {
            Action::PointerDown { item_id, handle, x, y } => {
                self.pointer_down(&item_id, handle, Point::new(x, y))
            }
            Action::PointerMove { x, y } => self.pointer_move(Point::new(x, y), now_ms),
            Action::PointerUp => self.pointer_up(),
            Action::Key { key, shift } => self.key(&key, shift, now_ms),
            Action::Select { item_id } => self.select(item_id),
            Action::Activate { item_id } => {
                if let Some(id) = &item_id {
                    self.require(id)?;
                }
                self.active = item_id;
                Ok(Vec::new())
            }
            Action::AddItem { kind } => self.add_item(&kind, now_ms),
            Action::DuplicateItem { item_id } => self.duplicate_item(&item_id, now_ms),
            Action::DeleteItem { item_id } => self.delete_item(&item_id, now_ms),
            Action::UpdatePayload { item_id, data } => {
                self.docs
                    .mutate(&item_id, ItemPatch::data(data), WriteSource::Other, now_ms)?;
                Ok(vec![self.items_changed()])
            }
            Action::Reorder { item_id, op } => self.reorder(&item_id, op, now_ms),
            Action::SetMeta { meta } => {
                self.docs.set_meta(meta, now_ms);
                Ok(Vec::new())
            }
            Action::SetGridSize { size } => {
                self.config.snap.grid_size = validate_grid_size(size)?;
                Ok(Vec::new())
            }
            Action::SetSnap { grid, guides } => {
                if let Some(grid) = grid {
                    self.config.snap.grid_enabled = grid;
                }
                if let Some(guides) = guides {
                    self.config.snap.guides_enabled = guides;
                }
                Ok(Vec::new())
            }
            Action::SetViewScale { scale } => {
                if scale.is_finite() {
                    self.view_scale = scale.clamp(MIN_VIEW_SCALE, MAX_VIEW_SCALE);
                }
                Ok(Vec::new())
            }
            Action::OpenSettings => {
                self.docs.open_settings();
                Ok(Vec::new())
            }
            Action::CloseSettings => {
                self.docs.close_settings(now_ms);
                Ok(Vec::new())
            }
            Action::Arrange { width, height } => self.arrange(Size::new(width, height), now_ms),
            Action::Save => self.save(),
            Action::Publish => self.publish(),
            Action::Tick => Ok(self.tick(now_ms)),
        }
    }

    fn require(&self, item_id: &str) -> Result<&Item, LayoutError> {
        self.document()
            .get(item_id)
            .ok_or_else(|| LayoutError::UnknownItem(item_id.to_string()))
    }

    fn items_changed(&self) -> EngineEvent {
        EngineEvent::ItemsChanged {
            items: self.paint_order().into_iter().cloned().collect(),
        }
    }

    fn set_selection(&mut self, item_id: Option<String>, events: &mut Vec<EngineEvent>) {
        if self.selected != item_id {
            self.selected = item_id.clone();
            events.push(EngineEvent::SelectionChanged { item_id });
        }
    }

    fn canvas_event(&self) -> EngineEvent {
        let canvas = self.document().canvas;
        EngineEvent::CanvasResized {
            width: canvas.w,
            height: canvas.h,
        }
    }

    /// Grows the canvas after a drag, add or duplicate pushed `bottom` past it.
    fn grow_for_bottom(&mut self, bottom: f32) -> Option<EngineEvent> {
        if bottom <= self.document().canvas.h {
            return None;
        }
        let grid = self.config.snap.grid_size.max(1.0);
        let height = ((bottom + self.config.canvas.grow_padding) / grid).ceil() * grid;
        self.docs
            .grow_canvas(height)
            .then(|| self.canvas_event())
    }

    fn snap_options(&self) -> SnapOptions {
        SnapOptions::from_config(&self.config)
    }

    fn pointer_down(
        &mut self,
        item_id: &str,
        handle: Option<ResizeHandle>,
        pointer: Point,
    ) -> Result<Vec<EngineEvent>, LayoutError> {
        let anchor = self.require(item_id)?.rect;
        let mode = match handle {
            Some(handle) => SessionMode::Resize(handle),
            None => SessionMode::Move,
        };
        self.sessions.begin(item_id, mode, anchor, pointer)?;
        self.docs.lock(item_id);
        let mut events = Vec::new();
        self.set_selection(Some(item_id.to_string()), &mut events);
        Ok(events)
    }

    fn pointer_move(&mut self, pointer: Point, now_ms: u64) -> Result<Vec<EngineEvent>, LayoutError> {
        let owner = self
            .sessions
            .session()
            .map(|session| session.item_id.clone())
            .ok_or(LayoutError::NoSession)?;
        let siblings: Vec<Rect> = self
            .document()
            .items()
            .filter(|item| item.id != owner)
            .map(|item| item.rect)
            .collect();
        let options = self.snap_options();
        let update = self
            .sessions
            .update(pointer, self.view_scale, &siblings, &options)?;
        self.docs.mutate(
            &update.item_id,
            ItemPatch::rect(update.rect),
            WriteSource::Session,
            now_ms,
        )?;
        let mut events = vec![
            self.items_changed(),
            EngineEvent::GuidesChanged {
                guides: update.guides,
            },
        ];
        events.extend(self.grow_for_bottom(update.rect.bottom()));
        Ok(events)
    }

    fn pointer_up(&mut self) -> Result<Vec<EngineEvent>, LayoutError> {
        self.sessions.end()?;
        self.docs.unlock();
        Ok(vec![EngineEvent::GuidesChanged {
            guides: GuideSet::default(),
        }])
    }

    fn key(&mut self, key: &str, shift: bool, now_ms: u64) -> Result<Vec<EngineEvent>, LayoutError> {
        if self.sessions.is_active() || self.active.is_some() {
            return Ok(Vec::new());
        }
        let Some(selected) = self.selected.clone() else {
            return Ok(Vec::new());
        };
        if matches!(key, "Delete" | "Backspace") {
            return Ok(vec![EngineEvent::ConfirmDelete { item_id: selected }]);
        }
        let Some(nudge) = Nudge::from_key(key) else {
            return Ok(Vec::new());
        };
        let step = if shift {
            self.config.items.nudge_step_large
        } else {
            self.config.items.nudge_step
        };
        let rect = nudge.apply(self.require(&selected)?.rect, step);
        self.docs
            .mutate(&selected, ItemPatch::rect(rect), WriteSource::Other, now_ms)?;
        let mut events = vec![self.items_changed()];
        if self
            .docs
            .grow_canvas(rect.bottom() + self.config.canvas.nudge_padding)
        {
            events.push(self.canvas_event());
        }
        Ok(events)
    }

    fn select(&mut self, item_id: Option<String>) -> Result<Vec<EngineEvent>, LayoutError> {
        if let Some(id) = &item_id {
            self.require(id)?;
        }
        let mut events = Vec::new();
        self.set_selection(item_id, &mut events);
        Ok(events)
    }

    /// Restarts a pending measure-then-place pass after the item set changed.
    fn restart_pending_placement(&mut self, now_ms: u64) {
        let scheduler = self.docs.scheduler_mut();
        if scheduler.is_pending(Task::MeasureAndPlace) {
            scheduler.schedule(
                Task::MeasureAndPlace,
                now_ms,
                Duration::from_millis(self.config.placement.measure_delay_ms),
            );
        }
    }

    fn insert_and_select(&mut self, item: Item, now_ms: u64) -> Vec<EngineEvent> {
        let id = item.id.clone();
        let bottom = item.rect.bottom();
        self.docs.insert_item(item, now_ms);
        self.restart_pending_placement(now_ms);
        let mut events = vec![self.items_changed()];
        self.set_selection(Some(id), &mut events);
        events.extend(self.grow_for_bottom(bottom));
        events
    }

    fn add_item(&mut self, kind: &str, now_ms: u64) -> Result<Vec<EngineEvent>, LayoutError> {
        let size = self.config.items.default_size_for(kind);
        let min = self.config.items.min_size;
        let origin = self.document().spawn_point(&self.config);
        let rect = Rect::new(origin.x, origin.y, size.w.max(min.w), size.h.max(min.h));
        let item = Item::new(new_item_id(), kind, rect);
        Ok(self.insert_and_select(item, now_ms))
    }

    fn duplicate_item(&mut self, item_id: &str, now_ms: u64) -> Result<Vec<EngineEvent>, LayoutError> {
        let source = self.require(item_id)?;
        let offset = self.config.items.duplicate_offset;
        let copy = Item {
            id: new_item_id(),
            rect: source.rect.translate(offset, offset),
            ..source.clone()
        };
        Ok(self.insert_and_select(copy, now_ms))
    }

    fn delete_item(&mut self, item_id: &str, now_ms: u64) -> Result<Vec<EngineEvent>, LayoutError> {
        self.docs.remove_item(item_id, now_ms)?;
        self.restart_pending_placement(now_ms);
        if self.active.as_deref() == Some(item_id) {
            self.active = None;
        }
        let mut events = vec![self.items_changed()];
        if self.selected.as_deref() == Some(item_id) {
            self.set_selection(None, &mut events);
        }
        Ok(events)
    }

    fn reorder(&mut self, item_id: &str, op: ZOrderOp, now_ms: u64) -> Result<Vec<EngineEvent>, LayoutError> {
        let z = reorder(self.document().items(), item_id, op)
            .ok_or_else(|| LayoutError::UnknownItem(item_id.to_string()))?;
        self.docs
            .mutate(item_id, ItemPatch::z(z), WriteSource::Other, now_ms)?;
        Ok(vec![self.items_changed()])
    }

    /// Runs one placement pass over every item.
    ///
    /// The first pass uses estimates only; the deferred second pass asks the
    /// host's measurer and falls back to estimates per item.
    fn place_all(&mut self, measured: bool, now_ms: u64) -> Result<(), LayoutError> {
        let expanded = self.active.as_deref();
        let sizes = if measured {
            resolve_sizes(
                self.docs.document().items(),
                &self.measurer,
                expanded,
                &self.config.placement,
            )
        } else {
            resolve_sizes(
                self.docs.document().items(),
                &NoMeasurer,
                expanded,
                &self.config.placement,
            )
        };
        // Stored rects never go below the item minimum, so plan with the floored size.
        let min = self.config.items.min_size;
        let sizes: Vec<SizedItem> = sizes
            .into_iter()
            .map(|mut sized| {
                sized.size = Size::new(sized.size.w.max(min.w), sized.size.h.max(min.h));
                sized
            })
            .collect();
        let placement = plan(&sizes, self.container, &self.config.placement, &mut self.rng);
        for placed in &placement.items {
            self.docs.mutate(
                &placed.id,
                ItemPatch::rect(placed.rect),
                WriteSource::Other,
                now_ms,
            )?;
        }
        self.last_placement = Some(placement);
        Ok(())
    }

    fn arrange(&mut self, container: Size, now_ms: u64) -> Result<Vec<EngineEvent>, LayoutError> {
        let canvas = self.document().canvas;
        let usable = |v: f32| v.is_finite() && v > 0.0;
        if !usable(container.w) || !usable(container.h) {
            tracing::warn!(w = container.w, h = container.h, "placement: unusable container, using canvas");
        }
        self.container = Size::new(
            if usable(container.w) { container.w } else { canvas.w },
            if usable(container.h) { container.h } else { canvas.h },
        );
        let delay = Duration::from_millis(self.config.placement.measure_delay_ms);
        if self.sessions.is_active() {
            tracing::debug!("placement: deferred while a session is live");
            self.docs
                .scheduler_mut()
                .schedule(Task::MeasureAndPlace, now_ms, delay);
            return Ok(Vec::new());
        }
        self.place_all(false, now_ms)?;
        self.docs
            .scheduler_mut()
            .schedule(Task::MeasureAndPlace, now_ms, delay);
        Ok(vec![self.items_changed()])
    }

    fn save(&mut self) -> Result<Vec<EngineEvent>, LayoutError> {
        match self.docs.save() {
            Ok(id) => Ok(vec![EngineEvent::Persisted { id, explicit: true }]),
            Err(err) => Err(self.gate_settings(err)),
        }
    }

    fn publish(&mut self) -> Result<Vec<EngineEvent>, LayoutError> {
        match self.docs.publish() {
            Ok(id) => Ok(vec![
                EngineEvent::Persisted {
                    id: id.clone(),
                    explicit: true,
                },
                EngineEvent::Published { id },
            ]),
            Err(err) => Err(self.gate_settings(err)),
        }
    }

    fn gate_settings(&mut self, err: LayoutError) -> LayoutError {
        if matches!(err, LayoutError::MissingMetadata(_)) {
            self.docs.open_settings();
        }
        err
    }

    /// Runs every scheduled task due at `now_ms`.
    pub fn tick(&mut self, now_ms: u64) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        for task in self.docs.scheduler_mut().drain_due(now_ms) {
            match task {
                Task::Autosave => {
                    if let Some(id) = self.docs.run_autosave() {
                        events.push(EngineEvent::Persisted {
                            id,
                            explicit: false,
                        });
                    }
                }
                Task::MeasureAndPlace => {
                    let delay = Duration::from_millis(self.config.placement.measure_delay_ms);
                    if self.sessions.is_active() {
                        self.docs
                            .scheduler_mut()
                            .schedule(Task::MeasureAndPlace, now_ms, delay);
                        continue;
                    }
                    match self.place_all(true, now_ms) {
                        Ok(_) => events.push(self.items_changed()),
                        Err(err) => tracing::warn!(error = %err, "placement: measured pass failed"),
                    }
                }
            }
        }
        events
    }
}
