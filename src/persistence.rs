//! Document controller: the only owner of the layout document.
//!
//! Sessions, z-order and payload edits all request mutations here. Every
//! accepted mutation marks the document as a draft and restarts the
//! debounced autosave. Explicit saves validate the required metadata first
//! and write immediately; publish is an explicit save followed by the
//! host's publish call against the same identifier.

use crate::config::EngineConfig;
use crate::document::{DocumentRecord, DocumentStatus, Item, ItemPatch, LayoutDocument};
use crate::error::{LayoutError, PersistError};
use crate::scheduler::{Scheduler, Task};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistOptions {
    pub explicit: bool,
}

/// Host capability that stores document snapshots.
pub trait PersistSink {
    /// Writes `snapshot` and returns the identifier it is stored under.
    fn persist(
        &mut self,
        snapshot: &LayoutDocument,
        options: PersistOptions,
    ) -> Result<String, PersistError>;

    /// Marks the stored document `id` as published.
    fn publish(&mut self, id: &str) -> Result<(), PersistError>;
}

/// Who is asking to write an item's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSource {
    /// The live drag/resize session.
    Session,
    /// Keyboard nudges, z-order, payload edits, automatic placement.
    Other,
}

#[derive(Debug)]
pub struct DocumentController<S> {
    doc: LayoutDocument,
    sink: S,
    scheduler: Scheduler,
    autosave_delay: Duration,
    required_meta: Vec<String>,
    locked: Option<String>,
    settings_open: bool,
}

impl<S: PersistSink> DocumentController<S> {
    /// Wraps a freshly loaded document. Loading never schedules an autosave.
    pub fn new(doc: LayoutDocument, sink: S, config: &EngineConfig) -> Self {
        Self {
            doc,
            sink,
            scheduler: Scheduler::new(),
            autosave_delay: Duration::from_millis(config.persistence.autosave_delay_ms),
            required_meta: config.persistence.required_meta.clone(),
            locked: None,
            settings_open: false,
        }
    }

    pub fn document(&self) -> &LayoutDocument {
        &self.doc
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn into_parts(self) -> (LayoutDocument, S) {
        (self.doc, self.sink)
    }

    /// Reserves geometry writes for `item_id` to the live session.
    pub fn lock(&mut self, item_id: &str) {
        self.locked = Some(item_id.to_string());
    }

    pub fn unlock(&mut self) {
        self.locked = None;
    }

    pub fn is_locked(&self, item_id: &str) -> bool {
        self.locked.as_deref() == Some(item_id)
    }

    pub fn settings_open(&self) -> bool {
        self.settings_open
    }

    fn touch(&mut self, now_ms: u64) {
        self.doc.status = DocumentStatus::Draft;
        self.schedule_autosave(now_ms);
    }

    /// Applies `patch` to one item.
    ///
    /// Geometry writes to an item owned by a live session are rejected unless
    /// they come from that session.
    pub fn mutate(
        &mut self,
        item_id: &str,
        patch: ItemPatch,
        source: WriteSource,
        now_ms: u64,
    ) -> Result<&Item, LayoutError> {
        if patch.touches_geometry() && source == WriteSource::Other && self.is_locked(item_id) {
            tracing::warn!(item = %item_id, "document: geometry write rejected, item is in a live session");
            return Err(LayoutError::SessionConflict(item_id.to_string()));
        }
        if !self.doc.contains(item_id) {
            return Err(LayoutError::UnknownItem(item_id.to_string()));
        }
        self.touch(now_ms);
        let item = self
            .doc
            .get_mut(item_id)
            .ok_or_else(|| LayoutError::UnknownItem(item_id.to_string()))?;
        if let Some(rect) = patch.rect {
            item.rect = rect;
        }
        if let Some(z) = patch.z {
            item.z = z;
        }
        if let Some(data) = patch.data {
            item.data = data;
        }
        Ok(&*item)
    }

    pub fn insert_item(&mut self, item: Item, now_ms: u64) {
        tracing::debug!(item = %item.id, kind = %item.kind, "document: insert");
        self.doc.insert(item);
        self.touch(now_ms);
    }

    pub fn remove_item(&mut self, item_id: &str, now_ms: u64) -> Result<Item, LayoutError> {
        if self.is_locked(item_id) {
            return Err(LayoutError::SessionConflict(item_id.to_string()));
        }
        let item = self
            .doc
            .remove(item_id)
            .ok_or_else(|| LayoutError::UnknownItem(item_id.to_string()))?;
        self.touch(now_ms);
        Ok(item)
    }

    /// Merges host metadata; `null` values remove keys.
    pub fn set_meta(&mut self, meta: Map<String, Value>, now_ms: u64) {
        for (key, value) in meta {
            if value.is_null() {
                self.doc.meta.remove(&key);
            } else {
                self.doc.meta.insert(key, value);
            }
        }
        self.touch(now_ms);
    }

    /// Raises the canvas height to `height`. Never shrinks it.
    pub fn grow_canvas(&mut self, height: f32) -> bool {
        if height > self.doc.canvas.h {
            self.doc.canvas.h = height;
            true
        } else {
            false
        }
    }

    /// (Re)starts the debounce timer unless the settings dialog is open.
    pub fn schedule_autosave(&mut self, now_ms: u64) {
        if self.settings_open {
            tracing::debug!("autosave: suppressed while settings dialog is open");
            return;
        }
        self.scheduler
            .schedule(Task::Autosave, now_ms, self.autosave_delay);
    }

    pub fn open_settings(&mut self) {
        self.settings_open = true;
        self.scheduler.cancel_task(Task::Autosave);
    }

    pub fn close_settings(&mut self, now_ms: u64) {
        self.settings_open = false;
        self.schedule_autosave(now_ms);
    }

    fn write(&mut self, explicit: bool) -> Result<String, PersistError> {
        let id = self.sink.persist(&self.doc, PersistOptions { explicit })?;
        self.doc.id = Some(id.clone());
        Ok(id)
    }

    /// Runs a due autosave. Returns the stored id when a write happened.
    ///
    /// Incomplete metadata skips the write silently; sink failures are
    /// logged and left for the next debounce cycle.
    pub fn run_autosave(&mut self) -> Option<String> {
        if self.settings_open {
            return None;
        }
        let missing = self.doc.missing_meta(&self.required_meta);
        if !missing.is_empty() {
            tracing::debug!(?missing, "autosave: skipped, metadata incomplete");
            return None;
        }
        match self.write(false) {
            Ok(id) => {
                tracing::debug!(%id, "autosave: persisted");
                Some(id)
            }
            Err(err) => {
                tracing::warn!(error = %err, "autosave: write failed, retrying on next edit");
                None
            }
        }
    }

    /// Validates metadata and writes immediately, cancelling any pending autosave.
    pub fn save(&mut self) -> Result<String, LayoutError> {
        let missing = self.doc.missing_meta(&self.required_meta);
        if !missing.is_empty() {
            return Err(LayoutError::MissingMetadata(missing));
        }
        self.scheduler.cancel_task(Task::Autosave);
        let id = self.write(true)?;
        tracing::info!(%id, "document: saved");
        Ok(id)
    }

    /// Explicit save in published state, then the host's publish call.
    pub fn publish(&mut self) -> Result<String, LayoutError> {
        let previous = self.doc.status;
        self.doc.status = DocumentStatus::Published;
        let result = self.save().and_then(|id| {
            self.sink.publish(&id)?;
            Ok(id)
        });
        match result {
            Ok(id) => {
                tracing::info!(%id, "document: published");
                Ok(id)
            }
            Err(err) => {
                self.doc.status = previous;
                Err(err)
            }
        }
    }
}

/// One write received by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredWrite {
    pub id: String,
    pub explicit: bool,
    pub record: DocumentRecord,
}

/// In-process sink that keeps every write; used by the CLI and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub writes: Vec<StoredWrite>,
    pub published: Vec<String>,
    failures: VecDeque<PersistError>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next write fail with `err`.
    pub fn fail_next(&mut self, err: PersistError) {
        self.failures.push_back(err);
    }

    pub fn last(&self) -> Option<&StoredWrite> {
        self.writes.last()
    }
}

impl PersistSink for MemoryStore {
    fn persist(
        &mut self,
        snapshot: &LayoutDocument,
        options: PersistOptions,
    ) -> Result<String, PersistError> {
        if let Some(err) = self.failures.pop_front() {
            return Err(err);
        }
        let id = match &snapshot.id {
            Some(id) => id.clone(),
            None => {
                self.next_id += 1;
                format!("doc-{}", self.next_id)
            }
        };
        let mut record = snapshot.to_record();
        record.id = Some(id.clone());
        self.writes.push(StoredWrite {
            id: id.clone(),
            explicit: options.explicit,
            record,
        });
        Ok(id)
    }

    fn publish(&mut self, id: &str) -> Result<(), PersistError> {
        if !self.writes.iter().any(|write| write.id == id) {
            return Err(PersistError::Rejected(format!("unknown document `{id}`")));
        }
        self.published.push(id.to_string());
        Ok(())
    }
}
