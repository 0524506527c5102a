//! The canonical layout document: items keyed by id in insertion order,
//! host metadata, publication status and canvas size.
//!
//! Incoming records are loaded leniently. Missing or malformed geometry is
//! replaced with the configured default size and fallback position instead
//! of being rejected, so a half-broken document still opens.

use crate::config::EngineConfig;
use crate::geometry::{Point, Rect, Size};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub kind: String,
    #[serde(flatten)]
    pub rect: Rect,
    #[serde(default)]
    pub z: i64,
    #[serde(default)]
    pub data: Value,
}

impl Item {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            rect,
            z: 0,
            data: Value::Null,
        }
    }

    pub fn with_z(mut self, z: i64) -> Self {
        self.z = z;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

pub fn new_item_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Published,
}

/// Field-level patch applied through the document controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub rect: Option<Rect>,
    pub z: Option<i64>,
    pub data: Option<Value>,
}

impl ItemPatch {
    pub fn rect(rect: Rect) -> Self {
        Self {
            rect: Some(rect),
            ..Default::default()
        }
    }

    pub fn z(z: i64) -> Self {
        Self {
            z: Some(z),
            ..Default::default()
        }
    }

    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn touches_geometry(&self) -> bool {
        self.rect.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDocument {
    pub id: Option<String>,
    items: IndexMap<String, Item>,
    pub meta: Map<String, Value>,
    pub status: DocumentStatus,
    pub canvas: Size,
}

impl LayoutDocument {
    pub fn new(canvas: Size) -> Self {
        Self {
            id: None,
            items: IndexMap::new(),
            meta: Map::new(),
            status: DocumentStatus::Draft,
            canvas,
        }
    }

    /// Builds a document from already-valid items, keeping their order.
    pub fn with_items(canvas: Size, items: impl IntoIterator<Item = Item>) -> Self {
        let mut doc = Self::new(canvas);
        for item in items {
            doc.items.insert(item.id.clone(), item);
        }
        doc
    }

    /// The builder's two-column starter lesson.
    pub fn lesson_template(config: &EngineConfig) -> Self {
        let blocks = [
            ("TEXT", 40.0, 40.0, 600.0, 240.0, "Lesson Introduction"),
            ("IMAGE", 680.0, 40.0, 480.0, 320.0, ""),
            ("TEXT", 40.0, 320.0, 600.0, 240.0, "Main Content"),
            ("FLASHCARDS", 40.0, 600.0, 600.0, 260.0, ""),
            ("VIDEO", 680.0, 400.0, 640.0, 360.0, ""),
            ("QUIZ", 40.0, 900.0, 600.0, 220.0, ""),
            ("TEXT", 680.0, 800.0, 600.0, 240.0, "Summary"),
        ];
        let items = blocks.iter().map(|(kind, x, y, w, h, heading)| {
            let data = if heading.is_empty() {
                Value::Object(Map::new())
            } else {
                serde_json::json!({
                    "html": format!("<h2>{heading}</h2>"),
                    "text": heading,
                })
            };
            Item::new(new_item_id(), *kind, Rect::new(*x, *y, *w, *h))
                .with_z(1)
                .with_data(data)
        });
        let mut doc = Self::with_items(Size::new(config.canvas.design_width, 0.0), items);
        doc.canvas.h = initial_canvas_height(doc.items.values(), config);
        doc
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    pub fn lowest_bottom(&self) -> Option<f32> {
        self.items
            .values()
            .map(|item| item.rect.bottom())
            .reduce(f32::max)
    }

    /// Where "add tool" drops a new block: below the lowest item.
    pub fn spawn_point(&self, config: &EngineConfig) -> Point {
        let y = match self.lowest_bottom() {
            Some(bottom) => bottom + config.items.spawn_gap,
            None => config.items.spawn_gap,
        };
        Point::new(config.items.spawn_x, y)
    }

    /// Required metadata fields that are absent or blank.
    pub fn missing_meta(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|field| !meta_present(self.meta.get(field.as_str())))
            .cloned()
            .collect()
    }

    pub(crate) fn insert(&mut self, item: Item) {
        self.items.insert(item.id.clone(), item);
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<Item> {
        self.items.shift_remove(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Item> {
        self.items.get_mut(id)
    }

    pub fn to_record(&self) -> DocumentRecord {
        DocumentRecord {
            id: self.id.clone(),
            items: self.items.values().cloned().collect(),
            meta: self.meta.clone(),
            status: self.status,
            canvas: Some(self.canvas),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_record())
    }

    pub fn from_json(contents: &str, config: &EngineConfig) -> serde_json::Result<Self> {
        let raw: RawDocument = serde_json::from_str(contents)?;
        Ok(Self::from_raw(raw, config))
    }

    pub fn from_raw(raw: RawDocument, config: &EngineConfig) -> Self {
        let items: Vec<Item> = raw
            .items
            .into_iter()
            .map(|item| item.normalize(config))
            .collect();
        let canvas = match raw.canvas {
            Some(size) if size.w > 0.0 && size.h > 0.0 => size,
            _ => Size::new(
                config.canvas.design_width,
                initial_canvas_height(items.iter(), config),
            ),
        };
        let mut doc = Self::with_items(canvas, Vec::new());
        for item in items {
            if doc.contains(&item.id) {
                tracing::warn!(id = %item.id, "document: duplicate item id, keeping the later record");
            }
            doc.insert(item);
        }
        doc.id = raw.id;
        doc.meta = raw.meta;
        doc.status = raw.status;
        doc
    }
}

fn meta_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn initial_canvas_height<'a>(items: impl Iterator<Item = &'a Item>, config: &EngineConfig) -> f32 {
    let grid = config.snap.grid_size.max(1.0);
    let bottom = items.map(|item| item.rect.bottom()).fold(0.0, f32::max);
    let fitted = ((bottom + config.canvas.load_padding) / grid).ceil() * grid;
    fitted.max(config.canvas.min_height)
}

/// Persisted document shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRecord {
    pub id: Option<String>,
    pub items: Vec<Item>,
    pub meta: Map<String, Value>,
    pub status: DocumentStatus,
    pub canvas: Option<Size>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawDocument {
    pub id: Option<String>,
    pub items: Vec<RawItem>,
    pub meta: Map<String, Value>,
    pub status: DocumentStatus,
    pub canvas: Option<Size>,
}

/// Item record as it arrives from a host, before coercion.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawItem {
    pub id: Option<Value>,
    pub kind: Option<Value>,
    pub x: Option<Value>,
    pub y: Option<Value>,
    pub w: Option<Value>,
    pub h: Option<Value>,
    pub z: Option<Value>,
    pub data: Value,
}

impl From<Item> for RawItem {
    fn from(item: Item) -> Self {
        Self {
            id: Some(Value::String(item.id)),
            kind: Some(Value::String(item.kind)),
            x: Some(Value::from(item.rect.x)),
            y: Some(Value::from(item.rect.y)),
            w: Some(Value::from(item.rect.w)),
            h: Some(Value::from(item.rect.h)),
            z: Some(Value::from(item.z)),
            data: item.data,
        }
    }
}

impl RawItem {
    pub fn normalize(self, config: &EngineConfig) -> Item {
        let id = text_value(self.id.as_ref())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(new_item_id);
        let kind = text_value(self.kind.as_ref()).unwrap_or_default();
        let default_size = config.items.default_size_for(&kind);
        let min = config.items.min_size;

        let w = number_value(self.w.as_ref())
            .filter(|w| *w > 0.0)
            .unwrap_or(default_size.w)
            .max(min.w);
        let h = number_value(self.h.as_ref())
            .filter(|h| *h > 0.0)
            .unwrap_or(default_size.h)
            .max(min.h);
        let x = number_value(self.x.as_ref()).unwrap_or(0.0).max(0.0);
        let y = number_value(self.y.as_ref()).unwrap_or(0.0).max(0.0);
        let z = number_value(self.z.as_ref())
            .map(|z| z.round() as i64)
            .unwrap_or(0);

        Item {
            id,
            kind,
            rect: Rect::new(x, y, w, h),
            z,
            data: self.data,
        }
    }
}

fn text_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_value(value: Option<&Value>) -> Option<f32> {
    let number: f64 = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    let number = number as f32;
    number.is_finite().then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_malformed_geometry() {
        let config = EngineConfig::default();
        let doc = LayoutDocument::from_json(
            r#"{
                "items": [
                    { "id": "a", "kind": "VIDEO", "x": "12", "y": null, "w": -5, "h": "tall" },
                    { "id": "b", "kind": "TEXT", "x": 40, "y": 40, "w": 100, "h": 60, "z": 2.6 },
                    { "kind": "QUIZ" }
                ]
            }"#,
            &config,
        )
        .unwrap();
        let a = doc.get("a").unwrap();
        assert_eq!(a.rect, Rect::new(12.0, 0.0, 640.0, 360.0));
        let b = doc.get("b").unwrap();
        assert_eq!(b.rect.w, 240.0, "clamped to the minimum width");
        assert_eq!(b.rect.h, 140.0);
        assert_eq!(b.z, 3);
        assert_eq!(doc.len(), 3);
        let generated = doc.items().nth(2).unwrap();
        assert!(!generated.id.is_empty());
        assert_eq!(generated.rect.size(), Size::new(600.0, 220.0));
    }

    #[test]
    fn negative_positions_clamp_to_origin() {
        let config = EngineConfig::default();
        let doc = LayoutDocument::from_json(
            r#"{ "items": [ { "id": "a", "kind": "TEXT", "x": -30, "y": "-12.5", "w": 600, "h": 240 } ] }"#,
            &config,
        )
        .unwrap();
        assert_eq!(doc.get("a").unwrap().rect, Rect::new(0.0, 0.0, 600.0, 240.0));
    }

    #[test]
    fn canvas_height_fits_items_when_not_stored() {
        let config = EngineConfig::default();
        let doc = LayoutDocument::from_json(
            r#"{ "items": [ { "id": "a", "kind": "TEXT", "x": 0, "y": 900, "w": 600, "h": 240 } ] }"#,
            &config,
        )
        .unwrap();
        assert_eq!(doc.canvas, Size::new(1280.0, 1180.0));
    }

    #[test]
    fn round_trips_through_json() {
        let config = EngineConfig::default();
        let mut doc = LayoutDocument::lesson_template(&config);
        doc.id = Some("lesson-1".to_string());
        doc.meta.insert("title".to_string(), Value::from("Volcanoes"));
        doc.status = DocumentStatus::Published;
        let json = doc.to_json().unwrap();
        let reloaded = LayoutDocument::from_json(&json, &config).unwrap();
        assert_eq!(reloaded, doc);
    }

    #[test]
    fn spawn_point_is_below_lowest_item() {
        let config = EngineConfig::default();
        let empty = LayoutDocument::new(Size::new(1280.0, 800.0));
        assert_eq!(empty.spawn_point(&config), Point::new(40.0, 40.0));
        let doc = LayoutDocument::lesson_template(&config);
        assert_eq!(doc.spawn_point(&config), Point::new(40.0, 1160.0));
    }

    #[test]
    fn blank_metadata_counts_as_missing() {
        let mut doc = LayoutDocument::new(Size::new(1280.0, 800.0));
        doc.meta.insert("title".to_string(), Value::from("  "));
        doc.meta.insert("grade".to_string(), Value::from(0));
        doc.meta.insert("topic".to_string(), Value::from("Plants"));
        let required: Vec<String> = ["title", "topic", "grade", "visualTheme"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            doc.missing_meta(&required),
            vec!["title".to_string(), "grade".to_string(), "visualTheme".to_string()]
        );
    }
}
