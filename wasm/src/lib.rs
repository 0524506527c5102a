use lesson_canvas::document::new_item_id;
use lesson_canvas::render::RenderOptions;
use lesson_canvas::{
    Action, DocumentRecord, Engine, EngineConfig, EngineEvent, EngineInit, LayoutDocument,
    Measurer, PersistError, PersistOptions, PersistSink, Size, Theme, render_svg,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use wasm_bindgen::prelude::*;

/// Sizes the host measured from rendered cards.
#[derive(Debug, Default)]
struct HostSizes(HashMap<String, Size>);

impl Measurer for HostSizes {
    fn measure(&self, item_id: &str) -> Option<Size> {
        self.0.get(item_id).copied()
    }
}

/// Work the host has to carry out against its backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Outgoing {
    Persist {
        id: String,
        explicit: bool,
        record: DocumentRecord,
    },
    Publish {
        id: String,
    },
}

/// Accepts every write and queues it for the host to drain.
#[derive(Debug, Default)]
struct Outbox {
    queue: Vec<Outgoing>,
}

impl PersistSink for Outbox {
    fn persist(
        &mut self,
        snapshot: &LayoutDocument,
        options: PersistOptions,
    ) -> Result<String, PersistError> {
        let id = snapshot.id.clone().unwrap_or_else(new_item_id);
        let mut record = snapshot.to_record();
        record.id = Some(id.clone());
        self.queue.push(Outgoing::Persist {
            id: id.clone(),
            explicit: options.explicit,
            record,
        });
        Ok(id)
    }

    fn publish(&mut self, id: &str) -> Result<(), PersistError> {
        self.queue.push(Outgoing::Publish { id: id.to_string() });
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanvasRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    grid_size: Option<f32>,
    selected: Option<String>,
}

fn build_theme(options: &CanvasRenderOptions) -> Theme {
    let mut theme = if options.theme.as_deref() == Some("board") {
        Theme::board()
    } else {
        Theme::builder()
    };
    if let Some(font_family) = &options.font_family {
        theme.font_family = font_family.clone();
    }
    theme
}

fn render_document(document_json: &str, options: CanvasRenderOptions) -> Result<String, String> {
    let doc = LayoutDocument::from_json(document_json, &EngineConfig::default())
        .map_err(|error| error.to_string())?;
    let theme = build_theme(&options);
    let render_options = RenderOptions {
        grid_size: options.grid_size,
        selected: options.selected,
        ..RenderOptions::default()
    };
    Ok(render_svg(&doc, &theme, &render_options))
}

#[wasm_bindgen]
pub fn render_canvas_svg(document_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<CanvasRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        CanvasRenderOptions::default()
    };
    render_document(document_json, options).map_err(|error| JsValue::from_str(&error))
}

/// Host time arrives as a JS number of milliseconds.
fn host_ms(now_ms: f64) -> u64 {
    if now_ms.is_finite() && now_ms > 0.0 {
        now_ms as u64
    } else {
        0
    }
}

struct Core {
    engine: Engine<Outbox, HostSizes>,
}

impl Core {
    fn new(init_json: &str, seed: Option<u64>) -> Result<Self, String> {
        let init: EngineInit = serde_json::from_str(init_json).map_err(|error| error.to_string())?;
        let mut engine = Engine::from_init(init, Outbox::default(), HostSizes::default())
            .map_err(|error| error.to_string())?;
        if let Some(seed) = seed {
            engine.reseed(seed);
        }
        Ok(Self { engine })
    }

    fn dispatch(&mut self, action_json: &str, now_ms: u64) -> Result<Vec<EngineEvent>, String> {
        let action: Action = serde_json::from_str(action_json).map_err(|error| error.to_string())?;
        self.engine
            .dispatch(action, now_ms)
            .map_err(|error| error.to_string())
    }

    fn report_size(&mut self, item_id: &str, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.engine
                .measurer_mut()
                .0
                .insert(item_id.to_string(), Size::new(width, height));
        }
    }

    fn take_outbox(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.engine.sink_mut().queue)
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|error| JsValue::from_str(&error.to_string()))
}

/// Layout engine handle for a browser host.
///
/// Actions go in and events come out as JSON strings. Snapshot writes and
/// publish calls queue up until the host drains them with `takeOutbox`.
#[wasm_bindgen]
pub struct CanvasEngine {
    core: Core,
}

#[wasm_bindgen]
impl CanvasEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(init_json: &str, seed: Option<u64>) -> Result<CanvasEngine, JsValue> {
        let core = Core::new(init_json, seed).map_err(|error| JsValue::from_str(&error))?;
        Ok(Self { core })
    }

    pub fn dispatch(&mut self, action_json: &str, now_ms: f64) -> Result<String, JsValue> {
        let events = self
            .core
            .dispatch(action_json, host_ms(now_ms))
            .map_err(|error| JsValue::from_str(&error))?;
        to_json(&events)
    }

    pub fn tick(&mut self, now_ms: f64) -> Result<String, JsValue> {
        to_json(&self.core.engine.tick(host_ms(now_ms)))
    }

    #[wasm_bindgen(js_name = nextDue)]
    pub fn next_due(&self) -> Option<f64> {
        self.core.engine.next_due().map(|due| due as f64)
    }

    #[wasm_bindgen(js_name = reportSize)]
    pub fn report_size(&mut self, item_id: &str, width: f32, height: f32) {
        self.core.report_size(item_id, width, height);
    }

    #[wasm_bindgen(js_name = takeOutbox)]
    pub fn take_outbox(&mut self) -> Result<String, JsValue> {
        to_json(&self.core.take_outbox())
    }

    #[wasm_bindgen(js_name = documentJson)]
    pub fn document_json(&self) -> Result<String, JsValue> {
        self.core
            .engine
            .document()
            .to_json()
            .map_err(|error| JsValue::from_str(&error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INIT: &str = r#"{
        "items": [
            { "id": "f1", "kind": "FACT", "data": { "content": "Lava can reach 1,200 °C." } },
            { "id": "i1", "kind": "INFO", "data": { "content": "Most volcanoes form along plate boundaries." } }
        ],
        "containerSize": { "w": 1400, "h": 900 }
    }"#;

    #[test]
    fn measured_sizes_reach_the_second_pass() {
        let mut core = Core::new(INIT, Some(3)).expect("init should parse");
        core.dispatch(r#"{ "type": "arrange", "width": 1400, "height": 900 }"#, 0)
            .expect("arrange should run");
        core.report_size("f1", 310.0, 205.0);
        core.engine.tick(100);
        let f1 = core.engine.document().get("f1").expect("f1 present");
        assert_eq!(f1.rect.size(), Size::new(310.0, 205.0));
        let i1 = core.engine.document().get("i1").expect("i1 present");
        assert_eq!(i1.rect.size(), Size::new(256.0, 220.0));
    }

    #[test]
    fn publish_queues_persist_then_publish() {
        let mut core = Core::new(INIT, Some(1)).expect("init should parse");
        core.dispatch(
            r#"{ "type": "setMeta", "meta": { "title": "Volcanoes", "topic": "Earth", "grade": 5, "visualTheme": "NET" } }"#,
            0,
        )
        .expect("meta should apply");
        core.dispatch(r#"{ "type": "publish" }"#, 10)
            .expect("publish should succeed");
        let outbox = core.take_outbox();
        assert_eq!(outbox.len(), 2);
        let Outgoing::Persist { id, explicit, .. } = &outbox[0] else {
            panic!("expected a persist request first");
        };
        assert!(*explicit);
        assert_eq!(outbox[1], Outgoing::Publish { id: id.clone() });
        assert!(core.take_outbox().is_empty());
    }

    #[test]
    fn renders_document_with_board_theme() {
        let doc = Core::new(INIT, None)
            .expect("init should parse")
            .engine
            .document()
            .to_json()
            .expect("document should serialize");
        let options = CanvasRenderOptions {
            theme: Some("board".to_string()),
            ..CanvasRenderOptions::default()
        };
        let svg = render_document(&doc, options).expect("document should render");
        assert!(svg.contains("<svg"));
        assert!(svg.contains(&Theme::board().background));
    }
}
