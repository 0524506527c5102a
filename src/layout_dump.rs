use crate::document::{DocumentStatus, LayoutDocument};
use crate::layout::{Placement, PlacementOrigin, paint_order};
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Flat, diff-friendly view of a document in paint order.
#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub id: Option<String>,
    pub status: DocumentStatus,
    pub width: f32,
    pub height: f32,
    pub items: Vec<ItemDump>,
}

#[derive(Debug, Serialize)]
pub struct ItemDump {
    pub id: String,
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub z: i64,
    pub layer: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<PlacementOrigin>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl LayoutDump {
    pub fn from_document(doc: &LayoutDocument, placement: Option<&Placement>) -> Self {
        let items = paint_order(doc.items())
            .into_iter()
            .enumerate()
            .map(|(layer, item)| ItemDump {
                id: item.id.clone(),
                kind: item.kind.clone(),
                x: item.rect.x,
                y: item.rect.y,
                width: item.rect.w,
                height: item.rect.h,
                z: item.z,
                layer,
                placement: placement
                    .and_then(|placement| placement.get(&item.id))
                    .map(|placed| placed.origin),
                data: item.data.clone(),
            })
            .collect();

        LayoutDump {
            id: doc.id.clone(),
            status: doc.status,
            width: doc.canvas.w,
            height: doc.canvas.h,
            items,
        }
    }
}

pub fn write_layout_dump(
    path: &Path,
    doc: &LayoutDocument,
    placement: Option<&Placement>,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_document(doc, placement);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
