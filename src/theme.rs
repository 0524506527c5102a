use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub background: String,
    pub grid_line: String,
    pub item_fill: String,
    pub item_stroke: String,
    pub label_color: String,
    pub muted_text_color: String,
    pub guide_color: String,
    pub selection_color: String,
    pub fallback_stroke: String,
}

impl Theme {
    /// Light palette of the lesson builder canvas.
    pub fn builder() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 14.0,
            background: "#FFFFFF".to_string(),
            grid_line: "#EEF2F8".to_string(),
            item_fill: "#F8FAFF".to_string(),
            item_stroke: "#C7D2E5".to_string(),
            label_color: "#1C2430".to_string(),
            muted_text_color: "#7A8AA6".to_string(),
            guide_color: "#EC4899".to_string(),
            selection_color: "#3B82F6".to_string(),
            fallback_stroke: "#F59E0B".to_string(),
        }
    }

    /// Dark palette of the discovery board.
    pub fn board() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            background: "#0F172A".to_string(),
            grid_line: "#1E293B".to_string(),
            item_fill: "#1E293B".to_string(),
            item_stroke: "#334155".to_string(),
            label_color: "#F1F5F9".to_string(),
            muted_text_color: "#94A3B8".to_string(),
            guide_color: "#F472B6".to_string(),
            selection_color: "#38BDF8".to_string(),
            fallback_stroke: "#FBBF24".to_string(),
        }
    }

    /// Accent stripe for a block kind.
    pub fn kind_accent(&self, kind: &str) -> &'static str {
        match kind {
            "TEXT" => "#6366F1",
            "IMAGE" => "#10B981",
            "VIDEO" => "#EF4444",
            "QUIZ" => "#F59E0B",
            "FLASHCARDS" => "#8B5CF6",
            "CROSSWORD" => "#14B8A6",
            "FACT" => "#22D3EE",
            "INFO" => "#A3E635",
            _ => "#94A3B8",
        }
    }
}
