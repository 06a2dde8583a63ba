use egui::Color32;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn from_dark(dark: bool) -> Self {
        if dark { Theme::Dark } else { Theme::Light }
    }

    pub fn is_dark(&self) -> bool {
        matches!(self, Theme::Dark)
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn canvas_background(&self) -> Color32 {
        match self {
            Theme::Light => Color32::from_rgb(0xf8, 0xfa, 0xfc),
            Theme::Dark => Color32::from_rgb(0x11, 0x18, 0x27),
        }
    }

    pub fn grid_color(&self) -> Color32 {
        match self {
            Theme::Light => Color32::from_rgb(0xe0, 0xe0, 0xe0),
            Theme::Dark => Color32::from_rgb(0x44, 0x44, 0x44),
        }
    }

    pub fn grid_gap(&self) -> f32 {
        20.0
    }

    pub fn edge_color(&self) -> Color32 {
        match self {
            Theme::Light => Color32::from_rgb(0x94, 0xa3, 0xb8),
            Theme::Dark => Color32::from_rgb(0x64, 0x74, 0x8b),
        }
    }

    pub fn label_background(&self) -> Color32 {
        match self {
            Theme::Light => Color32::WHITE,
            Theme::Dark => Color32::from_rgb(0x1f, 0x29, 0x37),
        }
    }

    pub fn label_text(&self) -> Color32 {
        match self {
            Theme::Light => Color32::from_rgb(0x1f, 0x29, 0x37),
            Theme::Dark => Color32::from_rgb(0xf3, 0xf4, 0xf6),
        }
    }

    pub fn minimap_mask(&self) -> Color32 {
        Color32::from_rgba_unmultiplied(255, 255, 255, 26)
    }
}
