use egui::Color32;

use super::theme::Theme;

/// Fill / border / text triple for a node body.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Swatch {
    pub fill: Color32,
    pub stroke: Color32,
    pub text: Color32,
}

const fn hex(rgb: u32) -> Color32 {
    Color32::from_rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

// (light fill, border, dark text) per category tag
fn tones(category: Option<&str>) -> (u32, u32, u32) {
    match category.unwrap_or_default() {
        "primary" => (0xdbeafe, 0x3b82f6, 0x1e40af),
        "secondary" => (0xf3e8ff, 0xa855f7, 0x6b21a8),
        "tertiary" => (0xe0e7ff, 0x6366f1, 0x3730a3),
        "quaternary" => (0xfce7f3, 0xec4899, 0x9d174d),
        "success" => (0xdcfce7, 0x22c55e, 0x166534),
        "warning" => (0xfef9c3, 0xeab308, 0x854d0e),
        "danger" => (0xfee2e2, 0xef4444, 0x991b1b),
        "info" => (0xcffafe, 0x06b6d4, 0x155e75),
        _ => (0xf3f4f6, 0x6b7280, 0x1f2937),
    }
}

/// Concept-style swatch for a category. Dark mode swaps fill and text.
pub fn category_swatch(category: Option<&str>, theme: Theme) -> Swatch {
    let (fill, stroke, text) = tones(category);
    if theme.is_dark() {
        Swatch { fill: hex(text), stroke: hex(stroke), text: hex(fill) }
    } else {
        Swatch { fill: hex(fill), stroke: hex(stroke), text: hex(text) }
    }
}

pub fn fixed_swatch(fill: u32, stroke: u32, text: u32, theme: Theme) -> Swatch {
    if theme.is_dark() {
        Swatch { fill: hex(text), stroke: hex(stroke), text: hex(fill) }
    } else {
        Swatch { fill: hex(fill), stroke: hex(stroke), text: hex(text) }
    }
}

/// Overview-map dot color by category.
pub fn minimap_color(category: Option<&str>) -> Color32 {
    hex(match category.unwrap_or_default() {
        "primary" => 0x4c6ef5,
        "secondary" => 0x5cbbf6,
        "tertiary" => 0x7950f2,
        "quaternary" => 0xf783ac,
        "success" => 0x40c057,
        "warning" => 0xfaae42,
        "danger" => 0xfa5252,
        "info" => 0x22b8cf,
        "event" => 0xf59e0b,
        "person" => 0x3b82f6,
        "place" => 0x10b981,
        _ => 0xe9ecef,
    })
}

pub const AMBER: Color32 = hex(0xf59e0b);
pub const INDIGO: Color32 = hex(0x6366f1);
pub const SLATE: Color32 = hex(0x475569);
pub const GRADIENT_START: Color32 = hex(0x4c6ef5);
pub const GRADIENT_END: Color32 = hex(0xf783ac);
