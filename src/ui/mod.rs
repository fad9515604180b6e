pub mod blocks;
pub mod case_study;
pub mod gallery;
pub mod hub;
pub mod modal;
pub mod particles;

use crate::state::View;
use crate::theme::parse_hex_color;
use eframe::egui::Color32;

/// What a page asks the app to do after a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    Navigate(View),
    Back,
    SelectTab(String),
    OpenUrl(String),
    ToggleTheme,
    OpenContact,
    CloseContact,
    SubmitPassword,
    CancelGate,
}

/// Authored `#rrggbb` color, or `fallback` when absent. Colors are validated at load.
pub fn content_color(raw: Option<&str>, fallback: Color32) -> Color32 {
    raw.and_then(parse_hex_color).unwrap_or(fallback)
}

/// How many equal columns of at least `min_width` fit in `available`.
pub fn column_count(available: f32, min_width: f32, gap: f32) -> usize {
    (((available + gap) / (min_width + gap)).floor() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_count_never_drops_below_one() {
        assert_eq!(column_count(100.0, 300.0, 16.0), 1);
        assert_eq!(column_count(632.0, 300.0, 16.0), 2);
        assert_eq!(column_count(1000.0, 300.0, 16.0), 3);
    }

    #[test]
    fn content_color_falls_back_when_missing() {
        assert_eq!(content_color(None, Color32::RED), Color32::RED);
        assert_eq!(
            content_color(Some("#10b981"), Color32::RED),
            Color32::from_rgb(0x10, 0xB9, 0x81)
        );
    }
}
