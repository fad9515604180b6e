use eframe::egui::{self, Color32, CornerRadius, FontId, Frame, Margin, Stroke, TextStyle};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            other => Err(format!("unknown theme value: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub mode: ThemeMode,
    pub surface_0: Color32,
    pub surface_1: Color32,
    pub surface_2: Color32,
    pub surface_3: Color32,
    pub accent_primary: Color32,
    pub accent_secondary: Color32,
    pub accent_muted: Color32,
    pub success: Color32,
    pub danger: Color32,
    pub text_primary: Color32,
    pub text_muted: Color32,
    pub text_on_accent: Color32,
    pub border_subtle: Color32,
    pub border_strong: Color32,
    pub diagram_fill: Color32,
    pub diagram_border: Color32,
    pub spacing_4: f32,
    pub spacing_8: f32,
    pub spacing_12: f32,
    pub spacing_16: f32,
    pub spacing_24: f32,
    pub radius_8: u8,
    pub radius_12: u8,
    pub radius_16: u8,
    pub button_height: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub const R8: u8 = 8;
    pub const R12: u8 = 12;
    pub const P8: f32 = 8.0;
    pub const P16: f32 = 16.0;
    pub const P24: f32 = 24.0;

    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Dark => Self::dark(),
            ThemeMode::Light => Self::light(),
        }
    }

    pub fn dark() -> Self {
        Self {
            mode: ThemeMode::Dark,
            surface_0: Color32::from_rgb(0x0B, 0x11, 0x20),
            surface_1: Color32::from_rgb(0x0F, 0x17, 0x2A),
            surface_2: Color32::from_rgb(0x1E, 0x29, 0x3B),
            surface_3: Color32::from_rgb(0x33, 0x41, 0x55),
            accent_primary: Color32::from_rgb(0x63, 0x66, 0xF1),
            accent_secondary: Color32::from_rgb(0x3B, 0x82, 0xF6),
            accent_muted: Color32::from_rgb(0x4F, 0x46, 0xE5),
            success: Color32::from_rgb(0x10, 0xB9, 0x81),
            danger: Color32::from_rgb(0xEF, 0x44, 0x44),
            text_primary: Color32::from_rgb(0xF8, 0xFA, 0xFC),
            text_muted: Color32::from_rgb(0x94, 0xA3, 0xB8),
            text_on_accent: Color32::from_rgb(0xFF, 0xFF, 0xFF),
            border_subtle: Color32::from_rgba_premultiplied(255, 255, 255, 13),
            border_strong: Color32::from_rgb(0x47, 0x55, 0x69),
            diagram_fill: Color32::from_rgb(0x0D, 0x11, 0x17),
            diagram_border: Color32::from_rgb(0x30, 0x36, 0x3D),
            spacing_4: 4.0,
            spacing_8: Self::P8,
            spacing_12: 12.0,
            spacing_16: Self::P16,
            spacing_24: Self::P24,
            radius_8: Self::R8,
            radius_12: Self::R12,
            radius_16: 16,
            button_height: 35.0,
        }
    }

    pub fn light() -> Self {
        Self {
            mode: ThemeMode::Light,
            surface_0: Color32::from_rgb(0xE2, 0xE8, 0xF0),
            surface_1: Color32::from_rgb(0xF8, 0xFA, 0xFC),
            surface_2: Color32::from_rgb(0xFF, 0xFF, 0xFF),
            surface_3: Color32::from_rgb(0xF1, 0xF5, 0xF9),
            text_primary: Color32::from_rgb(0x0F, 0x17, 0x2A),
            text_muted: Color32::from_rgb(0x47, 0x55, 0x69),
            border_subtle: Color32::from_rgba_premultiplied(0, 0, 0, 18),
            border_strong: Color32::from_rgb(0xCB, 0xD5, 0xE1),
            // Diagrams keep the dark container in both modes.
            ..Self::dark()
        }
    }

    pub fn apply_visuals(&self, ctx: &egui::Context) {
        let mut visuals = match self.mode {
            ThemeMode::Dark => egui::Visuals::dark(),
            ThemeMode::Light => egui::Visuals::light(),
        };
        visuals.panel_fill = self.surface_1;
        visuals.extreme_bg_color = self.surface_0;
        visuals.override_text_color = Some(self.text_primary);
        visuals.widgets.noninteractive.fg_stroke.color = self.text_primary;
        visuals.widgets.noninteractive.bg_fill = self.surface_2;
        visuals.widgets.noninteractive.weak_bg_fill = self.surface_2;
        visuals.widgets.noninteractive.bg_stroke = Stroke::NONE;
        visuals.widgets.inactive.bg_fill = self.surface_3;
        visuals.widgets.inactive.weak_bg_fill = self.surface_3;
        visuals.widgets.inactive.fg_stroke.color = self.text_primary;
        visuals.widgets.inactive.bg_stroke = Stroke::NONE;
        visuals.widgets.hovered.bg_fill = self.surface_3;
        visuals.widgets.hovered.weak_bg_fill = self.surface_3;
        visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, self.accent_primary);
        visuals.widgets.hovered.fg_stroke.color = self.text_primary;
        visuals.widgets.active.bg_fill = self.accent_muted;
        visuals.widgets.active.bg_stroke = Stroke::NONE;
        visuals.widgets.active.fg_stroke.color = self.text_on_accent;
        visuals.selection.bg_fill = self.accent_muted;
        visuals.hyperlink_color = self.accent_secondary;
        visuals.window_fill = self.surface_2;
        visuals.window_stroke = Stroke::new(1.0, self.border_strong);
        visuals.window_corner_radius = CornerRadius::same(self.radius_16);
        visuals.window_shadow = egui::epaint::Shadow {
            offset: [0, 8],
            blur: 24,
            spread: 0,
            color: Color32::from_rgba_premultiplied(0, 0, 0, 64),
        };
        let mut style = (*ctx.style()).clone();
        style.visuals = visuals;
        style.spacing.item_spacing = egui::vec2(10.0, 10.0);
        style.spacing.button_padding = egui::vec2(12.0, 8.0);
        style.text_styles.insert(TextStyle::Heading, FontId::proportional(26.0));
        style.text_styles.insert(TextStyle::Name("card_title".into()), FontId::proportional(19.0));
        style.text_styles.insert(TextStyle::Body, FontId::proportional(14.5));
        style.text_styles.insert(TextStyle::Monospace, FontId::monospace(13.0));
        style.text_styles.insert(TextStyle::Small, FontId::proportional(12.0));
        ctx.set_style(style);
    }

    pub fn panel_frame(&self, fill: Color32, inner_padding: i8) -> Frame {
        Frame::new()
            .fill(fill)
            .inner_margin(Margin::same(inner_padding))
            .corner_radius(CornerRadius::same(self.radius_12))
            .stroke(Stroke::new(1.0, self.border_strong))
    }

    pub fn card_frame(&self) -> Frame {
        self.panel_frame(self.surface_2, self.spacing_24 as i8)
    }

    /// Header block of a case study: accent bar on the left edge is painted by the caller.
    pub fn header_frame(&self) -> Frame {
        Frame::new()
            .fill(self.surface_2)
            .inner_margin(Margin::same(self.spacing_24 as i8))
            .corner_radius(CornerRadius::same(self.radius_16))
    }

    pub fn tile_frame(&self, border: Color32) -> Frame {
        Frame::new()
            .fill(self.surface_3)
            .inner_margin(Margin::same(self.spacing_16 as i8))
            .corner_radius(CornerRadius::same(self.radius_8))
            .stroke(Stroke::new(2.0, border))
    }

    pub fn code_frame(&self) -> Frame {
        Frame::new()
            .fill(self.diagram_fill)
            .inner_margin(Margin::same(self.spacing_16 as i8))
            .corner_radius(CornerRadius::same(self.radius_8))
            .stroke(Stroke::new(1.0, self.diagram_border))
    }

    pub fn diagram_frame(&self) -> Frame {
        Frame::new()
            .fill(self.diagram_fill)
            .inner_margin(Margin::same(self.spacing_24 as i8))
            .corner_radius(CornerRadius::same(self.radius_12))
            .stroke(Stroke::new(1.0, self.diagram_border))
    }

    pub fn subtle_button_stroke(&self) -> Stroke {
        Stroke::new(1.0, self.border_subtle)
    }
}

/// Parses `#rrggbb` into a color.
pub fn parse_hex_color(raw: &str) -> Option<Color32> {
    let hex = raw.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some(Color32::from_rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Color with the given alpha, for the tinted badge and tab backgrounds.
pub fn tint(color: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_mode_round_trips_through_storage_strings() {
        for mode in [ThemeMode::Dark, ThemeMode::Light] {
            assert_eq!(mode.as_str().parse::<ThemeMode>(), Ok(mode));
        }
        assert!("sepia".parse::<ThemeMode>().is_err());
    }

    #[test]
    fn toggled_flips_between_modes() {
        assert_eq!(ThemeMode::Dark.toggled(), ThemeMode::Light);
        assert_eq!(ThemeMode::Dark.toggled().toggled(), ThemeMode::Dark);
    }

    #[test]
    fn parse_hex_color_accepts_six_digit_hex_only() {
        assert_eq!(
            parse_hex_color("#6366f1"),
            Some(Color32::from_rgb(0x63, 0x66, 0xF1))
        );
        assert_eq!(parse_hex_color("6366f1"), None);
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn light_theme_keeps_dark_diagram_container() {
        let light = Theme::light();
        assert_eq!(light.mode, ThemeMode::Light);
        assert_eq!(light.diagram_fill, Theme::dark().diagram_fill);
        assert_ne!(light.surface_1, Theme::dark().surface_1);
    }
}
