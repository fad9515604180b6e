//! Rendering for the content blocks inside a case-study card.

use super::{column_count, content_color};
use crate::content::{Block, Card, Metric, Question, Tile};
use crate::theme::{tint, Theme};
use eframe::egui::{self, Color32, CornerRadius, Margin, RichText, ScrollArea, TextStyle};
use egui_extras::syntax_highlighting::{self, CodeTheme};

const TILE_MIN_WIDTH: f32 = 220.0;
const METRIC_MIN_WIDTH: f32 = 160.0;

/// Draws one card. Diagram blocks are handed to `diagram` with their description.
pub fn show_card(
    ui: &mut egui::Ui,
    theme: &Theme,
    accent: Color32,
    card: &Card,
    diagram: &mut dyn FnMut(&mut egui::Ui, &str),
) {
    theme.card_frame().show(ui, |ui| {
        ui.set_width(ui.available_width());
        let title = match &card.icon {
            Some(icon) => format!("{icon} {}", card.title),
            None => card.title.clone(),
        };
        ui.label(
            RichText::new(title)
                .text_style(TextStyle::Name("card_title".into()))
                .strong(),
        );
        ui.add_space(theme.spacing_12);

        for (index, block) in card.blocks.iter().enumerate() {
            if index > 0 {
                ui.add_space(theme.spacing_12);
            }
            show_block(ui, theme, accent, block, (&card.title, index), diagram);
        }
    });
}

fn show_block(
    ui: &mut egui::Ui,
    theme: &Theme,
    accent: Color32,
    block: &Block,
    salt: (&str, usize),
    diagram: &mut dyn FnMut(&mut egui::Ui, &str),
) {
    match block {
        Block::Paragraph { text } => {
            ui.label(RichText::new(text).color(theme.text_primary));
        }
        Block::Bullets {
            heading,
            color,
            marker,
            items,
        } => {
            let color = content_color(color.as_deref(), accent);
            if let Some(heading) = heading {
                ui.label(RichText::new(heading).color(color).strong());
                ui.add_space(theme.spacing_4);
            }
            let marker = marker.as_deref().unwrap_or("•");
            for item in items {
                ui.horizontal_wrapped(|ui| {
                    ui.label(RichText::new(marker).color(color));
                    ui.add(egui::Label::new(RichText::new(item).color(theme.text_primary)).wrap());
                });
            }
        }
        Block::Badges { color, items } => {
            let color = content_color(color.as_deref(), accent);
            ui.horizontal_wrapped(|ui| {
                for item in items {
                    badge(ui, theme, item, color);
                }
            });
        }
        Block::Tiles { tiles } => tile_grid(ui, theme, accent, tiles),
        Block::Metrics { metrics } => metric_row(ui, theme, accent, metrics),
        Block::Role { role, duration } => {
            ui.horizontal_wrapped(|ui| {
                ui.label(RichText::new("Role:").color(theme.text_muted));
                ui.label(RichText::new(role).strong());
                ui.separator();
                ui.label(RichText::new("Duration:").color(theme.text_muted));
                ui.label(RichText::new(duration).strong());
            });
        }
        Block::Formula { text } => {
            egui::Frame::new()
                .fill(theme.surface_0)
                .corner_radius(CornerRadius::same(theme.radius_8))
                .inner_margin(Margin::same(theme.spacing_12 as i8))
                .show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    ui.vertical_centered(|ui| {
                        ui.label(RichText::new(text).monospace().color(accent));
                    });
                });
        }
        Block::Code { language, code } => {
            theme.code_frame().show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(RichText::new(language).color(theme.text_muted).size(12.0));
                ui.add_space(theme.spacing_4);
                ScrollArea::horizontal()
                    .id_salt(("code", salt))
                    .show(ui, |ui| {
                        let code_theme = CodeTheme::from_style(ui.style());
                        syntax_highlighting::code_view_ui(ui, &code_theme, code, language);
                    });
            });
        }
        Block::Diagram { chart } => diagram(ui, chart),
        Block::Questions { color, items } => {
            questions(ui, theme, content_color(color.as_deref(), accent), items)
        }
    }
}

fn badge(ui: &mut egui::Ui, theme: &Theme, text: &str, color: Color32) {
    egui::Frame::new()
        .fill(tint(color, 40))
        .corner_radius(CornerRadius::same(theme.radius_12))
        .inner_margin(Margin::symmetric(10, 4))
        .show(ui, |ui| {
            ui.label(RichText::new(text).color(color).size(12.0));
        });
}

fn tile_grid(ui: &mut egui::Ui, theme: &Theme, accent: Color32, tiles: &[Tile]) {
    let columns = column_count(ui.available_width(), TILE_MIN_WIDTH, theme.spacing_12);
    for row in tiles.chunks(columns) {
        ui.columns(columns, |cells| {
            for (cell, tile) in cells.iter_mut().zip(row) {
                let color = content_color(tile.color.as_deref(), accent);
                theme.tile_frame(color).show(cell, |ui| {
                    ui.set_width(ui.available_width());
                    let title = match &tile.icon {
                        Some(icon) => format!("{icon} {}", tile.title),
                        None => tile.title.clone(),
                    };
                    ui.label(RichText::new(title).strong());
                    if let Some(value) = &tile.value {
                        ui.label(RichText::new(value).color(color).size(20.0).strong());
                    }
                    if let Some(detail) = &tile.detail {
                        ui.label(RichText::new(detail).color(theme.text_muted).size(13.0));
                    }
                });
            }
        });
    }
}

fn metric_row(ui: &mut egui::Ui, theme: &Theme, accent: Color32, metrics: &[Metric]) {
    let columns = column_count(ui.available_width(), METRIC_MIN_WIDTH, theme.spacing_12);
    for row in metrics.chunks(columns) {
        ui.columns(columns, |cells| {
            for (cell, metric) in cells.iter_mut().zip(row) {
                theme.tile_frame(tint(accent, 90)).show(cell, |ui| {
                    ui.set_width(ui.available_width());
                    ui.vertical_centered(|ui| {
                        ui.label(RichText::new(&metric.value).color(accent).size(24.0).strong());
                        ui.label(RichText::new(&metric.label).color(theme.text_muted).size(12.0));
                    });
                });
            }
        });
    }
}

fn questions(ui: &mut egui::Ui, theme: &Theme, accent: Color32, items: &[Question]) {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            ui.add_space(theme.spacing_12);
        }
        ui.label(RichText::new(format!("Q{}: {}", index + 1, item.q)).color(accent).strong());
        ui.add_space(theme.spacing_4);
        ui.horizontal_wrapped(|ui| {
            ui.label(RichText::new("A:").color(theme.accent_secondary).strong());
            ui.add(egui::Label::new(RichText::new(&item.a).color(theme.text_muted)).wrap());
        });
        if index + 1 < items.len() {
            ui.add_space(theme.spacing_8);
            ui.separator();
        }
    }
}
