use super::{column_count, UiAction};
use crate::content::{ProjectSummary, Site};
use crate::state::View;
use crate::theme::{tint, Theme};
use eframe::egui::load::{SizeHint, TexturePoll};
use eframe::egui::{self, CornerRadius, CursorIcon, RichText, TextStyle, TextureOptions};

const CARD_MIN_WIDTH: f32 = 300.0;
const CARD_MIN_HEIGHT: f32 = 230.0;
const SCREENSHOT_HEIGHT: f32 = 150.0;
const GLOW_RADIUS: f32 = 110.0;

/// Landing page: owner header, the gated entry button and the external project cards.
pub fn show(ui: &mut egui::Ui, theme: &Theme, site: &Site) -> Option<UiAction> {
    let mut action = None;

    ui.vertical_centered(|ui| {
        ui.add_space(theme.spacing_24);
        ui.heading(RichText::new(&site.owner).strong());
        ui.label(RichText::new(&site.tagline).color(theme.text_muted).size(16.0));
        ui.add_space(theme.spacing_16);
        let button = egui::Button::new(
            RichText::new("🔒 Case Studies").color(theme.text_on_accent),
        )
        .fill(theme.accent_primary)
        .min_size(egui::vec2(0.0, theme.button_height));
        if ui.add(button).clicked() {
            action = Some(UiAction::Navigate(View::Hub));
        }
    });
    ui.add_space(theme.spacing_24);

    let columns = column_count(ui.available_width(), CARD_MIN_WIDTH, theme.spacing_16);
    for row in site.projects.chunks(columns) {
        ui.columns(columns, |cells| {
            for (cell, project) in cells.iter_mut().zip(row) {
                if let Some(clicked) = project_card(cell, theme, project) {
                    action = Some(clicked);
                }
            }
        });
        ui.add_space(theme.spacing_16);
    }

    action
}

fn project_card(ui: &mut egui::Ui, theme: &Theme, project: &ProjectSummary) -> Option<UiAction> {
    let mut visit = false;
    let frame = theme.card_frame().show(ui, |ui| {
        ui.set_min_height(CARD_MIN_HEIGHT);
        ui.set_width(ui.available_width());
        screenshot(ui, theme, project);
        ui.add_space(theme.spacing_12);
        ui.label(RichText::new(&project.icon).size(36.0));
        ui.add_space(theme.spacing_8);
        ui.label(
            RichText::new(&project.title)
                .text_style(TextStyle::Name("card_title".into()))
                .strong(),
        );
        ui.label(RichText::new(&project.url).color(theme.accent_secondary).size(12.0));
        ui.add_space(theme.spacing_8);
        ui.label(RichText::new(&project.description).color(theme.text_muted));
        ui.add_space(theme.spacing_12);
        visit = ui
            .add(egui::Button::new("Visit Site →").stroke(theme.subtle_button_stroke()))
            .clicked();
    });

    let rect = frame.response.rect;
    let response = frame.response.interact(egui::Sense::click());
    if ui.rect_contains_pointer(rect) {
        if let Some(pointer) = ui.ctx().pointer_hover_pos() {
            ui.painter()
                .with_clip_rect(rect)
                .circle_filled(pointer, GLOW_RADIUS, tint(theme.accent_primary, 22));
        }
        ui.ctx().set_cursor_icon(CursorIcon::PointingHand);
    }

    (visit || response.clicked()).then(|| UiAction::OpenUrl(project.link.clone()))
}

/// The project's screenshot once loaded; until then, or when it fails, a placeholder.
fn screenshot(ui: &mut egui::Ui, theme: &Theme, project: &ProjectSummary) {
    let width = ui.available_width();
    let texture = project.screenshot.as_deref().and_then(|uri| {
        match ui.ctx().try_load_texture(uri, TextureOptions::LINEAR, SizeHint::Width(width as u32)) {
            Ok(TexturePoll::Ready { texture }) => Some(texture),
            Ok(TexturePoll::Pending { .. }) => None,
            Err(err) => {
                tracing::trace!(uri, error = %err, "screenshot unavailable");
                None
            }
        }
    });

    if let Some(texture) = texture {
        ui.add(
            egui::Image::from_texture(texture)
                .max_size(egui::vec2(width, SCREENSHOT_HEIGHT))
                .maintain_aspect_ratio(true)
                .corner_radius(CornerRadius::same(theme.radius_8)),
        );
        return;
    }

    egui::Frame::new()
        .fill(theme.surface_3)
        .corner_radius(CornerRadius::same(theme.radius_8))
        .show(ui, |ui| {
            ui.set_width(width);
            ui.set_height(SCREENSHOT_HEIGHT);
            ui.vertical_centered(|ui| {
                ui.add_space(theme.spacing_16);
                ui.label(RichText::new(project.fallback_icon()).size(56.0).strong());
                ui.label(RichText::new(&project.title).strong());
                ui.label(
                    RichText::new(format!("Visit {}", project.url))
                        .color(theme.text_muted)
                        .size(12.0),
                );
            });
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Catalog;
    use eframe::egui::epaint::ClippedShape;
    use eframe::egui::Shape;

    fn painted_text(shapes: &[ClippedShape]) -> Vec<String> {
        shapes
            .iter()
            .filter_map(|clipped| match &clipped.shape {
                Shape::Text(text) => Some(text.galley.text().to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn missing_screenshot_falls_back_to_the_icon() {
        let catalog = Catalog::load_builtin().expect("embedded content should be valid");
        let mut project = catalog.site.projects[0].clone();
        project.screenshot = Some("file:///nonexistent/folio/shot.png".to_string());
        let theme = Theme::dark();

        let ctx = egui::Context::default();
        let output = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| screenshot(ui, &theme, &project));
        });
        let text = painted_text(&output.shapes);
        assert!(text.contains(&project.icon), "painted text was {text:?}");
        assert!(text.contains(&format!("Visit {}", project.url)));
    }

    #[test]
    fn placeholder_prefers_the_screenshot_icon() {
        let catalog = Catalog::load_builtin().expect("embedded content should be valid");
        let sringlish = catalog
            .site
            .projects
            .iter()
            .find(|project| project.id == "sringlish")
            .expect("sringlish card");
        assert_eq!(sringlish.fallback_icon(), "අ");

        let mut plain = sringlish.clone();
        plain.screenshot_icon = None;
        plain.icon = "🌐".to_string();
        assert_eq!(plain.fallback_icon(), "🌐");
        assert!(catalog.site.projects.iter().all(|project| project.screenshot.is_some()));
    }
}
