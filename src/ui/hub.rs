use super::{column_count, content_color, UiAction};
use crate::content::{Catalog, GroupProject, ProjectGroup};
use crate::state::View;
use crate::theme::{tint, Theme};
use eframe::egui::{self, CornerRadius, CursorIcon, Margin, RichText, TextStyle};

const TILE_MIN_WIDTH: f32 = 280.0;

pub fn show(ui: &mut egui::Ui, theme: &Theme, catalog: &Catalog) -> Option<UiAction> {
    let mut action = None;

    if ui.button("← Back").clicked() {
        action = Some(UiAction::Back);
    }
    ui.add_space(theme.spacing_8);
    ui.heading("Case Studies");
    ui.label(
        RichText::new("Selected work from banking, trading and platform engineering roles.")
            .color(theme.text_muted),
    );
    ui.add_space(theme.spacing_24);

    for group in &catalog.groups {
        if let Some(clicked) = group_section(ui, theme, group) {
            action = Some(clicked);
        }
        ui.add_space(theme.spacing_24);
    }

    action
}

fn group_section(ui: &mut egui::Ui, theme: &Theme, group: &ProjectGroup) -> Option<UiAction> {
    let color = content_color(Some(&group.color), theme.accent_primary);
    let mut action = None;

    ui.horizontal(|ui| {
        ui.label(RichText::new(&group.icon).size(22.0));
        ui.label(
            RichText::new(&group.title)
                .text_style(TextStyle::Name("card_title".into()))
                .color(color)
                .strong(),
        );
    });
    ui.add_space(theme.spacing_8);

    let columns = column_count(ui.available_width(), TILE_MIN_WIDTH, theme.spacing_16);
    for row in group.projects.chunks(columns) {
        ui.columns(columns, |cells| {
            for (cell, project) in cells.iter_mut().zip(row) {
                if project_tile(cell, theme, project) {
                    action = Some(UiAction::Navigate(View::Project(project.id.clone())));
                }
            }
        });
        ui.add_space(theme.spacing_12);
    }

    action
}

fn project_tile(ui: &mut egui::Ui, theme: &Theme, project: &GroupProject) -> bool {
    let color = content_color(Some(&project.color), theme.accent_primary);
    let frame = theme.tile_frame(color).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.horizontal(|ui| {
            ui.label(RichText::new(&project.icon).size(26.0));
            ui.label(RichText::new(&project.name).strong());
        });
        ui.add_space(theme.spacing_4);
        ui.label(RichText::new(&project.description).color(theme.text_muted).size(13.0));
        if project.case_study.is_some() {
            ui.add_space(theme.spacing_8);
            egui::Frame::new()
                .fill(tint(color, 40))
                .corner_radius(CornerRadius::same(theme.radius_12))
                .inner_margin(Margin::symmetric(10, 4))
                .show(ui, |ui| {
                    ui.label(RichText::new("Case study").color(color).size(12.0));
                });
        }
    });

    let response = frame.response.interact(egui::Sense::click());
    if response.hovered() {
        ui.ctx().set_cursor_icon(CursorIcon::PointingHand);
    }
    response.clicked()
}
