use super::{blocks, content_color, UiAction};
use crate::content::{CaseStudy, GroupProject};
use crate::diagram::view::DiagramView;
use crate::diagram::DiagramEngine;
use crate::theme::{tint, Theme};
use eframe::egui::{self, CornerRadius, RichText, Stroke};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Case-study page. Owns the diagram views of the tab on screen.
pub struct CaseStudyPanel {
    engine: Arc<dyn DiagramEngine>,
    runtime: Handle,
    mounted: Option<(String, String)>,
    diagrams: Vec<DiagramView>,
}

impl CaseStudyPanel {
    pub fn new(engine: Arc<dyn DiagramEngine>, runtime: Handle) -> Self {
        Self {
            engine,
            runtime,
            mounted: None,
            diagrams: Vec::new(),
        }
    }

    pub fn mounted_diagrams(&self) -> usize {
        self.diagrams.len()
    }

    /// Drops every diagram view; the next mount renders from scratch.
    pub fn unmount(&mut self) {
        if self.mounted.take().is_some() && self.mounted_diagrams() > 0 {
            tracing::debug!(diagrams = self.mounted_diagrams(), "unmounting diagrams");
        }
        // Dropping a view evicts its SVG from egui's image caches.
        self.diagrams.clear();
    }

    fn mount(&mut self, study_id: &str, tab_id: &str) {
        let key = (study_id.to_string(), tab_id.to_string());
        if self.mounted.as_ref() != Some(&key) {
            self.unmount();
            self.mounted = Some(key);
        }
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        theme: &Theme,
        study: &CaseStudy,
        active_tab: &str,
    ) -> Option<UiAction> {
        let accent = content_color(Some(&study.accent), theme.accent_primary);
        let mut action = None;

        if ui.button("← Back to Case Studies").clicked() {
            action = Some(UiAction::Back);
        }
        ui.add_space(theme.spacing_8);

        let header = theme.header_frame().show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.label(RichText::new(&study.icon).size(40.0));
                ui.vertical(|ui| {
                    ui.heading(RichText::new(&study.title).strong());
                    ui.label(RichText::new(&study.subtitle).color(theme.text_muted));
                });
            });
        });
        let bar = egui::Rect::from_min_size(
            header.response.rect.min,
            egui::vec2(5.0, header.response.rect.height()),
        );
        ui.painter().rect_filled(bar, CornerRadius::same(2), accent);
        ui.add_space(theme.spacing_16);

        ui.horizontal_wrapped(|ui| {
            for tab in &study.tabs {
                let selected = tab.id == active_tab;
                let (fill, stroke) = if selected {
                    (tint(accent, 70), Stroke::new(1.0, accent))
                } else {
                    (theme.surface_3, theme.subtle_button_stroke())
                };
                let button = egui::Button::new(&tab.label)
                    .fill(fill)
                    .stroke(stroke)
                    .corner_radius(CornerRadius::same(theme.radius_8));
                if ui.add(button).clicked() && !selected {
                    action = Some(UiAction::SelectTab(tab.id.clone()));
                }
            }
        });
        ui.add_space(theme.spacing_16);

        let Some(tab) = study.tab(active_tab) else {
            return action;
        };
        self.mount(&study.id, &tab.id);

        let ctx = ui.ctx().clone();
        let engine = &self.engine;
        let runtime = &self.runtime;
        let diagrams = &mut self.diagrams;
        let mut next_diagram = 0;
        let mut show_diagram = |ui: &mut egui::Ui, chart: &str| {
            if diagrams.len() == next_diagram {
                diagrams.push(DiagramView::new(Arc::clone(engine), runtime.clone()));
            }
            let view = &mut diagrams[next_diagram];
            view.set_chart(chart, Some(&ctx));
            view.show(ui, theme);
            next_diagram += 1;
        };

        for card in &tab.cards {
            blocks::show_card(ui, theme, accent, card, &mut show_diagram);
            ui.add_space(theme.spacing_16);
        }

        action
    }

    /// Page for a project that has no published case study.
    pub fn show_summary(
        &mut self,
        ui: &mut egui::Ui,
        theme: &Theme,
        project: &GroupProject,
    ) -> Option<UiAction> {
        self.unmount();
        let mut action = None;
        if ui.button("← Back to Case Studies").clicked() {
            action = Some(UiAction::Back);
        }
        ui.add_space(theme.spacing_8);

        let accent = content_color(Some(&project.color), theme.accent_primary);
        theme.card_frame().show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.label(RichText::new(&project.icon).size(36.0));
                ui.heading(RichText::new(&project.name).color(accent).strong());
            });
            ui.add_space(theme.spacing_12);
            ui.label(&project.description);
            ui.add_space(theme.spacing_12);
            ui.label(
                RichText::new("A detailed write-up for this project is not published yet.")
                    .color(theme.text_muted)
                    .italics(),
            );
        });
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Catalog;
    use crate::diagram::native::NativeEngine;
    use crate::diagram::view::RenderState;
    use pretty_assertions::assert_eq;

    fn show_tab(
        ctx: &egui::Context,
        panel: &mut CaseStudyPanel,
        study: &CaseStudy,
        tab_id: &str,
    ) -> Option<UiAction> {
        let theme = Theme::dark();
        let mut action = None;
        ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    action = panel.show(ui, &theme, study, tab_id);
                });
            });
        });
        action
    }

    fn render_targets(panel: &CaseStudyPanel) -> Vec<String> {
        panel
            .diagrams
            .iter()
            .filter_map(|view| match view.state() {
                RenderState::Rendering { target } => Some(target.clone()),
                RenderState::Rendered(diagram) => Some(diagram.target.clone()),
                RenderState::Idle | RenderState::Failed => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn showing_a_tab_mounts_exactly_its_diagrams() {
        let catalog = Catalog::load_builtin().expect("embedded content should be valid");
        let study = catalog.case_study("dark-pool").expect("dark pool case study");
        let diagram_tab = study
            .tabs
            .iter()
            .find(|tab| tab.diagrams().next().is_some())
            .expect("a tab with diagrams");
        let plain_tab = study
            .tabs
            .iter()
            .find(|tab| tab.diagrams().next().is_none())
            .expect("a tab without diagrams");

        let ctx = egui::Context::default();
        let mut panel = CaseStudyPanel::new(Arc::new(NativeEngine), Handle::current());

        assert_eq!(show_tab(&ctx, &mut panel, study, &diagram_tab.id), None);
        assert_eq!(panel.mounted_diagrams(), diagram_tab.diagrams().count());
        let charts: Vec<&str> = panel.diagrams.iter().filter_map(|view| view.chart()).collect();
        assert_eq!(charts, diagram_tab.diagrams().collect::<Vec<_>>());
        let first_targets = render_targets(&panel);
        assert_eq!(first_targets.len(), diagram_tab.diagrams().count());

        show_tab(&ctx, &mut panel, study, &diagram_tab.id);
        assert_eq!(render_targets(&panel), first_targets, "redrawing the same tab keeps its views");

        show_tab(&ctx, &mut panel, study, &plain_tab.id);
        assert_eq!(panel.mounted_diagrams(), 0);

        show_tab(&ctx, &mut panel, study, &diagram_tab.id);
        assert_eq!(panel.mounted_diagrams(), diagram_tab.diagrams().count());
        let second_targets = render_targets(&panel);
        assert_eq!(second_targets.len(), first_targets.len());
        assert!(second_targets.iter().all(|target| !first_targets.contains(target)));

        panel.unmount();
        assert_eq!(panel.mounted_diagrams(), 0);
    }

    #[tokio::test]
    async fn unknown_tab_mounts_nothing() {
        let catalog = Catalog::load_builtin().expect("embedded content should be valid");
        let study = catalog.case_study("dark-pool").expect("dark pool case study");
        let ctx = egui::Context::default();
        let mut panel = CaseStudyPanel::new(Arc::new(NativeEngine), Handle::current());

        show_tab(&ctx, &mut panel, study, "no-such-tab");
        assert_eq!(panel.mounted_diagrams(), 0);
    }
}
