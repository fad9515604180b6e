use crate::content::Catalog;
use crate::diagram::DiagramEngine;
use crate::prefs::{self, store::KeyValueStore};
use crate::state::{GateOutcome, Modal, UiState, View};
use crate::theme::{Theme, ThemeMode};
use crate::ui::case_study::CaseStudyPanel;
use crate::ui::particles::{ParticleField, PARTICLE_COUNT};
use crate::ui::{gallery, hub, modal, UiAction};
use eframe::egui::{self, Key, Margin, Modifiers, RichText, ScrollArea};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

const PARTICLE_FRAME: Duration = Duration::from_millis(33);

pub struct FolioApp {
    catalog: Catalog,
    store: Box<dyn KeyValueStore>,
    state: UiState,
    theme: Theme,
    applied_theme: Option<ThemeMode>,
    case_study: CaseStudyPanel,
    particles: Option<ParticleField>,
}

impl FolioApp {
    pub fn new(
        catalog: Catalog,
        store: Box<dyn KeyValueStore>,
        engine: Arc<dyn DiagramEngine>,
        runtime: Handle,
    ) -> Self {
        let mode = prefs::load_theme(store.as_ref());
        Self {
            catalog,
            store,
            state: UiState::new(mode),
            theme: Theme::for_mode(mode),
            applied_theme: None,
            case_study: CaseStudyPanel::new(engine, runtime),
            particles: None,
        }
    }

    fn apply_theme(&mut self, ctx: &egui::Context) {
        if self.applied_theme == Some(self.state.theme) {
            return;
        }
        self.theme = Theme::for_mode(self.state.theme);
        self.theme.apply_visuals(ctx);
        self.applied_theme = Some(self.state.theme);
    }

    fn toggle_theme(&mut self) {
        self.state.theme = match prefs::toggle_theme(self.store.as_mut(), self.state.theme) {
            Ok(mode) => mode,
            Err(err) => {
                tracing::warn!(error = %err, "failed to persist theme preference");
                self.state.theme.toggled()
            }
        };
    }

    fn handle_escape(&mut self, ctx: &egui::Context) {
        if self.state.has_modal()
            && ctx.input_mut(|i| i.consume_key(Modifiers::NONE, Key::Escape))
        {
            self.state.close_top_modal();
        }
    }

    fn sync_particles(&mut self, ctx: &egui::Context) {
        let on_landing = *self.state.view() == View::Landing;
        match (&self.particles, on_landing) {
            (None, true) => {
                let now = ctx.input(|i| i.time);
                self.particles = Some(ParticleField::spawn(
                    PARTICLE_COUNT,
                    &mut rand::thread_rng(),
                    now,
                ));
                tracing::debug!(count = PARTICLE_COUNT, "particles mounted");
            }
            (Some(_), false) => {
                self.particles = None;
                tracing::debug!("particles unmounted");
            }
            _ => {}
        }
    }

    fn apply_action(&mut self, ctx: &egui::Context, action: UiAction) {
        match action {
            UiAction::Navigate(view) => {
                self.state.request_view(view, &self.catalog);
            }
            UiAction::Back => self.state.go_back(&self.catalog),
            UiAction::SelectTab(tab_id) => {
                if let View::Project(project_id) = self.state.view().clone() {
                    if let Some(study) = self.catalog.case_study_for_project(&project_id) {
                        self.state.select_tab(study, &tab_id);
                    }
                }
            }
            UiAction::OpenUrl(url) => {
                tracing::info!(url = %url, "opening link");
                ctx.open_url(egui::OpenUrl::new_tab(url));
            }
            UiAction::ToggleTheme => self.toggle_theme(),
            UiAction::OpenContact => self.state.open_contact(),
            UiAction::CloseContact => self.state.close_contact(),
            UiAction::SubmitPassword => {
                if self.state.submit_password(&self.catalog) == GateOutcome::Rejected {
                    tracing::debug!("access gate rejected input");
                }
            }
            UiAction::CancelGate => self.state.cancel_gate(),
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) -> Option<UiAction> {
        let mut action = None;
        egui::TopBottomPanel::top("top_bar")
            .frame(egui::Frame::new().fill(self.theme.surface_2).inner_margin(Margin::same(12)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.strong(&self.catalog.site.owner);
                    if self.state.is_authenticated() {
                        ui.label(RichText::new("🔓 unlocked").color(self.theme.success).size(12.0));
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let toggle_label = match self.state.theme {
                            ThemeMode::Dark => "☀ Light",
                            ThemeMode::Light => "🌙 Dark",
                        };
                        if ui.button(toggle_label).clicked() {
                            action = Some(UiAction::ToggleTheme);
                        }
                        if ui.button("✉ Contact").clicked() {
                            action = Some(UiAction::OpenContact);
                        }
                    });
                });
            });
        action
    }

    fn render_page(&mut self, ui: &mut egui::Ui) -> Option<UiAction> {
        match self.state.view().clone() {
            View::Landing => {
                self.case_study.unmount();
                gallery::show(ui, &self.theme, &self.catalog.site)
            }
            View::Hub => {
                self.case_study.unmount();
                hub::show(ui, &self.theme, &self.catalog)
            }
            View::Project(project_id) => {
                let study = self.catalog.case_study_for_project(&project_id);
                match (study, self.state.active_tab()) {
                    (Some(study), Some(tab)) => {
                        self.case_study.show(ui, &self.theme, study, tab)
                    }
                    _ => match self.catalog.project(&project_id) {
                        Some(project) => self.case_study.show_summary(ui, &self.theme, project),
                        None => Some(UiAction::Back),
                    },
                }
            }
        }
    }

    fn paint_particles(&self, ui: &egui::Ui) {
        if let Some(particles) = &self.particles {
            let now = ui.input(|i| i.time);
            particles.paint(ui.painter(), ui.max_rect(), now, self.theme.accent_primary);
            ui.ctx().request_repaint_after(PARTICLE_FRAME);
        }
    }

    fn render_central_panel(&mut self, ctx: &egui::Context) -> Option<UiAction> {
        let mut action = None;
        let scrolling = !self.state.has_modal();
        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(self.theme.surface_1).inner_margin(Margin::same(24)))
            .show(ctx, |ui| {
                self.paint_particles(ui);

                ScrollArea::vertical()
                    .id_salt("page")
                    .enable_scrolling(scrolling)
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        ui.set_max_width(ui.available_width().min(1200.0));
                        action = self.render_page(ui);
                    });
            });
        action
    }

    fn render_modals(&mut self, ctx: &egui::Context) -> Option<UiAction> {
        let mut action = None;
        // Later `Modal::show` calls stack on top, so walk the stack bottom-up.
        for which in self.state.modals().to_vec() {
            let result = match which {
                Modal::AccessGate => modal::access_gate(ctx, &self.theme, &mut self.state),
                Modal::Contact => modal::contact(ctx, &self.theme, &self.catalog.site.contact),
            };
            if result.is_some() {
                action = result;
            }
        }
        action
    }
}

impl eframe::App for FolioApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_theme(ctx);
        self.handle_escape(ctx);
        self.sync_particles(ctx);

        let actions = [
            self.render_top_bar(ctx),
            self.render_central_panel(ctx),
            self.render_modals(ctx),
        ];
        for action in actions.into_iter().flatten() {
            self.apply_action(ctx, action);
        }
    }
}
