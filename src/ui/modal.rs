use super::UiAction;
use crate::content::Contact;
use crate::state::UiState;
use crate::theme::Theme;
use eframe::egui::{self, Id, Key, RichText};

const MODAL_WIDTH: f32 = 380.0;

pub fn access_gate(ctx: &egui::Context, theme: &Theme, state: &mut UiState) -> Option<UiAction> {
    let mut action = None;
    let modal = egui::Modal::new(Id::new("access_gate")).show(ctx, |ui| {
        ui.set_width(MODAL_WIDTH);
        ui.heading("🔒 Protected Content");
        ui.add_space(theme.spacing_8);
        ui.label(RichText::new("Enter the password to view the case studies.").color(theme.text_muted));
        ui.add_space(theme.spacing_12);

        let response = ui.add(
            egui::TextEdit::singleline(&mut state.password_input)
                .password(true)
                .hint_text("Password")
                .desired_width(f32::INFINITY),
        );
        if ui.memory(|memory| memory.focused().is_none()) {
            response.request_focus();
        }
        if response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
            action = Some(UiAction::SubmitPassword);
        }

        if state.gate_error() {
            ui.add_space(theme.spacing_4);
            ui.label(RichText::new("Incorrect password. Please try again.").color(theme.danger));
        }

        ui.add_space(theme.spacing_12);
        ui.horizontal(|ui| {
            if ui.button("Cancel").clicked() {
                action = Some(UiAction::CancelGate);
            }
            let unlock = egui::Button::new(RichText::new("Unlock").color(theme.text_on_accent))
                .fill(theme.accent_primary);
            if ui.add(unlock).clicked() {
                action = Some(UiAction::SubmitPassword);
            }
        });
    });

    if action.is_none() && modal.backdrop_response.clicked() {
        action = Some(UiAction::CancelGate);
    }
    action
}

pub fn contact(ctx: &egui::Context, theme: &Theme, contact: &Contact) -> Option<UiAction> {
    let mut action = None;
    let modal = egui::Modal::new(Id::new("contact")).show(ctx, |ui| {
        ui.set_width(MODAL_WIDTH);
        ui.heading("Get in Touch");
        ui.add_space(theme.spacing_12);

        if ui.link(format!("✉ {}", contact.email)).clicked() {
            action = Some(UiAction::OpenUrl(contact.mailto()));
        }
        for link in &contact.links {
            if ui.link(&link.label).on_hover_text(&link.url).clicked() {
                action = Some(UiAction::OpenUrl(link.url.clone()));
            }
        }

        ui.add_space(theme.spacing_16);
        if ui.button("Close").clicked() {
            action = Some(UiAction::CloseContact);
        }
    });

    if action.is_none() && modal.backdrop_response.clicked() {
        action = Some(UiAction::CloseContact);
    }
    action
}
