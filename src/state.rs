//! Per-session UI state: navigation, the modal stack and the access gate.

use crate::content::{Catalog, CaseStudy};
use crate::gate::AccessGate;
use crate::theme::ThemeMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Landing,
    Hub,
    Project(String),
}

impl View {
    pub fn is_gated(&self) -> bool {
        !matches!(self, View::Landing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modal {
    AccessGate,
    Contact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Unlocked,
    Rejected,
}

#[derive(Debug)]
pub struct UiState {
    pub theme: ThemeMode,
    pub password_input: String,
    view: View,
    active_tab: Option<String>,
    modals: Vec<Modal>,
    authenticated: bool,
    pending_view: Option<View>,
    gate_error: bool,
    gate: AccessGate,
}

impl UiState {
    pub fn new(theme: ThemeMode) -> Self {
        Self::with_gate(theme, AccessGate::default())
    }

    pub fn with_gate(theme: ThemeMode, gate: AccessGate) -> Self {
        Self {
            theme,
            password_input: String::new(),
            view: View::Landing,
            active_tab: None,
            modals: Vec::new(),
            authenticated: false,
            pending_view: None,
            gate_error: false,
            gate,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn active_tab(&self) -> Option<&str> {
        self.active_tab.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn gate_error(&self) -> bool {
        self.gate_error
    }

    pub fn pending_view(&self) -> Option<&View> {
        self.pending_view.as_ref()
    }

    pub fn top_modal(&self) -> Option<Modal> {
        self.modals.last().copied()
    }

    pub fn has_modal(&self) -> bool {
        !self.modals.is_empty()
    }

    /// Open modals, bottom first.
    pub fn modals(&self) -> &[Modal] {
        &self.modals
    }

    /// Navigates to `view`, or parks it behind the access gate.
    /// Returns whether the view is now shown.
    pub fn request_view(&mut self, view: View, catalog: &Catalog) -> bool {
        if view.is_gated() && !self.authenticated {
            self.pending_view = Some(view);
            self.gate_error = false;
            self.push_modal(Modal::AccessGate);
            return false;
        }
        self.navigate(view, catalog)
    }

    fn navigate(&mut self, view: View, catalog: &Catalog) -> bool {
        let active_tab = match &view {
            View::Project(id) => {
                if catalog.project(id).is_none() {
                    tracing::warn!(project = %id, "ignoring request for unknown project");
                    return false;
                }
                catalog
                    .case_study_for_project(id)
                    .and_then(CaseStudy::first_tab_id)
                    .map(str::to_string)
            }
            View::Landing | View::Hub => None,
        };
        tracing::debug!(view = ?view, tab = ?active_tab, "navigating");
        self.view = view;
        self.active_tab = active_tab;
        true
    }

    pub fn go_back(&mut self, catalog: &Catalog) {
        let previous = match self.view {
            View::Project(_) => View::Hub,
            View::Hub | View::Landing => View::Landing,
        };
        self.request_view(previous, catalog);
    }

    pub fn submit_password(&mut self, catalog: &Catalog) -> GateOutcome {
        if !self.gate.matches(&self.password_input) {
            self.gate_error = true;
            return GateOutcome::Rejected;
        }

        if !self.authenticated {
            self.authenticated = true;
            tracing::info!("case studies unlocked for this session");
        }
        self.password_input.clear();
        self.gate_error = false;
        self.modals.retain(|modal| *modal != Modal::AccessGate);
        if let Some(view) = self.pending_view.take() {
            self.navigate(view, catalog);
        }
        GateOutcome::Unlocked
    }

    pub fn cancel_gate(&mut self) {
        self.modals.retain(|modal| *modal != Modal::AccessGate);
        self.reset_gate();
    }

    pub fn open_contact(&mut self) {
        self.push_modal(Modal::Contact);
    }

    pub fn close_contact(&mut self) {
        self.modals.retain(|modal| *modal != Modal::Contact);
    }

    /// Escape handling: only the topmost modal closes.
    pub fn close_top_modal(&mut self) -> Option<Modal> {
        let closed = self.modals.pop()?;
        if closed == Modal::AccessGate {
            self.reset_gate();
        }
        Some(closed)
    }

    /// Rejects ids that are not tabs of `study`.
    pub fn select_tab(&mut self, study: &CaseStudy, id: &str) -> bool {
        if study.tab(id).is_none() {
            tracing::warn!(case_study = %study.id, tab = %id, "ignoring unknown tab");
            return false;
        }
        self.active_tab = Some(id.to_string());
        true
    }

    fn push_modal(&mut self, modal: Modal) {
        if self.top_modal() != Some(modal) {
            self.modals.retain(|open| *open != modal);
            self.modals.push(modal);
        }
    }

    fn reset_gate(&mut self) {
        self.pending_view = None;
        self.gate_error = false;
        self.password_input.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SECRET: &str = "let me in";

    fn setup() -> (UiState, Catalog) {
        let catalog = Catalog::load_builtin().expect("embedded content should be valid");
        let state = UiState::with_gate(ThemeMode::Dark, AccessGate::with_passphrase(SECRET));
        (state, catalog)
    }

    #[test]
    fn gated_request_opens_the_gate_and_remembers_the_view() {
        let (mut state, catalog) = setup();
        assert!(!state.request_view(View::Hub, &catalog));
        assert_eq!(state.view(), &View::Landing);
        assert_eq!(state.pending_view(), Some(&View::Hub));
        assert_eq!(state.top_modal(), Some(Modal::AccessGate));
    }

    #[test]
    fn mismatch_sets_the_error_and_keeps_the_input() {
        let (mut state, catalog) = setup();
        state.request_view(View::Hub, &catalog);
        state.password_input = "let me out".to_string();

        assert_eq!(state.submit_password(&catalog), GateOutcome::Rejected);
        assert!(!state.is_authenticated());
        assert!(state.gate_error());
        assert_eq!(state.password_input, "let me out");
        assert_eq!(state.top_modal(), Some(Modal::AccessGate));
        assert_eq!(state.view(), &View::Landing);
    }

    #[test]
    fn exact_secret_unlocks_the_pending_view_once() {
        let (mut state, catalog) = setup();
        state.request_view(View::Project("var-cvar".to_string()), &catalog);
        state.password_input = SECRET.to_string();

        assert_eq!(state.submit_password(&catalog), GateOutcome::Unlocked);
        assert!(state.is_authenticated());
        assert!(state.password_input.is_empty());
        assert!(!state.gate_error());
        assert!(!state.has_modal());
        assert_eq!(state.view(), &View::Project("var-cvar".to_string()));
        assert_eq!(state.pending_view(), None);

        // Later requests go straight through and nothing resets the flag.
        assert!(state.request_view(View::Hub, &catalog));
        state.go_back(&catalog);
        state.close_top_modal();
        state.cancel_gate();
        state.password_input = "wrong".to_string();
        state.submit_password(&catalog);
        assert!(state.is_authenticated());
    }

    #[test]
    fn cancelling_the_gate_drops_pending_state() {
        let (mut state, catalog) = setup();
        state.request_view(View::Hub, &catalog);
        state.password_input = "nope".to_string();
        state.submit_password(&catalog);

        state.cancel_gate();
        assert!(!state.has_modal());
        assert_eq!(state.pending_view(), None);
        assert!(!state.gate_error());
        assert!(state.password_input.is_empty());
        assert!(!state.is_authenticated());
        assert_eq!(state.view(), &View::Landing);
    }

    #[test]
    fn escape_closes_only_the_topmost_modal() {
        let (mut state, catalog) = setup();
        state.open_contact();
        state.request_view(View::Hub, &catalog);
        assert_eq!(state.top_modal(), Some(Modal::AccessGate));

        assert_eq!(state.close_top_modal(), Some(Modal::AccessGate));
        assert_eq!(state.pending_view(), None);
        assert_eq!(state.top_modal(), Some(Modal::Contact));

        assert_eq!(state.close_top_modal(), Some(Modal::Contact));
        assert_eq!(state.close_top_modal(), None);
    }

    #[test]
    fn opening_a_project_resets_to_its_first_tab() {
        let (mut state, catalog) = setup();
        state.password_input = SECRET.to_string();
        state.request_view(View::Project("dark-pool-matching-engine".to_string()), &catalog);
        state.submit_password(&catalog);
        assert_eq!(state.active_tab(), Some("overview"));

        let study = catalog.case_study("dark-pool").expect("dark pool case study");
        assert!(state.select_tab(study, "implementation"));
        assert_eq!(state.active_tab(), Some("implementation"));

        state.request_view(View::Project("var-cvar".to_string()), &catalog);
        let first = catalog
            .case_study("var-cvar")
            .and_then(CaseStudy::first_tab_id)
            .map(str::to_string);
        assert_eq!(state.active_tab().map(str::to_string), first);
    }

    #[test]
    fn unknown_tab_and_project_ids_leave_state_unchanged() {
        let (mut state, catalog) = setup();
        state.password_input = SECRET.to_string();
        state.request_view(View::Project("monolith-to-microservice".to_string()), &catalog);
        state.submit_password(&catalog);
        let study = catalog.case_study("monolith").expect("monolith case study");
        let before = state.active_tab().map(str::to_string);

        assert!(!state.select_tab(study, "no-such-tab"));
        assert_eq!(state.active_tab().map(str::to_string), before);

        assert!(!state.request_view(View::Project("no-such-project".to_string()), &catalog));
        assert_eq!(state.view(), &View::Project("monolith-to-microservice".to_string()));
    }

    #[test]
    fn projects_without_a_case_study_have_no_tab() {
        let (mut state, catalog) = setup();
        state.password_input = SECRET.to_string();
        state.request_view(View::Project("medi-health".to_string()), &catalog);
        state.submit_password(&catalog);
        assert_eq!(state.view(), &View::Project("medi-health".to_string()));
        assert_eq!(state.active_tab(), None);
    }

    #[test]
    fn back_walks_project_to_hub_to_landing() {
        let (mut state, catalog) = setup();
        state.password_input = SECRET.to_string();
        state.request_view(View::Project("openlink-derivatives".to_string()), &catalog);
        state.submit_password(&catalog);

        state.go_back(&catalog);
        assert_eq!(state.view(), &View::Hub);
        state.go_back(&catalog);
        assert_eq!(state.view(), &View::Landing);
    }
}
