// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! One-way projection of the context state onto a render port
//!
//! The projector owns the anti-flicker rules: option lists are rebuilt only
//! when they went stale (entry count or placeholder changed), and a selector
//! the user currently interacts with is never overwritten.

use crate::render::{RenderPort, Selector, SelectorOptions};
use crate::state::ContextState;

/// Fingerprint of a rendered option list, used for staleness checks
#[derive(Debug, Clone, PartialEq, Eq)]
struct OptionsFingerprint {
    entry_count: usize,
    placeholder: String,
}

impl OptionsFingerprint {
    fn of(options: &SelectorOptions) -> Self {
        Self {
            entry_count: options.entries.len(),
            placeholder: options.placeholder.clone(),
        }
    }
}

/// Projects [`ContextState`] onto a [`RenderPort`]
#[derive(Debug, Default)]
pub struct Projector {
    last_years: Option<OptionsFingerprint>,
    last_semesters: Option<OptionsFingerprint>,
}

impl Projector {
    /// Create a projector with no rendered state yet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the full context into `port`
    pub fn project(&mut self, state: &ContextState, port: &mut dyn RenderPort) {
        self.project_years(state, port);
        self.project_semesters(state, port);

        port.set_status(&status_line(state));
        port.set_loading(state.phase.is_loading());
        port.set_selectors_enabled(!state.phase.is_loading());
        port.set_error(state.phase.error());
    }

    fn project_years(&mut self, state: &ContextState, port: &mut dyn RenderPort) {
        let options = SelectorOptions::for_years(&state.available_years);
        let fingerprint = OptionsFingerprint::of(&options);
        let stale = self.last_years.as_ref() != Some(&fingerprint);

        if port.is_user_interacting(Selector::Year) {
            // never steal an in-progress interaction, even when stale
            return;
        }

        if stale {
            port.render_years(&options, state.current_year());
            self.last_years = Some(fingerprint);
        } else {
            port.set_selected_year(state.current_year());
        }
    }

    fn project_semesters(&mut self, state: &ContextState, port: &mut dyn RenderPort) {
        let options = SelectorOptions::for_semesters(&state.available_semesters);
        let fingerprint = OptionsFingerprint::of(&options);
        let stale = self.last_semesters.as_ref() != Some(&fingerprint);

        if port.is_user_interacting(Selector::Semester) {
            return;
        }

        if stale {
            let selected = state.current_semester().map(|s| s.id);
            port.render_semesters(&options, selected);
            self.last_semesters = Some(fingerprint);
        } else {
            port.set_selected_semester(state.current_semester().map(|s| s.id));
        }
    }
}

/// Human-readable one-line summary of the current selection
#[must_use]
pub fn status_line(state: &ContextState) -> String {
    let year = state
        .current_year()
        .map_or_else(|| "no year selected".to_string(), |y| format!("academic year {y}"));
    let semester = state
        .current_semester()
        .map_or_else(|| "no semester selected".to_string(), |s| s.name.clone());
    format!("{year} | {semester}")
}
