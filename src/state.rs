// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Context state store - single source of truth for the academic context

use crate::persistence::StoredContext;
use crate::types::{ActiveContext, Room, Semester, UserRole, Year};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of the context service.
///
/// Replaces the loose `isLoading`/`error` flag pair: a context is always in
/// exactly one of these phases, so "loading with a stale error" or similar
/// combinations cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", content = "detail", rename_all = "lowercase")]
pub enum Phase {
    /// No initialization attempt has happened yet
    #[default]
    Uninitialized,
    /// An initialize/switch operation is in flight
    Loading,
    /// Backend data is loaded and a selection may be active
    Ready,
    /// The backend reported no years and no semesters; a valid empty state
    Degraded,
    /// The last operation failed; carries the human-readable reason
    Failed(String),
}

impl Phase {
    /// Whether a loading indicator should be visible
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The failure reason, if the context is in the failed phase
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// The mutable context record.
///
/// Only the coordinator mutates this; everything else reads snapshots
/// obtained through [`ContextState::clone`]. Availability lists are replaced
/// wholesale on each backend refresh, never patched in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextState {
    /// Selected year/semester pair, or `None` when nothing is selected
    pub active: Option<ActiveContext>,
    /// Academic years reported by the backend; empty until loaded
    pub available_years: Vec<Year>,
    /// Semesters reported by the backend; empty until loaded
    pub available_semesters: Vec<Semester>,
    /// Distinguishes "semesters not yet fetched" from "fetched empty"
    pub semesters_loaded: bool,
    /// Room cache for the active semester; never authoritative
    pub current_rooms: Vec<Room>,
    /// Role of the signed-in user
    pub user_role: UserRole,
    /// Lifecycle phase (loading/error state included)
    pub phase: Phase,
}

impl ContextState {
    /// Selected year, when a pair is active
    #[must_use]
    pub fn current_year(&self) -> Option<i32> {
        self.active.as_ref().map(|a| a.year)
    }

    /// Selected semester, when a pair is active
    #[must_use]
    pub fn current_semester(&self) -> Option<&Semester> {
        self.active.as_ref().map(|a| &a.semester)
    }

    /// Whether the backend reported any availability at all
    #[must_use]
    pub fn has_backend_data(&self) -> bool {
        !self.available_years.is_empty() || !self.available_semesters.is_empty()
    }

    /// Drop to the hard-coded fallback: no selection, no availability.
    ///
    /// Used when the backend reports nothing or initialization fails; no
    /// synthetic data is invented.
    pub fn apply_fallback(&mut self) {
        self.active = None;
        self.available_years = Vec::new();
        self.available_semesters = Vec::new();
        self.current_rooms = Vec::new();
    }

    /// Reset to the empty default while keeping the known years list
    pub fn reset_keeping_years(&mut self) {
        self.active = None;
        self.available_semesters = Vec::new();
        self.semesters_loaded = false;
        self.current_rooms = Vec::new();
        self.user_role = UserRole::Teacher;
        self.phase = Phase::Ready;
    }

    /// Apply a persisted snapshot, resolving the semester against the
    /// currently available ones.
    ///
    /// Callers must have checked compatibility first (see
    /// [`crate::validation::is_stored_context_compatible`]); a semester id
    /// that resolves to nothing clears the selection rather than keeping an
    /// orphaned pair.
    pub fn apply_stored(&mut self, stored: &StoredContext) {
        let year = stored.current_year;
        let semester = stored
            .current_semester
            .as_ref()
            .and_then(|s| self.available_semesters.iter().find(|a| a.id == s.id))
            .cloned();

        self.active = match (year, semester) {
            (Some(year), Some(semester)) => Some(ActiveContext { year, semester }),
            _ => None,
        };
    }
}
