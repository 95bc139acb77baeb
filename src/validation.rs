// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Validation rules for years, semesters, stored snapshots, and user access
//!
//! Everything here is pure: functions read the state they are given and
//! return typed results, nothing is mutated.

use crate::persistence::StoredContext;
use crate::state::ContextState;
use crate::types::{Semester, UserRole, Year};
use chrono::{Datelike, Utc};
use thiserror::Error;

/// Lowest plausible academic year (Buddhist era)
pub const MIN_ACADEMIC_YEAR: i32 = 2500;
/// Highest plausible academic year (Buddhist era)
pub const MAX_ACADEMIC_YEAR: i32 = 3000;
/// Offset between the Gregorian and Buddhist calendars
pub const BUDDHIST_ERA_OFFSET: i32 = 543;

/// Access rules applied when a non-admin selects a year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    /// How far (in years) a teacher may stray from the current year
    pub max_year_distance: i32,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            max_year_distance: 2,
        }
    }
}

/// A failed validation check, with a human-readable reason
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Year is outside the plausible Buddhist-era range
    #[error("year {0} must be between {MIN_ACADEMIC_YEAR}-{MAX_ACADEMIC_YEAR}")]
    YearOutOfRange(i32),
    /// Year is plausible but the backend does not offer it
    #[error("year {0} not available")]
    YearNotAvailable(i32),
    /// Semester id does not exist in the available semesters
    #[error("semester {0} not found")]
    SemesterNotFound(i64),
    /// The user's role does not permit selecting this year
    #[error("access denied: year {year} too far from {reference_year}")]
    AccessDenied {
        /// The requested year
        year: i32,
        /// The current Buddhist-era year the distance is measured from
        reference_year: i32,
    },
}

/// Diagnostic result of [`check_context_integrity`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    /// True when no issues were found
    pub is_valid: bool,
    /// Human-readable descriptions of every detected issue
    pub issues: Vec<String>,
}

/// The current Buddhist-era calendar year
#[must_use]
pub fn current_buddhist_year() -> i32 {
    Utc::now().year() + BUDDHIST_ERA_OFFSET
}

/// Structural check of a stored snapshot: a plausible year and a semester
/// record are both present. Existence against backend availability is NOT
/// checked here; see [`is_stored_context_compatible`].
#[must_use]
pub fn is_context_valid(stored: &StoredContext) -> bool {
    let year_ok = stored
        .current_year
        .is_some_and(|y| (MIN_ACADEMIC_YEAR..=MAX_ACADEMIC_YEAR).contains(&y));
    year_ok && stored.current_semester.is_some()
}

/// Whether a stored snapshot may be applied on top of the given state:
/// structurally valid, and both its year and its semester id still exist in
/// the backend-reported availability.
#[must_use]
pub fn is_stored_context_compatible(state: &ContextState, stored: &StoredContext) -> bool {
    if !is_context_valid(stored) {
        return false;
    }

    let year_exists = stored
        .current_year
        .is_some_and(|y| state.available_years.iter().any(|a| a.year == y));

    let semester_exists = stored
        .current_semester
        .as_ref()
        .is_some_and(|s| state.available_semesters.iter().any(|a| a.id == s.id));

    year_exists && semester_exists
}

/// Validate a year: range check, then existence against availability.
///
/// # Errors
///
/// Returns [`ValidationError::YearOutOfRange`] or
/// [`ValidationError::YearNotAvailable`].
pub fn validate_year(state: &ContextState, year: i32) -> Result<Year, ValidationError> {
    if !(MIN_ACADEMIC_YEAR..=MAX_ACADEMIC_YEAR).contains(&year) {
        return Err(ValidationError::YearOutOfRange(year));
    }

    state
        .available_years
        .iter()
        .find(|y| y.year == year)
        .copied()
        .ok_or(ValidationError::YearNotAvailable(year))
}

/// Validate a semester id against the available semesters.
///
/// # Errors
///
/// Returns [`ValidationError::SemesterNotFound`] when the id is absent.
pub fn validate_semester(state: &ContextState, semester_id: i64) -> Result<Semester, ValidationError> {
    state
        .available_semesters
        .iter()
        .find(|s| s.id == semester_id)
        .cloned()
        .ok_or(ValidationError::SemesterNotFound(semester_id))
}

/// Validate role-based access to a year.
///
/// Admins always pass; teachers may only select years within
/// `policy.max_year_distance` of `reference_year` (the current Buddhist-era
/// year in production, injected for testability).
///
/// # Errors
///
/// Returns [`ValidationError::AccessDenied`] when the year is out of reach.
pub fn validate_user_access(
    year: i32,
    role: UserRole,
    policy: AccessPolicy,
    reference_year: i32,
) -> Result<(), ValidationError> {
    if role == UserRole::Admin {
        return Ok(());
    }

    if (year - reference_year).abs() > policy.max_year_distance {
        return Err(ValidationError::AccessDenied {
            year,
            reference_year,
        });
    }

    Ok(())
}

/// Compose the full pre-switch validation: year, then semester, then access,
/// short-circuiting on the first failure.
///
/// # Errors
///
/// Returns the first failing check's error.
pub fn validate_context(
    state: &ContextState,
    year: i32,
    semester_id: i64,
    policy: AccessPolicy,
    reference_year: i32,
) -> Result<(Year, Semester), ValidationError> {
    let matched_year = validate_year(state, year)?;
    let matched_semester = validate_semester(state, semester_id)?;
    validate_user_access(year, state.user_role, policy, reference_year)?;
    Ok((matched_year, matched_semester))
}

/// Diagnostic sweep over the current state.
///
/// Re-validates the active year and semester, checks access, and flags an
/// empty room cache for an active selection. Used for diagnostics and tests,
/// never for control flow.
#[must_use]
pub fn check_context_integrity(
    state: &ContextState,
    policy: AccessPolicy,
    reference_year: i32,
) -> IntegrityReport {
    let mut issues = Vec::new();

    if let Some(year) = state.current_year() {
        if let Err(err) = validate_year(state, year) {
            issues.push(format!("invalid current year: {err}"));
        }
    }

    if let Some(semester) = state.current_semester() {
        if let Err(err) = validate_semester(state, semester.id) {
            issues.push(format!("invalid current semester: {err}"));
        }
    }

    if state.active.is_some() && state.semesters_loaded && state.current_rooms.is_empty() {
        issues.push("no rooms loaded for current context".to_string());
    }

    if let Some(year) = state.current_year() {
        if let Err(err) = validate_user_access(year, state.user_role, policy, reference_year) {
            issues.push(format!("access validation failed: {err}"));
        }
    }

    IntegrityReport {
        is_valid: issues.is_empty(),
        issues,
    }
}
