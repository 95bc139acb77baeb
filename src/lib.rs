// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//
//! Semtable library - academic-context service for school timetable clients
//!
//! This crate provides the global-context subsystem of a school
//! timetable/substitution application: a single context record (selected
//! academic year + semester plus the available choices), a persistence
//! adapter with expiry, validation rules, a typed event bus, a render-port
//! UI projection, and the coordinator that keeps all of it consistent
//! against a backend gateway.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod coordinator;
pub mod events;
pub mod gateway;
pub mod helpers;
pub mod mock;
pub mod persistence;
pub mod projector;
pub mod render;
pub mod state;
pub mod validation;

/// Core data types for the academic context
pub mod types {
    use chrono::NaiveDate;
    use serde::{Deserialize, Serialize};

    // =========================================================================
    // Academic Year
    // =========================================================================

    /// An academic year as reported by the backend.
    ///
    /// Years follow the Buddhist-era convention of the source deployment
    /// (Gregorian + 543), so plausible values fall in 2500-3000.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Year {
        /// The academic year number (Buddhist era)
        pub year: i32,
        /// Whether the backend flags this year as the active one
        #[serde(default)]
        pub is_active: bool,
    }

    // =========================================================================
    // Semester
    // =========================================================================

    /// A semester within an academic year
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Semester {
        /// Backend-assigned identifier
        pub id: i64,
        /// Display name (the backend may spell this `semester_name`)
        #[serde(alias = "semester_name")]
        pub name: String,
        /// Ordinal within the year (1 or 2, with 3 for summer terms)
        #[serde(default)]
        pub number: u8,
        /// Whether the backend flags this semester as the active one
        #[serde(default)]
        pub is_active: bool,
        /// First day of the semester, when known
        #[serde(default)]
        pub start_date: Option<NaiveDate>,
        /// Last day of the semester, when known
        #[serde(default)]
        pub end_date: Option<NaiveDate>,
    }

    // =========================================================================
    // Room
    // =========================================================================

    /// A room associated with the active semester.
    ///
    /// Rooms are a side cache only; the backend remains authoritative.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Room {
        /// Backend-assigned identifier
        pub id: i64,
        /// Display name
        #[serde(alias = "room_name")]
        pub name: String,
        /// Seating capacity, when known
        #[serde(default)]
        pub capacity: Option<u32>,
        /// Room category (general, computer lab, ...)
        #[serde(default)]
        pub room_type: Option<String>,
    }

    // =========================================================================
    // User Role
    // =========================================================================

    /// Role of the signed-in user; gates access validation
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum UserRole {
        /// Regular teacher; restricted to years near the current one
        #[default]
        Teacher,
        /// Administrator; may select any year
        Admin,
    }

    impl UserRole {
        /// Stable string form used for the secondary storage key
        #[must_use]
        pub fn as_str(&self) -> &'static str {
            match self {
                Self::Teacher => "teacher",
                Self::Admin => "admin",
            }
        }
    }

    // =========================================================================
    // Active Context
    // =========================================================================

    /// The currently selected year/semester pair.
    ///
    /// Year and semester are selected together or not at all; storing the
    /// pair as one value makes a half-selected context unrepresentable.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ActiveContext {
        /// Selected academic year
        pub year: i32,
        /// Selected semester record
        pub semester: Semester,
    }

    /// A requested year/semester selection, before semester resolution
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ContextSelection {
        /// Requested academic year
        pub year: i32,
        /// Requested semester id; must exist in the available semesters
        pub semester_id: i64,
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::coordinator::{ContextService, CoordinatorError};
    pub use crate::state::{ContextState, Phase};
    pub use crate::types::*;
    pub use anyhow::{Context, Result};
}
