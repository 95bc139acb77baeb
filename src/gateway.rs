// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! External gateway seams: backend API, dependent data loads, and the
//! change-notification channel
//!
//! The coordinator is a client of whatever protocol sits behind these
//! traits; no wire format is defined here.

#![allow(async_fn_in_trait)]

use crate::types::{Room, Semester, Year};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Failure reported by a gateway call.
///
/// The two variants matter to the coordinator's fault tolerance: a
/// [`GatewayError::Rejected`] response is a well-formed "no" and degrades to
/// an empty result, while a [`GatewayError::Transport`] failure aborts the
/// steps that cannot proceed without the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The request never completed (network failure, timeout, panic upstream)
    #[error("transport failure: {0}")]
    Transport(String),
    /// The backend answered with a non-success result
    #[error("backend rejected request: {0}")]
    Rejected(String),
}

/// Opportunistic context snapshot reported by the backend
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BackendContext {
    /// Backend's notion of the current year, if it reports one
    pub current_year: Option<i32>,
    /// Backend's notion of the current semester, if it reports one
    pub current_semester: Option<Semester>,
}

/// Year-scoped dependent data returned by [`DataGateway::load_year_data`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct YearData {
    /// Rooms configured for the year
    pub rooms: Vec<Room>,
}

/// The backend API surface the coordinator reads and writes
pub trait BackendGateway: Send {
    /// Synchronous capability check; gates refresh and write-backs
    fn is_authenticated(&self) -> bool;

    /// Fetch the backend's current-context snapshot (best-effort seed)
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`]; the caller treats any failure here as
    /// "no snapshot".
    async fn get_global_context(&mut self) -> Result<BackendContext, GatewayError>;

    /// Fetch the full list of academic years
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] when the list cannot be produced.
    async fn get_academic_years(&mut self) -> Result<Vec<Year>, GatewayError>;

    /// Fetch the full list of semesters
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] when the list cannot be produced.
    async fn get_semesters(&mut self) -> Result<Vec<Semester>, GatewayError>;

    /// Mark `year` active on the backend
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`]; the coordinator treats this as
    /// best-effort and never rolls back local state.
    async fn set_active_academic_year(&mut self, year: i32) -> Result<(), GatewayError>;

    /// Mark the semester with `semester_id` active on the backend
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`]; best-effort, as above.
    async fn set_active_semester(&mut self, semester_id: i64) -> Result<(), GatewayError>;
}

/// Dependent-data loads keyed by the active context
pub trait DataGateway: Send {
    /// Fetch the room list for the active context
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] when rooms cannot be fetched.
    async fn get_rooms(&mut self) -> Result<Vec<Room>, GatewayError>;

    /// Fetch year-scoped data (currently rooms) for `year`
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] when the year data cannot be fetched.
    async fn load_year_data(&mut self, year: i32) -> Result<YearData, GatewayError>;

    /// Drop any context-scoped caches; optional, defaults to a no-op
    fn clear_cache(&mut self) {}

    /// Reload dependent datasets for the semester with `semester_id`
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`]; a failure here fails the surrounding
    /// switch operation.
    async fn load_semester_data(&mut self, semester_id: i64) -> Result<(), GatewayError>;
}

/// A change observed outside the coordinator (another tab, an admin action)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalChange {
    /// The active year changed underneath the service
    YearChanged {
        /// The newly active year
        year: i32,
    },
    /// The active semester changed underneath the service
    SemesterChanged {
        /// The newly active semester id
        semester_id: i64,
    },
    /// Room data moved between years; may invalidate the room cache
    RoomDataChanged {
        /// Year the rooms were moved from
        from_year: i32,
        /// Year the rooms were moved to
        to_year: i32,
    },
}

/// Source of [`ExternalChange`] events the service subscribes to once
pub trait ChangeNotifier {
    /// Register `sink` to receive every future change event
    fn subscribe(&mut self, sink: UnboundedSender<ExternalChange>);
}
