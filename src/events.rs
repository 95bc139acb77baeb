// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Typed event bus for context change notifications
//!
//! Four independent channels: context change, year change, semester change,
//! and context error. A listener that fails is logged and skipped; its
//! siblings still receive the notification and the emitting operation is
//! never aborted.

use crate::types::{Room, Semester};
use tracing::error;

/// Result returned by a listener; `Err` marks an isolated listener failure
pub type ListenerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Payload delivered on the context-change channel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContextChanged {
    /// Year after the change
    pub year: Option<i32>,
    /// Semester after the change
    pub semester: Option<Semester>,
    /// Room cache after the change
    pub rooms: Vec<Room>,
    /// Year before the change, for consumers that diff
    pub previous_year: Option<i32>,
    /// Semester before the change, for consumers that diff
    pub previous_semester: Option<Semester>,
}

/// Payload delivered on the year-change channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearChanged {
    /// The newly active year
    pub year: i32,
}

/// Payload delivered on the semester-change channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemesterChanged {
    /// The newly active semester id
    pub semester_id: i64,
}

/// The channel a subscription belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Active context (year/semester/rooms) changed
    ContextChange,
    /// External year change observed
    YearChange,
    /// External semester change observed
    SemesterChange,
    /// A coordinator operation failed
    ContextError,
}

/// Handle returned by registration; pass back to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

type Listener<T> = Box<dyn Fn(&T) -> ListenerResult + Send>;
type ErrorListener = Box<dyn Fn(&str) -> ListenerResult + Send>;

/// Listener registries for the four context channels
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    context_change: Vec<(u64, Listener<ContextChanged>)>,
    year_change: Vec<(u64, Listener<YearChanged>)>,
    semester_change: Vec<(u64, Listener<SemesterChanged>)>,
    context_error: Vec<(u64, ErrorListener)>,
}

impl EventBus {
    /// Create an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Register a context-change listener
    pub fn on_context_change<F>(&mut self, callback: F) -> Subscription
    where
        F: Fn(&ContextChanged) -> ListenerResult + Send + 'static,
    {
        let id = self.next_id();
        self.context_change.push((id, Box::new(callback)));
        Subscription {
            kind: EventKind::ContextChange,
            id,
        }
    }

    /// Register a year-change listener
    pub fn on_year_change<F>(&mut self, callback: F) -> Subscription
    where
        F: Fn(&YearChanged) -> ListenerResult + Send + 'static,
    {
        let id = self.next_id();
        self.year_change.push((id, Box::new(callback)));
        Subscription {
            kind: EventKind::YearChange,
            id,
        }
    }

    /// Register a semester-change listener
    pub fn on_semester_change<F>(&mut self, callback: F) -> Subscription
    where
        F: Fn(&SemesterChanged) -> ListenerResult + Send + 'static,
    {
        let id = self.next_id();
        self.semester_change.push((id, Box::new(callback)));
        Subscription {
            kind: EventKind::SemesterChange,
            id,
        }
    }

    /// Register a context-error listener
    pub fn on_context_error<F>(&mut self, callback: F) -> Subscription
    where
        F: Fn(&str) -> ListenerResult + Send + 'static,
    {
        let id = self.next_id();
        self.context_error.push((id, Box::new(callback)));
        Subscription {
            kind: EventKind::ContextError,
            id,
        }
    }

    /// Remove a previously registered listener; unknown handles are ignored
    pub fn unsubscribe(&mut self, subscription: Subscription) {
        match subscription.kind {
            EventKind::ContextChange => self.context_change.retain(|(id, _)| *id != subscription.id),
            EventKind::YearChange => self.year_change.retain(|(id, _)| *id != subscription.id),
            EventKind::SemesterChange => {
                self.semester_change.retain(|(id, _)| *id != subscription.id);
            }
            EventKind::ContextError => self.context_error.retain(|(id, _)| *id != subscription.id),
        }
    }

    /// Deliver a context-change notification to every listener in order
    pub fn notify_context_change(&self, payload: &ContextChanged) {
        for (id, listener) in &self.context_change {
            if let Err(err) = listener(payload) {
                error!(listener = id, %err, "context-change listener failed");
            }
        }
    }

    /// Deliver a year-change notification to every listener in order
    pub fn notify_year_change(&self, payload: &YearChanged) {
        for (id, listener) in &self.year_change {
            if let Err(err) = listener(payload) {
                error!(listener = id, %err, "year-change listener failed");
            }
        }
    }

    /// Deliver a semester-change notification to every listener in order
    pub fn notify_semester_change(&self, payload: &SemesterChanged) {
        for (id, listener) in &self.semester_change {
            if let Err(err) = listener(payload) {
                error!(listener = id, %err, "semester-change listener failed");
            }
        }
    }

    /// Deliver an error notification to every listener in order
    pub fn notify_context_error(&self, reason: &str) {
        for (id, listener) in &self.context_error {
            if let Err(err) = listener(reason) {
                error!(listener = id, %err, "context-error listener failed");
            }
        }
    }

    /// Number of registered listeners per channel, for diagnostics
    #[must_use]
    pub fn listener_counts(&self) -> ListenerCounts {
        ListenerCounts {
            context_change: self.context_change.len(),
            year_change: self.year_change.len(),
            semester_change: self.semester_change.len(),
            context_error: self.context_error.len(),
        }
    }
}

/// Listener counts per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerCounts {
    /// Context-change listeners
    pub context_change: usize,
    /// Year-change listeners
    pub year_change: usize,
    /// Semester-change listeners
    pub semester_change: usize,
    /// Context-error listeners
    pub context_error: usize,
}
