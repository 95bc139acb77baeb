// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Context coordinator - orchestrates initialization, refresh, and switching
//!
//! The root component of the subsystem. It sequences backend calls, applies
//! or discards persisted snapshots, keeps the room cache coherent, projects
//! state into the UI, and emits change notifications. All mutation of the
//! context state happens here; everything else sees snapshots.

use crate::events::{ContextChanged, EventBus, ListenerCounts, ListenerResult, Subscription};
use crate::gateway::{
    BackendGateway, ChangeNotifier, DataGateway, ExternalChange, GatewayError,
};
use crate::persistence::{ContextStore, KeyValueStorage};
use crate::projector::Projector;
use crate::render::RenderPort;
use crate::state::{ContextState, Phase};
use crate::types::{ActiveContext, ContextSelection, Room, UserRole};
use crate::validation::{
    self, AccessPolicy, IntegrityReport, ValidationError,
};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error, info, warn};

/// Failure of a coordinator operation, in the shape callers act on
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    /// The operation requires an authenticated session
    #[error("not authenticated")]
    NotAuthenticated,
    /// Another switch is still in flight; retry after it settles
    #[error("a context switch is already in progress")]
    SwitchInProgress,
    /// A validation check rejected the request before any mutation
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A gateway call the operation cannot proceed without failed
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Partial update applied through [`ContextService::update_context`].
///
/// Only side-cache fields are patchable; the active pair changes through
/// [`ContextService::set_context`] alone.
#[derive(Debug, Clone, Default)]
pub struct ContextPatch {
    /// Replace the room cache
    pub current_rooms: Option<Vec<Room>>,
    /// Replace the user role
    pub user_role: Option<UserRole>,
}

/// The context service: dependency-injected coordinator instance.
///
/// Construct one per logical session and hand consumers the handle; there is
/// no global singleton.
pub struct ContextService<B, D, R> {
    pub(crate) state: ContextState,
    pub(crate) bus: EventBus,
    pub(crate) store: ContextStore,
    pub(crate) projector: Projector,
    pub(crate) renderer: R,
    pub(crate) backend: B,
    pub(crate) data: D,
    pub(crate) policy: AccessPolicy,
    reference_year: Option<i32>,
    external_rx: Option<UnboundedReceiver<ExternalChange>>,
    switch_in_flight: bool,
}

impl<B, D, R> ContextService<B, D, R>
where
    B: BackendGateway,
    D: DataGateway,
    R: RenderPort,
{
    /// Wire a service from its collaborators
    pub fn new(backend: B, data: D, storage: Box<dyn KeyValueStorage>, renderer: R) -> Self {
        Self {
            state: ContextState::default(),
            bus: EventBus::new(),
            store: ContextStore::new(storage),
            projector: Projector::new(),
            renderer,
            backend,
            data,
            policy: AccessPolicy::default(),
            reference_year: None,
            external_rx: None,
            switch_in_flight: false,
        }
    }

    /// Replace the access policy (defaults to a two-year teacher window)
    pub fn set_policy(&mut self, policy: AccessPolicy) {
        self.policy = policy;
    }

    /// Pin the reference year used by access checks instead of the wall
    /// clock; diagnostics and tests use this for determinism
    pub fn set_reference_year(&mut self, year: Option<i32>) {
        self.reference_year = year;
    }

    /// Defensive snapshot of the current context
    #[must_use]
    pub fn snapshot(&self) -> ContextState {
        self.state.clone()
    }

    /// The injected backend gateway
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend gateway, for host wiring and tests
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The injected data gateway
    pub fn data_gateway(&self) -> &D {
        &self.data
    }

    /// Mutable access to the data gateway, for host wiring and tests
    pub fn data_gateway_mut(&mut self) -> &mut D {
        &mut self.data
    }

    /// The injected render port
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    fn effective_reference_year(&self) -> i32 {
        self.reference_year
            .unwrap_or_else(validation::current_buddhist_year)
    }

    // =========================================================================
    // Event bus passthrough
    // =========================================================================

    /// Register a context-change listener
    pub fn on_context_change<F>(&mut self, callback: F) -> Subscription
    where
        F: Fn(&ContextChanged) -> ListenerResult + Send + 'static,
    {
        self.bus.on_context_change(callback)
    }

    /// Register a year-change listener
    pub fn on_year_change<F>(&mut self, callback: F) -> Subscription
    where
        F: Fn(&crate::events::YearChanged) -> ListenerResult + Send + 'static,
    {
        self.bus.on_year_change(callback)
    }

    /// Register a semester-change listener
    pub fn on_semester_change<F>(&mut self, callback: F) -> Subscription
    where
        F: Fn(&crate::events::SemesterChanged) -> ListenerResult + Send + 'static,
    {
        self.bus.on_semester_change(callback)
    }

    /// Register a context-error listener
    pub fn on_context_error<F>(&mut self, callback: F) -> Subscription
    where
        F: Fn(&str) -> ListenerResult + Send + 'static,
    {
        self.bus.on_context_error(callback)
    }

    /// Remove a previously registered listener
    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.bus.unsubscribe(subscription);
    }

    /// Listener counts per channel, for diagnostics
    #[must_use]
    pub fn listener_counts(&self) -> ListenerCounts {
        self.bus.listener_counts()
    }

    // =========================================================================
    // Coordinator operations
    // =========================================================================

    /// Initialize the context: load availability from the backend, fall back
    /// to the degraded empty state when it reports nothing, and otherwise
    /// apply a compatible persisted snapshot if the backend named no active
    /// pair. Always terminates the loading phase and re-renders.
    pub async fn initialize(&mut self) -> ContextState {
        info!("initializing global context");
        self.state.phase = Phase::Loading;

        let authenticated = self.backend.is_authenticated();
        debug!(authenticated, "authentication status");

        match self.load_from_backend().await {
            Ok(()) => {
                if self.state.has_backend_data() {
                    if self.state.active.is_none() {
                        self.try_apply_stored_context();
                    }
                    self.state.phase = Phase::Ready;
                } else {
                    self.store.clear();
                    self.state.apply_fallback();
                    self.state.phase = Phase::Degraded;
                }
            }
            Err(err) => {
                error!(%err, "initialization failed");
                self.state.apply_fallback();
                self.state.phase = Phase::Failed(err.to_string());
            }
        }

        self.render();
        info!(
            year = ?self.state.current_year(),
            semester = ?self.state.current_semester().map(|s| s.id),
            years = self.state.available_years.len(),
            semesters = self.state.available_semesters.len(),
            "initialization complete"
        );
        self.snapshot()
    }

    /// Re-run the backend load and re-render.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::NotAuthenticated`] without side effects
    /// when unauthenticated, or the gateway failure that aborted the load.
    pub async fn refresh_from_backend(&mut self) -> Result<ContextState, CoordinatorError> {
        if !self.backend.is_authenticated() {
            debug!("not authenticated, skipping backend refresh");
            return Err(CoordinatorError::NotAuthenticated);
        }

        info!("refreshing context from backend");
        self.load_from_backend().await?;

        self.state.phase = if self.state.has_backend_data() {
            Phase::Ready
        } else {
            Phase::Degraded
        };
        self.render();
        Ok(self.snapshot())
    }

    /// Select a year/semester pair (or clear the selection with `None`).
    ///
    /// Mutates local state first, then propagates the selection to the
    /// backend best-effort when authenticated; propagation failures are
    /// logged and never roll the local mutation back. Always persists,
    /// re-renders, and notifies context-change listeners with the previous
    /// pair for diffing.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::SemesterNotFound`] (wrapped) when the
    /// requested semester id is not available; state is untouched then.
    pub async fn set_context(
        &mut self,
        selection: Option<ContextSelection>,
    ) -> Result<ContextState, CoordinatorError> {
        let previous_year = self.state.current_year();
        let previous_semester = self.state.current_semester().cloned();

        let target = match selection {
            Some(selection) => {
                let semester = self
                    .state
                    .available_semesters
                    .iter()
                    .find(|s| s.id == selection.semester_id)
                    .cloned()
                    .ok_or_else(|| {
                        warn!(
                            semester_id = selection.semester_id,
                            "semester not found in available data"
                        );
                        ValidationError::SemesterNotFound(selection.semester_id)
                    })?;
                Some(ActiveContext {
                    year: selection.year,
                    semester,
                })
            }
            None => None,
        };

        info!(
            year = ?target.as_ref().map(|t| t.year),
            semester = ?target.as_ref().map(|t| t.semester.id),
            "setting context"
        );
        self.state.active = target;

        if self.backend.is_authenticated() {
            if let Some(active) = self.state.active.clone() {
                if let Err(err) = self.backend.set_active_academic_year(active.year).await {
                    warn!(%err, "failed to set active year on backend");
                }
                if let Err(err) = self.backend.set_active_semester(active.semester.id).await {
                    warn!(%err, "failed to set active semester on backend");
                }
            }
        }

        self.store.save(&self.state);
        self.render();
        self.bus.notify_context_change(&ContextChanged {
            year: self.state.current_year(),
            semester: self.state.current_semester().cloned(),
            rooms: self.state.current_rooms.clone(),
            previous_year,
            previous_semester,
        });

        Ok(self.snapshot())
    }

    /// The full user-facing transition: validate, select, refresh the room
    /// cache, drop dependent caches, reload semester data, re-render, and
    /// notify. The loading indicator terminates on every path, and a second
    /// switch while one is in flight is rejected before any mutation.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::SwitchInProgress`], a validation failure,
    /// or the gateway failure that aborted the transition.
    pub async fn switch_context(
        &mut self,
        new_year: i32,
        new_semester_id: i64,
    ) -> Result<(), CoordinatorError> {
        if self.switch_in_flight {
            warn!(new_year, new_semester_id, "switch already in progress, rejecting");
            return Err(CoordinatorError::SwitchInProgress);
        }
        self.switch_in_flight = true;
        self.state.phase = Phase::Loading;
        self.render();

        let result = self.switch_inner(new_year, new_semester_id).await;

        match &result {
            Ok(()) => {
                self.state.phase = Phase::Ready;
                self.render();
                info!(new_year, new_semester_id, "context switched");
            }
            Err(err) => {
                error!(%err, "context switch failed");
                self.handle_context_error(&err.to_string());
            }
        }
        self.switch_in_flight = false;
        result
    }

    async fn switch_inner(
        &mut self,
        new_year: i32,
        new_semester_id: i64,
    ) -> Result<(), CoordinatorError> {
        info!(new_year, new_semester_id, "switching context");

        let reference_year = self.effective_reference_year();
        validation::validate_context(
            &self.state,
            new_year,
            new_semester_id,
            self.policy,
            reference_year,
        )?;

        self.set_context(Some(ContextSelection {
            year: new_year,
            semester_id: new_semester_id,
        }))
        .await?;

        match self.data.get_rooms().await {
            Ok(rooms) => {
                self.update_context(ContextPatch {
                    current_rooms: Some(rooms),
                    user_role: None,
                });
            }
            Err(GatewayError::Rejected(reason)) => {
                warn!(%reason, "room fetch rejected, keeping previous cache");
            }
            Err(err) => return Err(err.into()),
        }

        self.data.clear_cache();

        if let Some(semester_id) = self.state.current_semester().map(|s| s.id) {
            self.data.load_semester_data(semester_id).await?;
        }

        self.render();
        self.bus.notify_context_change(&ContextChanged {
            year: self.state.current_year(),
            semester: self.state.current_semester().cloned(),
            rooms: self.state.current_rooms.clone(),
            previous_year: None,
            previous_semester: None,
        });
        Ok(())
    }

    /// Merge a partial update into the state.
    ///
    /// Persists when the role changes and notifies context-change listeners
    /// when the room cache changes. Returns the resulting snapshot.
    pub fn update_context(&mut self, patch: ContextPatch) -> ContextState {
        let rooms_changed = patch.current_rooms.is_some();

        if let Some(rooms) = patch.current_rooms {
            self.state.current_rooms = rooms;
        }
        if let Some(role) = patch.user_role {
            self.state.user_role = role;
            self.store.save(&self.state);
        }

        if rooms_changed {
            self.bus.notify_context_change(&ContextChanged {
                year: self.state.current_year(),
                semester: self.state.current_semester().cloned(),
                rooms: self.state.current_rooms.clone(),
                previous_year: None,
                previous_semester: None,
            });
        }

        self.snapshot()
    }

    /// Reset to the empty default: selection, semesters, rooms, and role are
    /// cleared, the known years list survives, and the stored snapshot is
    /// removed. Notifies context-change listeners.
    pub fn reset_context(&mut self) -> ContextState {
        info!("resetting context");
        self.state.reset_keeping_years();
        self.store.clear();

        self.bus.notify_context_change(&ContextChanged {
            year: None,
            semester: None,
            rooms: Vec::new(),
            previous_year: None,
            previous_semester: None,
        });

        self.render();
        self.snapshot()
    }

    /// Run the diagnostic integrity sweep over the current state
    #[must_use]
    pub fn check_integrity(&self) -> IntegrityReport {
        validation::check_context_integrity(
            &self.state,
            self.policy,
            self.effective_reference_year(),
        )
    }

    // =========================================================================
    // External change notifications
    // =========================================================================

    /// Subscribe to a change notifier's events.
    ///
    /// Idempotent: the first call installs the subscription for the lifetime
    /// of the service, later calls are ignored.
    pub fn attach_notifier(&mut self, notifier: &mut dyn ChangeNotifier) {
        if self.external_rx.is_some() {
            debug!("change notifier already attached");
            return;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        notifier.subscribe(tx);
        self.external_rx = Some(rx);
    }

    /// Drain and handle every pending external change
    pub async fn pump_external_changes(&mut self) {
        let mut pending = Vec::new();
        if let Some(rx) = self.external_rx.as_mut() {
            while let Ok(change) = rx.try_recv() {
                pending.push(change);
            }
        }
        for change in pending {
            self.handle_external_change(change).await;
        }
    }

    /// React to one external change: forward year/semester changes to the
    /// bus, and re-fetch the room cache when room data moved into or out of
    /// the current year.
    pub async fn handle_external_change(&mut self, change: ExternalChange) {
        match change {
            ExternalChange::YearChanged { year } => {
                debug!(year, "external year change");
                self.bus
                    .notify_year_change(&crate::events::YearChanged { year });
            }
            ExternalChange::SemesterChanged { semester_id } => {
                debug!(semester_id, "external semester change");
                self.bus
                    .notify_semester_change(&crate::events::SemesterChanged { semester_id });
            }
            ExternalChange::RoomDataChanged { from_year, to_year } => {
                debug!(from_year, to_year, "external room data change");
                let current = self.state.current_year();
                if current == Some(from_year) || current == Some(to_year) {
                    self.reload_rooms_for_current_year().await;
                }
            }
        }
    }

    async fn reload_rooms_for_current_year(&mut self) {
        let Some(year) = self.state.current_year() else {
            return;
        };
        match self.data.load_year_data(year).await {
            Ok(data) => self.state.current_rooms = data.rooms,
            Err(err) => {
                error!(%err, year, "failed to reload rooms");
                self.state.current_rooms = Vec::new();
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// The backend load sequence. Each step is independently fault-tolerant:
    /// a rejection degrades that step to an empty result, and only a
    /// transport failure on an authoritative call aborts the load.
    async fn load_from_backend(&mut self) -> Result<(), GatewayError> {
        info!("loading context from backend");

        // opportunistic seed; the authoritative steps below may override it
        let mut candidate_year: Option<i32> = None;
        let mut candidate_semester = None;
        match self.backend.get_global_context().await {
            Ok(ctx) => {
                candidate_year = ctx.current_year;
                candidate_semester = ctx.current_semester;
            }
            Err(err) => warn!(%err, "failed to fetch backend context snapshot"),
        }

        match self.backend.get_academic_years().await {
            Ok(years) if !years.is_empty() => {
                debug!(count = years.len(), "loaded academic years");
                self.state.available_years = years;
            }
            Ok(_) | Err(GatewayError::Rejected(_)) => {
                warn!("no academic years found or request rejected");
                self.state.available_years = Vec::new();
            }
            Err(err) => return Err(err),
        }

        self.state.available_semesters = Vec::new();
        self.state.semesters_loaded = false;
        match self.backend.get_semesters().await {
            Ok(semesters) => {
                debug!(count = semesters.len(), "loaded semesters");
                self.state.available_semesters = semesters;
            }
            Err(err) => warn!(%err, "failed to load semesters"),
        }
        self.state.semesters_loaded = true;

        if !self.state.available_years.is_empty() {
            let active_year = self
                .state
                .available_years
                .iter()
                .find(|y| y.is_active)
                .copied();

            // the API may scope this call differently; re-fetch
            match self.backend.get_semesters().await {
                Ok(semesters) if !semesters.is_empty() => {
                    self.state.available_semesters = semesters;
                    let active_semester = self
                        .state
                        .available_semesters
                        .iter()
                        .find(|s| s.is_active)
                        .cloned();

                    if let Some(semester) = active_semester {
                        if let Some(year) = active_year {
                            candidate_year = Some(year.year);
                        }
                        candidate_semester = Some(semester);
                    } else {
                        debug!("no active semester found, clearing current semester");
                        candidate_semester = None;
                    }
                }
                Ok(_) | Err(GatewayError::Rejected(_)) => {
                    debug!("no semesters found for active year");
                    self.state.available_semesters = Vec::new();
                }
                Err(err) => return Err(err),
            }
        }

        // partial context is never retained
        self.state.active = match (candidate_year, candidate_semester) {
            (Some(year), Some(semester)) => Some(ActiveContext { year, semester }),
            _ => {
                debug!("no active context found, clearing selection");
                None
            }
        };

        Ok(())
    }

    fn try_apply_stored_context(&mut self) {
        let Some(stored) = self.store.load() else {
            return;
        };
        if validation::is_stored_context_compatible(&self.state, &stored) {
            self.state.apply_stored(&stored);
            info!(
                year = ?stored.current_year,
                "applied context from storage"
            );
        } else {
            info!("stored context is out of date, clearing");
            self.store.clear();
        }
    }

    fn handle_context_error(&mut self, reason: &str) {
        self.state.phase = Phase::Failed(reason.to_string());
        self.bus.notify_context_error(reason);
        self.render();
    }

    fn render(&mut self) {
        self.projector.project(&self.state, &mut self.renderer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ChannelNotifier, Dataset, MockBackend, MockData};
    use crate::persistence::MemoryStorage;
    use crate::render::RecordingRenderer;

    fn make_service(
        dataset: Dataset,
    ) -> ContextService<MockBackend, MockData, RecordingRenderer> {
        let backend = MockBackend::new(dataset.clone());
        let data = MockData::new(&dataset);
        let mut service = ContextService::new(
            backend,
            data,
            Box::new(MemoryStorage::new()),
            RecordingRenderer::new(),
        );
        service.set_reference_year(Some(2567));
        service
    }

    #[tokio::test]
    async fn test_initialize_adopts_backend_active_pair() {
        let mut service = make_service(Dataset::sample());

        let state = service.initialize().await;

        assert_eq!(state.phase, Phase::Ready);
        assert_eq!(state.current_year(), Some(2567));
        assert_eq!(state.current_semester().map(|s| s.id), Some(1));
        assert_eq!(state.available_years.len(), 3);
        assert!(state.semesters_loaded);
    }

    #[tokio::test]
    async fn test_initialize_empty_backend_degrades() {
        let mut service = make_service(Dataset::empty());

        let state = service.initialize().await;

        assert_eq!(state.phase, Phase::Degraded);
        assert!(state.active.is_none());
        assert!(state.available_years.is_empty());
    }

    #[tokio::test]
    async fn test_switch_context_end_to_end() {
        let mut service = make_service(Dataset::sample());
        service.initialize().await;

        service.switch_context(2568, 2).await.unwrap();

        let state = service.snapshot();
        assert_eq!(state.current_year(), Some(2568));
        assert_eq!(state.current_semester().map(|s| s.id), Some(2));
        assert_eq!(state.phase, Phase::Ready);
        // rooms were fetched for the new context
        assert_eq!(state.current_rooms.len(), 3);
        // dependent data reload and cache clear ran
        assert_eq!(service.data_gateway().semester_loads, vec![2]);
        assert_eq!(service.data_gateway().cache_clears, 1);
        // selection was propagated to the backend
        assert_eq!(service.backend().set_year_calls, vec![2568]);
        assert_eq!(service.backend().set_semester_calls, vec![2]);
    }

    #[tokio::test]
    async fn test_switch_validation_failure_leaves_state_untouched() {
        let mut service = make_service(Dataset::sample());
        service.initialize().await;
        let before = service.snapshot();

        let result = service.switch_context(2568, 99).await;

        assert_eq!(
            result,
            Err(CoordinatorError::Validation(
                ValidationError::SemesterNotFound(99)
            ))
        );
        let after = service.snapshot();
        assert_eq!(after.active, before.active);
        assert!(!after.phase.is_loading());
        assert!(after.phase.error().is_some());
    }

    #[tokio::test]
    async fn test_set_context_rejects_orphan_semester() {
        let mut service = make_service(Dataset::sample());
        service.initialize().await;
        let before = service.snapshot();

        let result = service
            .set_context(Some(ContextSelection {
                year: 2567,
                semester_id: 999,
            }))
            .await;

        assert!(result.is_err());
        assert_eq!(service.snapshot().active, before.active);
    }

    #[tokio::test]
    async fn test_set_context_propagation_failure_keeps_local_state() {
        let mut service = make_service(Dataset::sample());
        service.initialize().await;
        service.backend_mut().faults.set_year =
            Some(GatewayError::Transport("backend down".into()));

        let result = service
            .set_context(Some(ContextSelection {
                year: 2566,
                semester_id: 2,
            }))
            .await;

        // best-effort propagation: local mutation survives the failure
        assert!(result.is_ok());
        assert_eq!(service.snapshot().current_year(), Some(2566));
    }

    #[tokio::test]
    async fn test_refresh_requires_authentication() {
        let mut service = make_service(Dataset::sample());
        service.backend_mut().authenticated = false;

        let result = service.refresh_from_backend().await;

        assert_eq!(result, Err(CoordinatorError::NotAuthenticated));
        // no side effects
        assert_eq!(service.snapshot(), ContextState::default());
    }

    #[tokio::test]
    async fn test_external_room_change_reloads_rooms() {
        let mut notifier = ChannelNotifier::new();
        let mut service = make_service(Dataset::sample());
        service.attach_notifier(&mut notifier);
        service.initialize().await;
        service.data_gateway_mut().rooms.push(crate::types::Room {
            id: 9,
            name: "NEW".into(),
            capacity: None,
            room_type: None,
        });

        notifier.emit(ExternalChange::RoomDataChanged {
            from_year: 2566,
            to_year: 2567,
        });
        service.pump_external_changes().await;

        assert_eq!(service.snapshot().current_rooms.len(), 4);
    }

    #[tokio::test]
    async fn test_external_room_change_for_other_year_is_ignored() {
        let mut notifier = ChannelNotifier::new();
        let mut service = make_service(Dataset::sample());
        service.attach_notifier(&mut notifier);
        service.initialize().await;

        notifier.emit(ExternalChange::RoomDataChanged {
            from_year: 2500,
            to_year: 2501,
        });
        service.pump_external_changes().await;

        assert!(service.snapshot().current_rooms.is_empty());
    }

    #[tokio::test]
    async fn test_attach_notifier_is_idempotent() {
        let mut notifier = ChannelNotifier::new();
        let mut service = make_service(Dataset::sample());

        service.attach_notifier(&mut notifier);
        service.attach_notifier(&mut notifier);

        let hits = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let hits_clone = std::sync::Arc::clone(&hits);
        service.on_year_change(move |_| {
            hits_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        });

        notifier.emit(ExternalChange::YearChanged { year: 2568 });
        service.pump_external_changes().await;

        // a doubled subscription would deliver the event twice
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_switch_in_flight_guard_rejects_overlap() {
        let mut service = make_service(Dataset::sample());
        service.initialize().await;

        service.switch_in_flight = true;
        let result = service.switch_context(2568, 2).await;

        assert_eq!(result, Err(CoordinatorError::SwitchInProgress));
        // the rejected call must not clear the in-flight marker
        assert!(service.switch_in_flight);
        // and must not mutate the selection
        assert_eq!(service.snapshot().current_year(), Some(2567));
    }

    #[tokio::test]
    async fn test_reset_keeps_years_and_clears_storage() {
        let mut service = make_service(Dataset::sample());
        service.initialize().await;
        service
            .set_context(Some(ContextSelection {
                year: 2567,
                semester_id: 1,
            }))
            .await
            .unwrap();
        assert!(service.store.has_stored());

        let state = service.reset_context();

        assert!(state.active.is_none());
        assert_eq!(state.available_years.len(), 3);
        assert_eq!(state.user_role, UserRole::Teacher);
        assert!(!service.store.has_stored());
    }

    #[tokio::test]
    async fn test_update_context_patch_notifies_on_rooms() {
        let mut service = make_service(Dataset::sample());
        let hits = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let hits_clone = std::sync::Arc::clone(&hits);
        service.on_context_change(move |change| {
            assert_eq!(change.rooms.len(), 1);
            hits_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        });

        service.update_context(ContextPatch {
            current_rooms: Some(vec![crate::types::Room {
                id: 1,
                name: "101".into(),
                capacity: None,
                room_type: None,
            }]),
            user_role: None,
        });
        // role-only patches do not notify
        service.update_context(ContextPatch {
            current_rooms: None,
            user_role: Some(UserRole::Admin),
        });

        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(service.snapshot().user_role, UserRole::Admin);
    }
}
