// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Thin composition helpers on top of the context service

use crate::coordinator::ContextService;
use crate::events::ListenerCounts;
use crate::gateway::{BackendGateway, DataGateway};
use crate::render::RenderPort;
use crate::state::ContextState;
use crate::validation::IntegrityReport;

/// Aggregated diagnostic view of a context service
#[derive(Debug, Clone)]
pub struct DebugReport {
    /// Snapshot of the in-memory context
    pub context: ContextState,
    /// Registered listeners per channel
    pub listeners: ListenerCounts,
    /// Result of the integrity sweep
    pub integrity: IntegrityReport,
    /// Whether a snapshot currently sits in durable storage
    pub has_stored_context: bool,
}

/// Temporary context override; the saved state is restored (and persisted)
/// when the scope drops. Lets tests and previews run against a synthetic
/// context without leaking it.
pub struct ContextScope<'a, B, D, R>
where
    B: BackendGateway,
    D: DataGateway,
    R: RenderPort,
{
    service: &'a mut ContextService<B, D, R>,
    saved: Option<ContextState>,
}

impl<B, D, R> ContextService<B, D, R>
where
    B: BackendGateway,
    D: DataGateway,
    R: RenderPort,
{
    /// Collect the diagnostic report
    #[must_use]
    pub fn debug_report(&self) -> DebugReport {
        DebugReport {
            context: self.snapshot(),
            listeners: self.listener_counts(),
            integrity: self.check_integrity(),
            has_stored_context: self.store.has_stored(),
        }
    }

    /// Install `state` until the returned scope drops
    pub fn scoped_override(&mut self, state: ContextState) -> ContextScope<'_, B, D, R> {
        let saved = std::mem::replace(&mut self.state, state);
        ContextScope {
            service: self,
            saved: Some(saved),
        }
    }
}

impl<B, D, R> ContextScope<'_, B, D, R>
where
    B: BackendGateway,
    D: DataGateway,
    R: RenderPort,
{
    /// The service carrying the overridden context
    pub fn service(&mut self) -> &mut ContextService<B, D, R> {
        self.service
    }
}

impl<B, D, R> Drop for ContextScope<'_, B, D, R>
where
    B: BackendGateway,
    D: DataGateway,
    R: RenderPort,
{
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.service.state = saved;
            self.service.store.save(&self.service.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Dataset, MockBackend, MockData};
    use crate::persistence::MemoryStorage;
    use crate::render::RecordingRenderer;
    use crate::types::{ActiveContext, Semester};

    fn make_service() -> ContextService<MockBackend, MockData, RecordingRenderer> {
        let dataset = Dataset::sample();
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
    async fn test_debug_report_reflects_state() {
        let mut service = make_service();
        service.initialize().await;
        service.on_context_change(|_| Ok(()));

        let report = service.debug_report();

        assert_eq!(report.context.current_year(), Some(2567));
        assert_eq!(report.listeners.context_change, 1);
    }

    #[tokio::test]
    async fn test_scoped_override_restores_on_drop() {
        let mut service = make_service();
        service.initialize().await;
        let original_year = service.snapshot().current_year();

        {
            let synthetic = ContextState {
                active: Some(ActiveContext {
                    year: 2999,
                    semester: Semester {
                        id: 42,
                        name: "Synthetic".into(),
                        number: 1,
                        is_active: false,
                        start_date: None,
                        end_date: None,
                    },
                }),
                ..ContextState::default()
            };
            let mut scope = service.scoped_override(synthetic);
            assert_eq!(scope.service().snapshot().current_year(), Some(2999));
        }

        assert_eq!(service.snapshot().current_year(), original_year);
    }
}
