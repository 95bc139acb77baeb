// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Invariant tests for the context service
//!
//! These tests verify the load-bearing properties:
//! 1. Persistence round-trips and expiry
//! 2. Stored-snapshot compatibility gating
//! 3. Atomic year/semester pairing
//! 4. Orphan rejection and listener isolation
//! 5. Access policy enforcement

use chrono::{Duration, Utc};
use proptest::prelude::*;
use semtable::coordinator::{ContextService, CoordinatorError};
use semtable::events::ContextChanged;
use semtable::gateway::GatewayError;
use semtable::mock::{Dataset, MockBackend, MockData};
use semtable::persistence::{ContextStore, MemoryStorage, StoredContext, CONTEXT_KEY};
use semtable::render::RecordingRenderer;
use semtable::state::{ContextState, Phase};
use semtable::types::{ActiveContext, ContextSelection, Semester, UserRole, Year};
use semtable::validation::{
    self, AccessPolicy, ValidationError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// =============================================================================
// Test Helpers
// =============================================================================

type TestService = ContextService<MockBackend, MockData, RecordingRenderer>;

fn make_semester(id: i64, is_active: bool) -> Semester {
    Semester {
        id,
        name: format!("Semester {id}"),
        number: 1,
        is_active,
        start_date: None,
        end_date: None,
    }
}

fn make_dataset(years: Vec<Year>, semesters: Vec<Semester>) -> Dataset {
    Dataset {
        years,
        semesters,
        rooms: Dataset::sample().rooms,
    }
}

fn make_service(dataset: Dataset) -> TestService {
    make_service_with_storage(dataset, MemoryStorage::new())
}

fn make_service_with_storage(dataset: Dataset, storage: MemoryStorage) -> TestService {
    let backend = MockBackend::new(dataset.clone());
    let data = MockData::new(&dataset);
    let mut service = ContextService::new(
        backend,
        data,
        Box::new(storage),
        RecordingRenderer::new(),
    );
    service.set_reference_year(Some(2567));
    service
}

fn stored_snapshot(year: i32, semester_id: i64, age_hours: i64) -> String {
    let snapshot = StoredContext {
        current_year: Some(year),
        current_semester: Some(make_semester(semester_id, false)),
        user_role: UserRole::Teacher,
        timestamp: Utc::now() - Duration::hours(age_hours),
    };
    serde_json::to_string(&snapshot).unwrap()
}

// =============================================================================
// Persistence round-trip and expiry
// =============================================================================

#[test]
fn test_save_then_load_is_structurally_valid() {
    let mut store = ContextStore::new(Box::new(MemoryStorage::new()));
    let state = ContextState {
        active: Some(ActiveContext {
            year: 2567,
            semester: make_semester(10, true),
        }),
        ..ContextState::default()
    };

    assert!(store.save(&state));
    let loaded = store.load().expect("fresh snapshot should load");

    assert!(validation::is_context_valid(&loaded));
    assert_eq!(loaded.current_year, Some(2567));
}

#[test]
fn test_expired_snapshot_is_never_returned_and_gets_deleted() {
    let mut storage = MemoryStorage::new();
    storage.seed(CONTEXT_KEY, &stored_snapshot(2567, 10, 25));
    let mut store = ContextStore::new(Box::new(storage));

    assert!(store.load().is_none());
    assert!(!store.has_stored());
}

#[test]
fn test_fresh_snapshot_survives_load() {
    let mut storage = MemoryStorage::new();
    storage.seed(CONTEXT_KEY, &stored_snapshot(2567, 10, 23));
    let mut store = ContextStore::new(Box::new(storage));

    assert!(store.load().is_some());
    assert!(store.has_stored());
}

proptest! {
    #[test]
    fn test_round_trip_holds_for_any_valid_context(year in 2500i32..=3000, semester_id in 1i64..10_000) {
        let mut store = ContextStore::new(Box::new(MemoryStorage::new()));
        let state = ContextState {
            active: Some(ActiveContext {
                year,
                semester: make_semester(semester_id, false),
            }),
            ..ContextState::default()
        };

        prop_assert!(store.save(&state));
        let loaded = store.load().unwrap();
        prop_assert!(validation::is_context_valid(&loaded));
        prop_assert_eq!(loaded.current_year, Some(year));
        prop_assert_eq!(loaded.current_semester.map(|s| s.id), Some(semester_id));
    }

    #[test]
    fn test_access_window_is_symmetric(distance in 0i32..50) {
        let policy = AccessPolicy::default();
        let reference = 2567;
        let allowed = distance <= policy.max_year_distance;

        prop_assert_eq!(
            validation::validate_user_access(reference + distance, UserRole::Teacher, policy, reference).is_ok(),
            allowed
        );
        prop_assert_eq!(
            validation::validate_user_access(reference - distance, UserRole::Teacher, policy, reference).is_ok(),
            allowed
        );
        // admins always pass
        prop_assert!(validation::validate_user_access(reference + distance, UserRole::Admin, policy, reference).is_ok());
    }
}

// =============================================================================
// Stored-snapshot compatibility gate
// =============================================================================

#[tokio::test]
async fn test_compatible_snapshot_is_applied_when_backend_names_no_pair() {
    // backend has availability but flags nothing active
    let dataset = make_dataset(
        vec![Year {
            year: 2567,
            is_active: false,
        }],
        vec![make_semester(10, false)],
    );
    let mut storage = MemoryStorage::new();
    storage.seed(CONTEXT_KEY, &stored_snapshot(2567, 10, 1));
    let mut service = make_service_with_storage(dataset, storage);

    let state = service.initialize().await;

    assert_eq!(state.current_year(), Some(2567));
    assert_eq!(state.current_semester().map(|s| s.id), Some(10));
    assert_eq!(state.phase, Phase::Ready);
}

#[tokio::test]
async fn test_incompatible_snapshot_is_discarded() {
    // stored semester 99 does not exist in availability
    let dataset = make_dataset(
        vec![Year {
            year: 2567,
            is_active: false,
        }],
        vec![make_semester(10, false)],
    );
    let mut storage = MemoryStorage::new();
    storage.seed(CONTEXT_KEY, &stored_snapshot(2567, 99, 1));
    let mut service = make_service_with_storage(dataset, storage);

    let state = service.initialize().await;

    assert!(state.active.is_none(), "orphaned snapshot must not apply");
    let report = service.debug_report();
    assert!(!report.has_stored_context, "stale snapshot must be cleared");
}

#[tokio::test]
async fn test_snapshot_with_unknown_year_is_discarded() {
    let dataset = make_dataset(
        vec![Year {
            year: 2567,
            is_active: false,
        }],
        vec![make_semester(10, false)],
    );
    let mut storage = MemoryStorage::new();
    storage.seed(CONTEXT_KEY, &stored_snapshot(2570, 10, 1));
    let mut service = make_service_with_storage(dataset, storage);

    let state = service.initialize().await;

    assert!(state.active.is_none());
    assert!(!service.debug_report().has_stored_context);
}

// =============================================================================
// Atomic year/semester pairing
// =============================================================================

#[tokio::test]
async fn test_years_without_active_semester_yield_no_pair() {
    // backend reports years (one active) but no semester is flagged active
    let dataset = make_dataset(
        vec![Year {
            year: 2567,
            is_active: true,
        }],
        vec![make_semester(10, false), make_semester(11, false)],
    );
    let mut service = make_service(dataset);

    let state = service.initialize().await;

    // never a year without a semester
    assert!(state.active.is_none());
    assert_eq!(state.available_semesters.len(), 2);
    assert!(state.semesters_loaded);
}

#[tokio::test]
async fn test_every_operation_leaves_pair_or_nothing() {
    let mut service = make_service(Dataset::sample());

    let state = service.initialize().await;
    assert_eq!(state.current_year().is_some(), state.current_semester().is_some());

    let state = service
        .set_context(Some(ContextSelection {
            year: 2568,
            semester_id: 2,
        }))
        .await
        .unwrap();
    assert_eq!(state.current_year().is_some(), state.current_semester().is_some());

    let state = service.set_context(None).await.unwrap();
    assert!(state.current_year().is_none());
    assert!(state.current_semester().is_none());
}

// =============================================================================
// Orphan rejection
// =============================================================================

#[tokio::test]
async fn test_orphan_semester_id_is_rejected_without_mutation() {
    let mut service = make_service(Dataset::sample());
    service.initialize().await;
    let before = service.snapshot();

    let result = service
        .set_context(Some(ContextSelection {
            year: 2567,
            semester_id: 999,
        }))
        .await;

    assert!(matches!(
        result,
        Err(CoordinatorError::Validation(
            ValidationError::SemesterNotFound(999)
        ))
    ));
    let after = service.snapshot();
    assert_eq!(after.current_year(), before.current_year());
    assert_eq!(
        after.current_semester().map(|s| s.id),
        before.current_semester().map(|s| s.id)
    );
}

// =============================================================================
// Listener isolation
// =============================================================================

#[tokio::test]
async fn test_throwing_listener_does_not_starve_later_listeners() {
    let mut service = make_service(Dataset::sample());
    service.initialize().await;

    service.on_context_change(|_| Err("deliberately broken listener".into()));
    let delivered = Arc::new(AtomicUsize::new(0));
    let delivered_clone = Arc::clone(&delivered);
    service.on_context_change(move |change: &ContextChanged| {
        assert_eq!(change.year, Some(2568));
        delivered_clone.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    service
        .set_context(Some(ContextSelection {
            year: 2568,
            semester_id: 2,
        }))
        .await
        .unwrap();

    assert_eq!(delivered.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Access policy
// =============================================================================

#[test]
fn test_teacher_window_and_admin_override() {
    let policy = AccessPolicy::default();
    let reference = 2567;

    assert!(validation::validate_user_access(reference + 1, UserRole::Teacher, policy, reference).is_ok());
    assert!(
        validation::validate_user_access(reference + 3, UserRole::Teacher, policy, reference)
            .is_err()
    );
    assert!(validation::validate_user_access(reference + 3, UserRole::Admin, policy, reference).is_ok());
    assert!(validation::validate_user_access(2999, UserRole::Admin, policy, reference).is_ok());
}

// =============================================================================
// End-to-end initialization and switching
// =============================================================================

#[tokio::test]
async fn test_backend_flagged_active_pair_is_adopted() {
    let dataset = make_dataset(
        vec![Year {
            year: 2567,
            is_active: true,
        }],
        vec![make_semester(10, true)],
    );
    let mut service = make_service(dataset);

    let state = service.initialize().await;

    assert_eq!(state.current_year(), Some(2567));
    assert_eq!(state.current_semester().map(|s| s.id), Some(10));
}

#[tokio::test]
async fn test_empty_backend_degrades_and_clears_storage() {
    let mut storage = MemoryStorage::new();
    storage.seed(CONTEXT_KEY, &stored_snapshot(2567, 10, 1));
    let mut service = make_service_with_storage(Dataset::empty(), storage);

    let state = service.initialize().await;

    assert_eq!(state.phase, Phase::Degraded);
    assert!(state.active.is_none());
    assert!(state.available_years.is_empty());
    assert!(
        !service.debug_report().has_stored_context,
        "stored snapshot must be cleared in the degraded state"
    );
}

#[tokio::test]
async fn test_failed_switch_is_side_effect_free() {
    let mut service = make_service(Dataset::sample());
    service.initialize().await;
    let before = service.snapshot();

    let result = service.switch_context(2568, 7).await;

    assert!(matches!(
        result,
        Err(CoordinatorError::Validation(
            ValidationError::SemesterNotFound(7)
        ))
    ));
    let after = service.snapshot();
    assert!(!after.phase.is_loading(), "loading must always terminate");
    assert_eq!(after.current_year(), before.current_year());
    assert_eq!(
        after.current_semester().map(|s| s.id),
        before.current_semester().map(|s| s.id)
    );
    // nothing was propagated or reloaded
    assert!(service.backend().set_year_calls.is_empty());
    assert!(service.data_gateway().semester_loads.is_empty());
}

// =============================================================================
// Degradation paths
// =============================================================================

#[tokio::test]
async fn transport_failure_during_init_fails_safely() {
    let mut service = make_service(Dataset::sample());
    service.backend_mut().faults.years = Some(GatewayError::Transport("backend down".into()));

    let state = service.initialize().await;

    assert!(matches!(state.phase, Phase::Failed(_)));
    assert!(!state.phase.is_loading());
    assert!(state.active.is_none());
    assert!(state.available_years.is_empty());
}

#[tokio::test]
async fn rejected_availability_degrades_instead_of_failing() {
    let mut service = make_service(Dataset::sample());
    service.backend_mut().faults.years = Some(GatewayError::Rejected("no data".into()));
    service.backend_mut().faults.semesters = Some(GatewayError::Rejected("no data".into()));

    let state = service.initialize().await;

    // a well-formed "no" is not an error; it is the degraded empty state
    assert_eq!(state.phase, Phase::Degraded);
    assert!(state.available_years.is_empty());
    assert!(state.available_semesters.is_empty());
    assert!(state.active.is_none());
}

#[tokio::test]
async fn semester_data_failure_fails_the_switch_but_keeps_selection() {
    let mut service = make_service(Dataset::sample());
    service.initialize().await;
    service.data_gateway_mut().semester_fault =
        Some(GatewayError::Transport("loader down".into()));

    let result = service.switch_context(2568, 2).await;

    assert!(result.is_err());
    // the selection itself had already committed; local state stays authoritative
    assert_eq!(service.snapshot().current_year(), Some(2568));
    assert!(service.snapshot().phase.error().is_some());
}

#[tokio::test]
async fn error_listeners_hear_about_failed_switches() {
    let mut service = make_service(Dataset::sample());
    service.initialize().await;

    let heard = Arc::new(AtomicUsize::new(0));
    let heard_clone = Arc::clone(&heard);
    service.on_context_error(move |reason| {
        assert!(reason.contains("not found"));
        heard_clone.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let _ = service.switch_context(2568, 7).await;

    assert_eq!(heard.load(Ordering::SeqCst), 1);
}
