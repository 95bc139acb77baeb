// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//
//! Command implementations

pub mod completions;
pub mod init;
pub mod integrity;
pub mod refresh;
pub mod reset;
pub mod status;
pub mod switch;
pub mod validate;

use anyhow::Result;
use semtable::config::Config;
use semtable::coordinator::ContextService;
use semtable::mock::{MockBackend, MockData};
use semtable::persistence::FileStorage;
use semtable::render::ConsoleRenderer;
use semtable::validation::AccessPolicy;
use std::path::{Path, PathBuf};

/// A CLI service instance, wired to the mock backend and console renderer
pub type CliService = ContextService<MockBackend, MockData, ConsoleRenderer>;

/// Pick the data directory: explicit flag/env first, then config
pub fn resolve_data_dir(flag: Option<PathBuf>, config: &Config) -> PathBuf {
    flag.unwrap_or_else(|| config.data_dir.clone())
}

/// Wire a context service against the data directory's mock backend
pub fn build_service(data_dir: &Path, config: &Config, quiet: bool) -> Result<CliService> {
    let backend = MockBackend::load(data_dir)?;
    let data = MockData::new(&backend.dataset);
    let storage = Box::new(FileStorage::new(data_dir));
    let renderer = ConsoleRenderer::new(quiet);

    let mut service = ContextService::new(backend, data, storage, renderer);
    service.set_policy(AccessPolicy {
        max_year_distance: config.access_year_window,
    });
    Ok(service)
}

/// Persist the mock backend dataset so later invocations observe changes
pub fn save_backend(service: &CliService, data_dir: &Path) -> Result<()> {
    service.backend().save(data_dir)
}
