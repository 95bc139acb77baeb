// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Validate command - dry-run the pre-switch checks

use anyhow::{anyhow, Result};
use semtable::config::Config;
use semtable::validation::{self, AccessPolicy};
use std::path::Path;

/// Run the validate command
pub async fn run(data_dir: &Path, config: &Config, year: i32, semester_id: i64) -> Result<()> {
    let mut service = super::build_service(data_dir, config, true)?;
    service.initialize().await;

    let state = service.snapshot();
    let policy = AccessPolicy {
        max_year_distance: config.access_year_window,
    };
    let reference_year = validation::current_buddhist_year();

    match validation::validate_context(&state, year, semester_id, policy, reference_year) {
        Ok((matched_year, matched_semester)) => {
            println!(
                "valid: year {} / {} (id {})",
                matched_year.year, matched_semester.name, matched_semester.id
            );
            Ok(())
        }
        Err(err) => Err(anyhow!("invalid: {err}")),
    }
}
