// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Status command - show the current context

use anyhow::Result;
use semtable::config::Config;
use std::path::Path;

/// Run the status command
pub async fn run(data_dir: &Path, config: &Config) -> Result<()> {
    let mut service = super::build_service(data_dir, config, true)?;

    service.initialize().await;
    let report = service.debug_report();

    println!(
        "{}",
        semtable::projector::status_line(&report.context)
    );
    println!(
        "availability: {} years, {} semesters",
        report.context.available_years.len(),
        report.context.available_semesters.len()
    );
    println!(
        "stored snapshot: {}",
        if report.has_stored_context { "yes" } else { "no" }
    );

    Ok(())
}
