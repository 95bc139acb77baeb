// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Integrity command - diagnostic sweep over the current context

use anyhow::Result;
use semtable::config::Config;
use std::path::Path;

/// Run the integrity command
pub async fn run(data_dir: &Path, config: &Config) -> Result<()> {
    let mut service = super::build_service(data_dir, config, true)?;
    service.initialize().await;

    let report = service.debug_report();

    if report.integrity.is_valid {
        println!("context integrity: ok");
    } else {
        println!("context integrity: {} issue(s)", report.integrity.issues.len());
        for issue in &report.integrity.issues {
            println!("  - {issue}");
        }
    }
    println!(
        "listeners: {} context, {} year, {} semester, {} error",
        report.listeners.context_change,
        report.listeners.year_change,
        report.listeners.semester_change,
        report.listeners.context_error
    );

    Ok(())
}
