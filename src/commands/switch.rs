// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Switch command - user-facing context transition

use anyhow::{anyhow, Result};
use semtable::config::Config;
use std::path::Path;

/// Run the switch command
pub async fn run(data_dir: &Path, config: &Config, year: i32, semester_id: i64) -> Result<()> {
    let mut service = super::build_service(data_dir, config, true)?;
    service.initialize().await;

    service
        .switch_context(year, semester_id)
        .await
        .map_err(|err| anyhow!("switch to {year}/{semester_id} failed: {err}"))?;

    // the mock backend carries the new active flags; persist them
    super::save_backend(&service, data_dir)?;

    let state = service.snapshot();
    println!("switched to {}", semtable::projector::status_line(&state));
    Ok(())
}
