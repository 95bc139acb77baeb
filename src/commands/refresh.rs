// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Refresh command - re-load availability from the backend

use anyhow::{anyhow, Result};
use semtable::config::Config;
use std::path::Path;

/// Run the refresh command
pub async fn run(data_dir: &Path, config: &Config) -> Result<()> {
    let mut service = super::build_service(data_dir, config, true)?;
    service.initialize().await;

    let state = service
        .refresh_from_backend()
        .await
        .map_err(|err| anyhow!("refresh failed: {err}"))?;

    println!("refreshed: {}", semtable::projector::status_line(&state));
    Ok(())
}
