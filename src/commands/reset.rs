// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Reset command - clear the selection and stored snapshot

use anyhow::Result;
use semtable::config::Config;
use std::path::Path;

/// Run the reset command
pub async fn run(data_dir: &Path, config: &Config) -> Result<()> {
    let mut service = super::build_service(data_dir, config, true)?;
    service.initialize().await;

    let state = service.reset_context();

    println!("context reset ({} years still known)", state.available_years.len());
    Ok(())
}
