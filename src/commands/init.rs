// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Init command - first context load against the backend

use anyhow::Result;
use semtable::config::Config;
use semtable::state::Phase;
use std::path::Path;

/// Run the init command
pub async fn run(data_dir: &Path, config: &Config) -> Result<()> {
    let mut service = super::build_service(data_dir, config, false)?;

    let state = service.initialize().await;

    match &state.phase {
        Phase::Ready => println!("context ready"),
        Phase::Degraded => println!("context degraded: backend reported no availability"),
        Phase::Failed(reason) => println!("context failed: {reason}"),
        Phase::Uninitialized | Phase::Loading => println!("context did not settle"),
    }
    println!(
        "years: {}, semesters: {}, rooms cached: {}",
        state.available_years.len(),
        state.available_semesters.len(),
        state.current_rooms.len()
    );

    super::save_backend(&service, data_dir)?;
    Ok(())
}
