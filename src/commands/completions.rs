// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Completions command - shell completion generation

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::Shell;

/// Generate completions for `shell` on stdout
pub fn run(shell: Shell) -> Result<()> {
    let mut command = crate::Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
    Ok(())
}
