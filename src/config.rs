// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for persistent data (context store, mock backend dataset)
    pub data_dir: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// How far (in years) a teacher may stray from the current year
    pub access_year_window: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: directories::ProjectDirs::from("org", "semtable", "semtable")
                .map(|d| d.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("~/.local/share/semtable")),
            log_level: "info".to_string(),
            access_year_window: 2,
        }
    }
}

/// Load configuration from a TOML file, or use defaults when absent
///
/// # Errors
///
/// Fails when an explicitly given file cannot be read or parsed.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}
