// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Mock gateways backed by a static dataset
//!
//! Stands in for the real school backend: the CLI runs against it offline,
//! and tests use its failure toggles to exercise every degradation path.
//! The dataset round-trips through a JSON file in the data directory so CLI
//! invocations observe each other's switches.

use crate::gateway::{
    BackendContext, BackendGateway, ChangeNotifier, DataGateway, ExternalChange, GatewayError,
    YearData,
};
use crate::types::{Room, Semester, Year};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tokio::sync::mpsc::UnboundedSender;

/// The dataset a mock backend serves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Academic years on offer
    #[serde(default)]
    pub years: Vec<Year>,
    /// Semesters on offer
    #[serde(default)]
    pub semesters: Vec<Semester>,
    /// Rooms for the active semester
    #[serde(default)]
    pub rooms: Vec<Room>,
}

impl Dataset {
    /// A plausible school dataset: three years around the active one,
    /// two semesters, and a handful of rooms
    #[must_use]
    pub fn sample() -> Self {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d);
        Self {
            years: vec![
                Year {
                    year: 2566,
                    is_active: false,
                },
                Year {
                    year: 2567,
                    is_active: true,
                },
                Year {
                    year: 2568,
                    is_active: false,
                },
            ],
            semesters: vec![
                Semester {
                    id: 1,
                    name: "Semester 1".into(),
                    number: 1,
                    is_active: true,
                    start_date: date(2024, 5, 16),
                    end_date: date(2024, 10, 10),
                },
                Semester {
                    id: 2,
                    name: "Semester 2".into(),
                    number: 2,
                    is_active: false,
                    start_date: date(2024, 11, 1),
                    end_date: date(2025, 3, 31),
                },
            ],
            rooms: vec![
                Room {
                    id: 1,
                    name: "101".into(),
                    capacity: Some(40),
                    room_type: Some("general".into()),
                },
                Room {
                    id: 2,
                    name: "102".into(),
                    capacity: Some(40),
                    room_type: Some("general".into()),
                },
                Room {
                    id: 3,
                    name: "COM-1".into(),
                    capacity: Some(30),
                    room_type: Some("computer lab".into()),
                },
            ],
        }
    }

    /// An empty dataset; drives the degraded-state paths
    #[must_use]
    pub fn empty() -> Self {
        Self {
            years: Vec::new(),
            semesters: Vec::new(),
            rooms: Vec::new(),
        }
    }
}

/// Failure injection for one mock call site
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Fail `get_global_context` with this error
    pub global_context: Option<GatewayError>,
    /// Fail `get_academic_years` with this error
    pub years: Option<GatewayError>,
    /// Fail `get_semesters` with this error
    pub semesters: Option<GatewayError>,
    /// Fail `set_active_academic_year` with this error
    pub set_year: Option<GatewayError>,
    /// Fail `set_active_semester` with this error
    pub set_semester: Option<GatewayError>,
}

// =============================================================================
// Mock backend gateway
// =============================================================================

/// File name the dataset persists under inside the data directory
const DATASET_FILE: &str = "backend.json";

/// Backend gateway serving a [`Dataset`]
#[derive(Debug)]
pub struct MockBackend {
    /// The dataset served to the coordinator
    pub dataset: Dataset,
    /// Whether `is_authenticated` reports true
    pub authenticated: bool,
    /// Failure injection toggles
    pub faults: Faults,
    /// Recorded `set_active_academic_year` calls
    pub set_year_calls: Vec<i32>,
    /// Recorded `set_active_semester` calls
    pub set_semester_calls: Vec<i64>,
}

impl MockBackend {
    /// Serve `dataset`, authenticated
    #[must_use]
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            authenticated: true,
            faults: Faults::default(),
            set_year_calls: Vec::new(),
            set_semester_calls: Vec::new(),
        }
    }

    /// Load the dataset from `<data_dir>/backend.json`, seeding the sample
    /// dataset on first use
    ///
    /// # Errors
    ///
    /// Fails when an existing dataset file cannot be read or parsed.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(DATASET_FILE);
        let dataset = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Dataset::sample()
        };
        Ok(Self::new(dataset))
    }

    /// Save the dataset to `<data_dir>/backend.json`
    ///
    /// # Errors
    ///
    /// Fails when the directory or file cannot be written.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create directory {}", data_dir.display()))?;
        let path = data_dir.join(DATASET_FILE);
        let content =
            serde_json::to_string_pretty(&self.dataset).context("Failed to serialize dataset")?;
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn active_year(&self) -> Option<Year> {
        self.dataset.years.iter().find(|y| y.is_active).copied()
    }

    fn active_semester(&self) -> Option<Semester> {
        self.dataset
            .semesters
            .iter()
            .find(|s| s.is_active)
            .cloned()
    }
}

impl BackendGateway for MockBackend {
    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn get_global_context(&mut self) -> Result<BackendContext, GatewayError> {
        if let Some(err) = self.faults.global_context.clone() {
            return Err(err);
        }
        Ok(BackendContext {
            current_year: self.active_year().map(|y| y.year),
            current_semester: self.active_semester(),
        })
    }

    async fn get_academic_years(&mut self) -> Result<Vec<Year>, GatewayError> {
        if let Some(err) = self.faults.years.clone() {
            return Err(err);
        }
        Ok(self.dataset.years.clone())
    }

    async fn get_semesters(&mut self) -> Result<Vec<Semester>, GatewayError> {
        if let Some(err) = self.faults.semesters.clone() {
            return Err(err);
        }
        Ok(self.dataset.semesters.clone())
    }

    async fn set_active_academic_year(&mut self, year: i32) -> Result<(), GatewayError> {
        if let Some(err) = self.faults.set_year.clone() {
            return Err(err);
        }
        if !self.dataset.years.iter().any(|y| y.year == year) {
            return Err(GatewayError::Rejected(format!("unknown year {year}")));
        }
        self.set_year_calls.push(year);
        for y in &mut self.dataset.years {
            y.is_active = y.year == year;
        }
        Ok(())
    }

    async fn set_active_semester(&mut self, semester_id: i64) -> Result<(), GatewayError> {
        if let Some(err) = self.faults.set_semester.clone() {
            return Err(err);
        }
        if !self.dataset.semesters.iter().any(|s| s.id == semester_id) {
            return Err(GatewayError::Rejected(format!(
                "unknown semester {semester_id}"
            )));
        }
        self.set_semester_calls.push(semester_id);
        for s in &mut self.dataset.semesters {
            s.is_active = s.id == semester_id;
        }
        Ok(())
    }
}

// =============================================================================
// Mock data gateway
// =============================================================================

/// Data gateway serving rooms from a [`Dataset`]
#[derive(Debug)]
pub struct MockData {
    /// Rooms served to the coordinator
    pub rooms: Vec<Room>,
    /// Fail `get_rooms`/`load_year_data` with this error
    pub fault: Option<GatewayError>,
    /// Fail `load_semester_data` with this error
    pub semester_fault: Option<GatewayError>,
    /// How often `clear_cache` ran
    pub cache_clears: usize,
    /// Recorded `load_semester_data` calls
    pub semester_loads: Vec<i64>,
}

impl MockData {
    /// Serve the rooms of `dataset`
    #[must_use]
    pub fn new(dataset: &Dataset) -> Self {
        Self {
            rooms: dataset.rooms.clone(),
            fault: None,
            semester_fault: None,
            cache_clears: 0,
            semester_loads: Vec::new(),
        }
    }
}

impl DataGateway for MockData {
    async fn get_rooms(&mut self) -> Result<Vec<Room>, GatewayError> {
        match self.fault.clone() {
            Some(err) => Err(err),
            None => Ok(self.rooms.clone()),
        }
    }

    async fn load_year_data(&mut self, _year: i32) -> Result<YearData, GatewayError> {
        match self.fault.clone() {
            Some(err) => Err(err),
            None => Ok(YearData {
                rooms: self.rooms.clone(),
            }),
        }
    }

    fn clear_cache(&mut self) {
        self.cache_clears += 1;
    }

    async fn load_semester_data(&mut self, semester_id: i64) -> Result<(), GatewayError> {
        if let Some(err) = self.semester_fault.clone() {
            return Err(err);
        }
        self.semester_loads.push(semester_id);
        Ok(())
    }
}

// =============================================================================
// Channel notifier
// =============================================================================

/// [`ChangeNotifier`] that fans emitted events out to every subscriber
#[derive(Debug, Default)]
pub struct ChannelNotifier {
    sinks: Vec<UnboundedSender<ExternalChange>>,
}

impl ChannelNotifier {
    /// Create a notifier with no subscribers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `change` to every subscriber still listening
    pub fn emit(&mut self, change: ExternalChange) {
        self.sinks.retain(|sink| sink.send(change).is_ok());
    }
}

impl ChangeNotifier for ChannelNotifier {
    fn subscribe(&mut self, sink: UnboundedSender<ExternalChange>) {
        self.sinks.push(sink);
    }
}
