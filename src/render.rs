// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Render port - the UI seam of the context service
//!
//! The projector drives this trait instead of a concrete widget toolkit; a
//! DOM binding, a console printer, and the recording adapter used in tests
//! are all equivalent implementations.

use crate::types::{Semester, Year};

/// The two selector widgets the context projects into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// The academic-year selector
    Year,
    /// The semester selector
    Semester,
}

/// Option list for one selector, placeholder included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorOptions {
    /// Placeholder entry text ("select ..." or the empty-state message)
    pub placeholder: String,
    /// Whether the placeholder may be chosen (false for empty-state text)
    pub placeholder_selectable: bool,
    /// Concrete entries, in backend order
    pub entries: Vec<SelectorEntry>,
}

/// One selectable entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorEntry {
    /// Value submitted when chosen (year number or semester id)
    pub value: String,
    /// Text shown to the user
    pub label: String,
}

impl SelectorOptions {
    /// Build the year selector's options
    #[must_use]
    pub fn for_years(years: &[Year]) -> Self {
        if years.is_empty() {
            return Self {
                placeholder: "no academic years available - add one in the admin page".into(),
                placeholder_selectable: false,
                entries: Vec::new(),
            };
        }

        Self {
            placeholder: "select academic year".into(),
            placeholder_selectable: true,
            entries: years
                .iter()
                .map(|y| SelectorEntry {
                    value: y.year.to_string(),
                    label: if y.is_active {
                        format!("academic year {} (active)", y.year)
                    } else {
                        format!("academic year {}", y.year)
                    },
                })
                .collect(),
        }
    }

    /// Build the semester selector's options
    #[must_use]
    pub fn for_semesters(semesters: &[Semester]) -> Self {
        if semesters.is_empty() {
            return Self {
                placeholder: "no semesters available - add one in the admin page".into(),
                placeholder_selectable: false,
                entries: Vec::new(),
            };
        }

        Self {
            placeholder: "select semester".into(),
            placeholder_selectable: true,
            entries: semesters
                .iter()
                .map(|s| SelectorEntry {
                    value: s.id.to_string(),
                    label: if s.is_active {
                        format!("{} (active)", s.name)
                    } else {
                        s.name.clone()
                    },
                })
                .collect(),
        }
    }
}

/// One-way UI sink the projector renders into.
///
/// Implementations must treat every call as a full replacement of the
/// corresponding widget aspect; the projector already suppresses redundant
/// rebuilds and focus-stealing writes.
pub trait RenderPort: Send {
    /// Whether the user currently interacts with `selector` (focus, open
    /// dropdown). The projector never overwrites such a control.
    fn is_user_interacting(&self, selector: Selector) -> bool;

    /// Replace the year selector's option list
    fn render_years(&mut self, options: &SelectorOptions, selected: Option<i32>);

    /// Replace the semester selector's option list
    fn render_semesters(&mut self, options: &SelectorOptions, selected: Option<i64>);

    /// Write the year selector's value without rebuilding its options
    fn set_selected_year(&mut self, year: Option<i32>);

    /// Write the semester selector's value without rebuilding its options
    fn set_selected_semester(&mut self, semester_id: Option<i64>);

    /// Enable or disable both selectors (disabled while loading)
    fn set_selectors_enabled(&mut self, enabled: bool);

    /// Show or hide the loading indicator
    fn set_loading(&mut self, visible: bool);

    /// Show the error banner with `message`, or hide it for `None`
    fn set_error(&mut self, message: Option<&str>);

    /// Update the one-line context status display
    fn set_status(&mut self, status: &str);
}

// =============================================================================
// Console adapter
// =============================================================================

/// Render port that prints context changes to stdout; the CLI's UI
#[derive(Debug, Default)]
pub struct ConsoleRenderer {
    quiet: bool,
}

impl ConsoleRenderer {
    /// Create a console renderer; `quiet` suppresses selector dumps
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    fn print_options(kind: &str, options: &SelectorOptions, selected: Option<&str>) {
        println!("{kind}:");
        println!("  [{}]", options.placeholder);
        for entry in &options.entries {
            let marker = if selected == Some(entry.value.as_str()) {
                "*"
            } else {
                " "
            };
            println!("  {marker} {} ({})", entry.label, entry.value);
        }
    }
}

impl RenderPort for ConsoleRenderer {
    fn is_user_interacting(&self, _selector: Selector) -> bool {
        // a console dump can never steal focus
        false
    }

    fn render_years(&mut self, options: &SelectorOptions, selected: Option<i32>) {
        if !self.quiet {
            let selected = selected.map(|y| y.to_string());
            Self::print_options("years", options, selected.as_deref());
        }
    }

    fn render_semesters(&mut self, options: &SelectorOptions, selected: Option<i64>) {
        if !self.quiet {
            let selected = selected.map(|s| s.to_string());
            Self::print_options("semesters", options, selected.as_deref());
        }
    }

    fn set_selected_year(&mut self, _year: Option<i32>) {}

    fn set_selected_semester(&mut self, _semester_id: Option<i64>) {}

    fn set_selectors_enabled(&mut self, _enabled: bool) {}

    fn set_loading(&mut self, visible: bool) {
        if visible && !self.quiet {
            println!("loading...");
        }
    }

    fn set_error(&mut self, message: Option<&str>) {
        if let Some(message) = message {
            eprintln!("error: {message}");
        }
    }

    fn set_status(&mut self, status: &str) {
        if !self.quiet {
            println!("{status}");
        }
    }
}

// =============================================================================
// Recording adapter
// =============================================================================

/// Render port that records every call; the test double for UI assertions
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    /// Which selectors report user interaction
    pub interacting: Vec<Selector>,
    /// Latest rendered year options, if any
    pub year_options: Option<SelectorOptions>,
    /// Latest rendered semester options, if any
    pub semester_options: Option<SelectorOptions>,
    /// Latest year value write
    pub selected_year: Option<i32>,
    /// Latest semester value write
    pub selected_semester: Option<i64>,
    /// Latest enable/disable state
    pub selectors_enabled: bool,
    /// Latest loading visibility
    pub loading: bool,
    /// Latest error banner content
    pub error: Option<String>,
    /// Latest status line
    pub status: String,
    /// Count of year option rebuilds
    pub year_rebuilds: usize,
    /// Count of semester option rebuilds
    pub semester_rebuilds: usize,
    /// Count of year value writes
    pub year_value_writes: usize,
    /// Count of semester value writes
    pub semester_value_writes: usize,
}

impl RecordingRenderer {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self {
            selectors_enabled: true,
            ..Self::default()
        }
    }
}

impl RenderPort for RecordingRenderer {
    fn is_user_interacting(&self, selector: Selector) -> bool {
        self.interacting.contains(&selector)
    }

    fn render_years(&mut self, options: &SelectorOptions, selected: Option<i32>) {
        self.year_options = Some(options.clone());
        self.selected_year = selected;
        self.year_rebuilds += 1;
    }

    fn render_semesters(&mut self, options: &SelectorOptions, selected: Option<i64>) {
        self.semester_options = Some(options.clone());
        self.selected_semester = selected;
        self.semester_rebuilds += 1;
    }

    fn set_selected_year(&mut self, year: Option<i32>) {
        self.selected_year = year;
        self.year_value_writes += 1;
    }

    fn set_selected_semester(&mut self, semester_id: Option<i64>) {
        self.selected_semester = semester_id;
        self.semester_value_writes += 1;
    }

    fn set_selectors_enabled(&mut self, enabled: bool) {
        self.selectors_enabled = enabled;
    }

    fn set_loading(&mut self, visible: bool) {
        self.loading = visible;
    }

    fn set_error(&mut self, message: Option<&str>) {
        self.error = message.map(String::from);
    }

    fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }
}
