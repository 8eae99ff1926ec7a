//! Session settings.
//!
//! Every string lands in a fixed-size field of the wrapped engine, so each
//! one is length-checked against its capacity before it is accepted.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ValidationError;
use crate::seed::Seeds;

/// Capacity of the data-directory field, including the trailing NUL.
pub const HACKDIR_CAPACITY: usize = 4096;
/// Capacity of the options field.
pub const OPTIONS_CAPACITY: usize = 32768;
/// Capacity of the score-prefix field, including the trailing NUL.
pub const SCOREPREFIX_CAPACITY: usize = 4096;
/// Capacity of the trace-name field, including the trailing NUL.
pub const TTYRECNAME_CAPACITY: usize = 4096;
/// Capacity of the bootstrap-item-list field.
pub const WIZKIT_CAPACITY: usize = 4096;

/// Default worker stack size.
pub const DEFAULT_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Errors loading settings from disk.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file could not be read.
    #[error("failed to read settings: {0}")]
    Io(#[from] io::Error),
    /// The file is not valid settings JSON.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value does not fit its field.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Configuration handed to the simulation when a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Working directory for simulation data.
    pub hackdir: String,
    /// Engine options string.
    pub options: String,
    /// Prefix for score/log files.
    pub scoreprefix: String,
    /// Bootstrap item list, one item per line.
    pub wizkit: String,
    /// Whether the simulation spawns wandering monsters.
    pub spawn_monsters: bool,
    /// Seeds queued for the first episode.
    pub initial_seeds: Option<Seeds>,
    /// Stack size of the worker unit, in bytes.
    pub stack_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hackdir: String::new(),
            options: String::new(),
            scoreprefix: String::new(),
            wizkit: String::new(),
            spawn_monsters: true,
            initial_seeds: None,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

fn check(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            len: value.len(),
            capacity: max,
        });
    }
    Ok(())
}

impl Settings {
    /// Settings with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a JSON file and validate them.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or parsed, or if a field
    /// exceeds its capacity.
    pub fn from_json_file(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check every field against its capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TooLong`] for the first oversized field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check("hackdir", &self.hackdir, HACKDIR_CAPACITY - 1)?;
        check("options", &self.options, OPTIONS_CAPACITY)?;
        check("scoreprefix", &self.scoreprefix, SCOREPREFIX_CAPACITY - 1)?;
        check("wizkit", &self.wizkit, WIZKIT_CAPACITY)?;
        Ok(())
    }

    /// Set the data directory.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TooLong`] if it doesn't fit.
    pub fn set_hackdir(&mut self, value: impl Into<String>) -> Result<(), ValidationError> {
        let value = value.into();
        check("hackdir", &value, HACKDIR_CAPACITY - 1)?;
        self.hackdir = value;
        Ok(())
    }

    /// Set the options string.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TooLong`] if it doesn't fit.
    pub fn set_options(&mut self, value: impl Into<String>) -> Result<(), ValidationError> {
        let value = value.into();
        check("options", &value, OPTIONS_CAPACITY)?;
        self.options = value;
        Ok(())
    }

    /// Set the score prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TooLong`] if it doesn't fit.
    pub fn set_scoreprefix(&mut self, value: impl Into<String>) -> Result<(), ValidationError> {
        let value = value.into();
        check("scoreprefix", &value, SCOREPREFIX_CAPACITY - 1)?;
        self.scoreprefix = value;
        Ok(())
    }

    /// Set the bootstrap item list.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TooLong`] if it doesn't fit.
    pub fn set_wizkit(&mut self, value: impl Into<String>) -> Result<(), ValidationError> {
        let value = value.into();
        check("wizkit", &value, WIZKIT_CAPACITY)?;
        self.wizkit = value;
        Ok(())
    }

    /// Items of the bootstrap list, skipping blank lines.
    pub fn wizkit_items(&self) -> impl Iterator<Item = &str> {
        self.wizkit.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// Derive the embedded trace name for `path`.
///
/// The whole path is checked against the field capacity before anything
/// else, so oversized paths are rejected without touching the filesystem.
/// The name is the part after the last `/`, or the whole path if it has
/// none.
///
/// # Errors
///
/// Returns [`ValidationError::TooLong`] if the path doesn't fit.
pub fn trace_name_for(path: &Path) -> Result<String, ValidationError> {
    let full = path.to_string_lossy();
    check("ttyrec path", &full, TTYRECNAME_CAPACITY - 1)?;
    Ok(match full.rfind('/') {
        Some(i) => full[i + 1..].to_owned(),
        None => full.into_owned(),
    })
}
