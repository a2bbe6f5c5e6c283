//! Mutable configuration of an error reporting utility.

use crate::domain::printable::{to_printable, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of records kept per owner.
pub const DEFAULT_KEEP_ENTRIES: usize = 20;

/// Type names ignored unless configured otherwise.
pub const DEFAULT_IGNORED_EXCEPTIONS: &[&str] = &["Unauthorized"];

/// Error returned when properties fail validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertiesError {
    /// At least one record must be kept
    ZeroKeepEntries,
}

impl fmt::Display for PropertiesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertiesError::ZeroKeepEntries => write!(f, "keep_entries must be greater than 0"),
        }
    }
}

impl std::error::Error for PropertiesError {}

/// Properties read and written through `get_properties`/`set_properties`.
///
/// Deserializing fills missing fields with the defaults; use
/// [`Properties::validate`] before handing deserialized values to a utility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Properties {
    /// Maximum number of records kept per owner
    pub keep_entries: usize,
    /// Whether admitted errors are copied to the system log
    pub copy_to_log: bool,
    /// Type names that are neither recorded nor logged
    pub ignored_exceptions: Vec<String>,
}

impl Properties {
    /// Build validated properties, normalizing ignored type names.
    ///
    /// Each ignored entry is converted to text (bytes are decoded) and empty
    /// entries are dropped.
    ///
    /// # Errors
    /// `PropertiesError::ZeroKeepEntries` if `keep_entries` is zero.
    pub fn new<I, V>(
        keep_entries: usize,
        copy_to_log: bool,
        ignored_exceptions: I,
    ) -> Result<Self, PropertiesError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let ignored_exceptions = ignored_exceptions
            .into_iter()
            .map(Into::into)
            .filter(|value: &Value| !value.is_empty())
            .map(|value| to_printable(&value, false))
            .filter(|name| !name.is_empty())
            .collect();

        let properties = Self {
            keep_entries,
            copy_to_log,
            ignored_exceptions,
        };
        properties.validate()?;
        Ok(properties)
    }

    /// Check invariants that deserialization cannot enforce.
    pub fn validate(&self) -> Result<(), PropertiesError> {
        if self.keep_entries == 0 {
            return Err(PropertiesError::ZeroKeepEntries);
        }
        Ok(())
    }

    pub fn is_ignored(&self, type_name: &str) -> bool {
        self.ignored_exceptions.iter().any(|name| name == type_name)
    }
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            keep_entries: DEFAULT_KEEP_ENTRIES,
            copy_to_log: true,
            ignored_exceptions: DEFAULT_IGNORED_EXCEPTIONS
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}
