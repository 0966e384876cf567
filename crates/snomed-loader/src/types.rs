//! Loader configuration, file sets and errors.

use std::path::PathBuf;
use thiserror::Error;

use snomed_types::{CharacteristicType, DescriptionType, SctId};

/// Errors that can occur while loading an RF2 snapshot.
#[derive(Error, Debug)]
pub enum Rf2Error {
    /// I/O error reading RF2 file.
    #[error("IO error reading RF2 file: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error.
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid SCTID format.
    #[error("Invalid SCTID format: {value}")]
    InvalidSctId {
        /// The invalid value that was encountered.
        value: String,
    },

    /// Invalid date format.
    #[error("Invalid date format: {value}")]
    InvalidDate {
        /// The invalid date value.
        value: String,
    },

    /// Invalid boolean value.
    #[error("Invalid boolean value: {value} (expected 0 or 1)")]
    InvalidBoolean {
        /// The invalid boolean value.
        value: String,
    },

    /// Invalid integer value.
    #[error("Invalid integer value: {value}")]
    InvalidInteger {
        /// The invalid integer value.
        value: String,
    },

    /// A coded value that the model has no variant for.
    #[error("Unknown {field} id: {value}")]
    UnknownCode {
        /// Column the value was read from.
        field: &'static str,
        /// The unrecognised SCTID.
        value: SctId,
    },

    /// File not found.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Directory not found.
    #[error("Directory not found: {path}")]
    DirectoryNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Required file missing from RF2 directory.
    #[error("Required RF2 file not found: {file_type} in {directory}")]
    RequiredFileMissing {
        /// The type of file that was missing.
        file_type: String,
        /// The directory that was searched.
        directory: String,
    },

    /// Invalid header - column count mismatch.
    #[error("Invalid header: expected {expected} columns, found {found}")]
    InvalidHeader {
        /// Expected column count.
        expected: usize,
        /// Found column count.
        found: usize,
    },

    /// Unexpected column name.
    #[error("Unexpected column '{found}' at position {position}, expected '{expected}'")]
    UnexpectedColumn {
        /// The column position.
        position: usize,
        /// Expected column name.
        expected: String,
        /// Found column name.
        found: String,
    },
}

/// Result type for RF2 operations.
pub type Rf2Result<T> = Result<T, Rf2Error>;

/// Configuration shared by every RF2 file parse.
#[derive(Debug, Clone)]
pub struct Rf2Config {
    /// Whether to filter to active records only.
    pub active_only: bool,
}

impl Default for Rf2Config {
    fn default() -> Self {
        Self { active_only: true }
    }
}

/// Configuration specific to description parsing.
#[derive(Debug, Clone)]
pub struct DescriptionConfig {
    /// Base RF2 configuration.
    pub base: Rf2Config,
    /// Language codes to include (empty = all languages).
    pub language_codes: Vec<String>,
    /// Description type IDs to include (empty = all types).
    pub type_ids: Vec<SctId>,
}

impl Default for DescriptionConfig {
    fn default() -> Self {
        Self::english_fsns()
    }
}

impl DescriptionConfig {
    /// English fully specified names only.
    pub fn english_fsns() -> Self {
        Self {
            base: Rf2Config::default(),
            language_codes: vec!["en".to_string()],
            type_ids: vec![DescriptionType::FSN_ID],
        }
    }
}

/// Configuration specific to relationship parsing.
#[derive(Debug, Clone, Default)]
pub struct RelationshipConfig {
    /// Base RF2 configuration.
    pub base: Rf2Config,
    /// Relationship type IDs to include (empty = all types).
    pub type_ids: Vec<SctId>,
    /// Characteristic type IDs to include (empty = all types).
    pub characteristic_type_ids: Vec<SctId>,
}

impl RelationshipConfig {
    /// Creates a config for inferred relationships only.
    pub fn inferred_only() -> Self {
        Self {
            characteristic_type_ids: vec![CharacteristicType::INFERRED_ID],
            ..Self::default()
        }
    }

    /// Creates a config for stated relationships only.
    pub fn stated_only() -> Self {
        Self {
            characteristic_type_ids: vec![CharacteristicType::STATED_ID],
            ..Self::default()
        }
    }
}

/// Counters from loading a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Records that were parsed and kept.
    pub loaded: usize,
    /// Records dropped by filters.
    pub skipped: usize,
    /// Records that could not be attached (e.g. source concept unknown).
    pub orphaned: usize,
}

/// Discovered RF2 files in a release directory.
#[derive(Debug, Clone, Default)]
pub struct Rf2Files {
    /// Path to concept file.
    pub concept_file: Option<PathBuf>,
    /// Path to description file.
    pub description_file: Option<PathBuf>,
    /// Path to inferred relationship file.
    pub relationship_file: Option<PathBuf>,
    /// Path to stated relationship file.
    pub stated_relationship_file: Option<PathBuf>,
    /// Release date extracted from filename (YYYYMMDD).
    pub release_date: Option<String>,
}

impl Rf2Files {
    /// Creates a new empty Rf2Files.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if every file the remodeler needs is present.
    pub fn has_required_files(&self) -> bool {
        self.missing_files().is_empty()
    }

    /// Returns a list of missing required files.
    pub fn missing_files(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.concept_file.is_none() {
            missing.push("Concept");
        }
        if self.description_file.is_none() {
            missing.push("Description");
        }
        if self.relationship_file.is_none() {
            missing.push("Relationship");
        }
        if self.stated_relationship_file.is_none() {
            missing.push("StatedRelationship");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rf2_config_default() {
        assert!(Rf2Config::default().active_only);
    }

    #[test]
    fn test_relationship_configs() {
        assert_eq!(
            RelationshipConfig::inferred_only().characteristic_type_ids,
            vec![CharacteristicType::INFERRED_ID]
        );
        assert_eq!(
            RelationshipConfig::stated_only().characteristic_type_ids,
            vec![CharacteristicType::STATED_ID]
        );
        assert!(RelationshipConfig::stated_only().type_ids.is_empty());
    }

    #[test]
    fn test_rf2_files_missing() {
        let files = Rf2Files {
            concept_file: Some(PathBuf::from("concept.txt")),
            relationship_file: Some(PathBuf::from("relationship.txt")),
            ..Default::default()
        };

        assert!(!files.has_required_files());
        let missing = files.missing_files();
        assert_eq!(missing, vec!["Description", "StatedRelationship"]);
    }
}
