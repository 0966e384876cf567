//! Error types for template matching and remodeling.

use std::path::PathBuf;

use snomed_loader::Rf2Error;
use snomed_types::SctId;
use thiserror::Error;

/// A per-concept failure: the concept is reported and skipped, the batch
/// carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{concept_id}: {message}")]
pub struct ValidationFailure {
    /// Concept the failure was raised against.
    pub concept_id: SctId,
    /// Human-readable reason.
    pub message: String,
}

impl ValidationFailure {
    /// Creates a validation failure for a concept.
    pub fn new(concept_id: SctId, message: impl Into<String>) -> Self {
        Self {
            concept_id,
            message: message.into(),
        }
    }
}

/// Errors raised while loading templates, matching or remodeling.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Template file could not be read.
    #[error("Failed to read template {}: {source}", .path.display())]
    TemplateRead {
        /// Template file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Template file is not valid template JSON.
    #[error("Failed to parse template {}: {source}", .path.display())]
    TemplateParse {
        /// Template file path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Template parsed but its content is unusable.
    #[error("Invalid template '{name}': {reason}")]
    InvalidTemplate {
        /// Template name or path.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The subhierarchy expression selected no concepts.
    #[error("Subhierarchy '{0}' contains no concepts")]
    EmptySubhierarchy(String),

    /// A concept id that the terminology graph does not know.
    #[error("Unknown concept: {0}")]
    UnknownConcept(SctId),

    /// A template attribute with neither an allowable range nor a fixed value.
    #[error("Unable to determine attribute range for attribute type {type_id}")]
    IllegalAttribute {
        /// Attribute type of the offending template attribute.
        type_id: SctId,
    },

    /// ECL outside the supported `<<X`, `<X`, `*` subset.
    #[error("ECL not supported here, resolve it through a terminology server: '{0}'")]
    UnsupportedEcl(String),

    /// Per-concept validation failure.
    #[error("Validation failure: {0}")]
    Validation(#[from] ValidationFailure),

    /// Failure while processing one concept against one template.
    #[error("Failed to process concept {concept_id} against template {template_id}: {source}")]
    Matching {
        /// Concept being processed.
        concept_id: SctId,
        /// Template being applied.
        template_id: char,
        /// Underlying cause.
        #[source]
        source: Box<TemplateError>,
    },

    /// Failure loading the RF2 release.
    #[error(transparent)]
    Rf2(#[from] Rf2Error),
}

impl TemplateError {
    /// Shorthand for a validation failure.
    pub fn validation(concept_id: SctId, message: impl Into<String>) -> Self {
        Self::Validation(ValidationFailure::new(concept_id, message))
    }

    /// Wraps an error with the concept and template being processed.
    ///
    /// Already-wrapped errors are returned unchanged.
    pub fn in_context(self, concept_id: SctId, template_id: char) -> Self {
        match self {
            wrapped @ Self::Matching { .. } => wrapped,
            other => Self::Matching {
                concept_id,
                template_id,
                source: Box::new(other),
            },
        }
    }

    /// True for failures that should skip the concept rather than stop the run.
    pub fn is_validation_failure(&self) -> bool {
        match self {
            Self::Validation(_) | Self::IllegalAttribute { .. } => true,
            Self::Matching { source, .. } => source.is_validation_failure(),
            _ => false,
        }
    }
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
