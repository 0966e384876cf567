//! Well-known SNOMED CT concept IDs.
//!
//! Constants for the hierarchies and attribute types the template engine
//! refers to by name.
//!
//! # Examples
//!
//! ```
//! use snomed_types::well_known;
//!
//! assert_eq!(well_known::IS_A, 116680003);
//! assert_eq!(well_known::BODY_STRUCTURE, 123037004);
//! ```

use crate::SctId;

// =============================================================================
// Root Concepts
// =============================================================================

/// SNOMED CT root concept (138875005).
pub const SNOMED_CT_ROOT: SctId = 138875005;

// =============================================================================
// Top-Level Hierarchies
// =============================================================================

/// Clinical finding (finding) - 404684003.
pub const CLINICAL_FINDING: SctId = 404684003;

/// Procedure (procedure) - 71388002.
pub const PROCEDURE: SctId = 71388002;

/// Body structure (body structure) - 123037004.
pub const BODY_STRUCTURE: SctId = 123037004;

/// Morphologically abnormal structure (morphologic abnormality) - 49755003.
pub const MORPHOLOGIC_ABNORMALITY: SctId = 49755003;

/// Organism (organism) - 410607006.
pub const ORGANISM: SctId = 410607006;

/// Substance (substance) - 105590001.
pub const SUBSTANCE: SctId = 105590001;

/// Qualifier value - 362981000.
pub const QUALIFIER_VALUE: SctId = 362981000;

/// Concept model attribute (attribute) - 410662002.
///
/// Root of the attribute hierarchy; used when rendering restrictive ECL.
pub const CONCEPT_MODEL_ATTRIBUTE: SctId = 410662002;

// =============================================================================
// Attribute Types
// =============================================================================

/// IS_A relationship type - 116680003.
pub const IS_A: SctId = 116680003;

/// Finding site attribute - 363698007.
pub const FINDING_SITE: SctId = 363698007;

/// Associated morphology attribute - 116676008.
pub const ASSOCIATED_MORPHOLOGY: SctId = 116676008;

/// Causative agent attribute - 246075003.
pub const CAUSATIVE_AGENT: SctId = 246075003;

/// Pathological process attribute - 370135005.
pub const PATHOLOGICAL_PROCESS: SctId = 370135005;

/// Due to attribute - 42752001.
pub const DUE_TO: SctId = 42752001;

/// After attribute - 255234002.
pub const AFTER: SctId = 255234002;

/// Occurrence attribute - 246454002.
pub const OCCURRENCE: SctId = 246454002;

/// Clinical course attribute - 263502005.
pub const CLINICAL_COURSE: SctId = 263502005;

/// Severity attribute - 246112005.
pub const SEVERITY: SctId = 246112005;

/// Interprets attribute - 363714003.
pub const INTERPRETS: SctId = 363714003;

/// Has interpretation attribute - 363713009.
pub const HAS_INTERPRETATION: SctId = 363713009;

// =============================================================================
// Modules
// =============================================================================

/// SNOMED CT core module - 900000000000207008.
pub const SNOMED_CT_CORE_MODULE: SctId = 900000000000207008;
