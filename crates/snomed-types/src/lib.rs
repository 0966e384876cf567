//! # snomed-types
//!
//! Domain model for SNOMED CT concept modelling work.
//!
//! This crate defines concepts with their stated and inferred relationships,
//! role groups as values, and the cardinality ranges used by authoring
//! templates.
//!
//! ## Features
//!
//! - `serde` (default): Enables serialization/deserialization support via serde.
//!   Disable this feature for zero-dependency usage.
//!
//! ## Usage
//!
//! ```rust
//! use snomed_types::{CharacteristicType, Concept, Relationship, SctId, well_known};
//!
//! let mut concept = Concept::new(125605004);
//! concept.add_relationship(Relationship::new(
//!     125605004,
//!     well_known::FINDING_SITE,
//!     272673000,
//!     1,
//!     CharacteristicType::Inferred,
//! ));
//!
//! let groups = concept.relationship_groups(CharacteristicType::Inferred);
//! assert_eq!(groups.len(), 1);
//! assert!(groups[0].is_grouped());
//!
//! let is_a_type: SctId = well_known::IS_A;
//! assert_eq!(is_a_type, 116680003);
//! ```

#![warn(missing_docs)]

mod cardinality;
mod concept;
mod enums;
mod relationship;
mod relationship_group;
pub mod well_known;

pub use cardinality::{Cardinality, CardinalityParseError};
pub use concept::Concept;
pub use enums::{CharacteristicType, DefinitionStatus, DescriptionType};
pub use relationship::{Relationship, RelationshipValue, TypeValue};
pub use relationship_group::RelationshipGroup;

/// A SNOMED CT identifier (SCTID).
///
/// SCTIDs are 64-bit unsigned integers that identify concepts, descriptions
/// and relationships.
pub type SctId = u64;
