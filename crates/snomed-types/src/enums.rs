//! SNOMED CT enumeration types.
//!
//! This module provides enum representations for the coded values the
//! template engine works with: definition status, characteristic type and
//! description type.

use crate::SctId;

/// Definition status for a SNOMED CT concept.
///
/// Indicates whether a concept is primitively defined (necessary conditions only)
/// or fully defined (necessary and sufficient conditions).
///
/// # Examples
///
/// ```
/// use snomed_types::DefinitionStatus;
///
/// let status = DefinitionStatus::from_id(900000000000074008);
/// assert_eq!(status, Some(DefinitionStatus::Primitive));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DefinitionStatus {
    /// Concept is primitively defined (necessary conditions only).
    #[default]
    Primitive,
    /// Concept is fully defined (necessary and sufficient conditions).
    FullyDefined,
}

impl DefinitionStatus {
    /// SCTID for primitive definition status.
    pub const PRIMITIVE_ID: SctId = 900000000000074008;
    /// SCTID for fully defined definition status.
    pub const FULLY_DEFINED_ID: SctId = 900000000000073002;

    /// Creates a DefinitionStatus from its SCTID.
    ///
    /// Returns `None` if the ID doesn't match a known definition status.
    pub fn from_id(id: SctId) -> Option<Self> {
        match id {
            Self::PRIMITIVE_ID => Some(Self::Primitive),
            Self::FULLY_DEFINED_ID => Some(Self::FullyDefined),
            _ => None,
        }
    }

    /// Returns the SCTID for this definition status.
    pub fn to_id(self) -> SctId {
        match self {
            Self::Primitive => Self::PRIMITIVE_ID,
            Self::FullyDefined => Self::FULLY_DEFINED_ID,
        }
    }

    /// Returns the compositional grammar prefix for this status.
    ///
    /// `<<<` for primitive concepts, `===` for fully defined ones.
    pub fn expression_prefix(self) -> &'static str {
        match self {
            Self::Primitive => "<<<",
            Self::FullyDefined => "===",
        }
    }
}

/// Description type for SNOMED CT descriptions.
///
/// # Examples
///
/// ```
/// use snomed_types::DescriptionType;
///
/// let desc_type = DescriptionType::from_id(900000000000003001);
/// assert_eq!(desc_type, Some(DescriptionType::Fsn));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DescriptionType {
    /// Fully Specified Name - unambiguous description with semantic tag.
    Fsn,
    /// Synonym - additional acceptable term for the concept.
    Synonym,
}

impl DescriptionType {
    /// SCTID for Fully Specified Name type.
    pub const FSN_ID: SctId = 900000000000003001;
    /// SCTID for Synonym type.
    pub const SYNONYM_ID: SctId = 900000000000013009;

    /// Creates a DescriptionType from its SCTID.
    pub fn from_id(id: SctId) -> Option<Self> {
        match id {
            Self::FSN_ID => Some(Self::Fsn),
            Self::SYNONYM_ID => Some(Self::Synonym),
            _ => None,
        }
    }

    /// Returns the SCTID for this description type.
    pub fn to_id(self) -> SctId {
        match self {
            Self::Fsn => Self::FSN_ID,
            Self::Synonym => Self::SYNONYM_ID,
        }
    }
}

/// Characteristic type for SNOMED CT relationships.
///
/// Stated relationships are authored; inferred relationships are produced by
/// the classifier. A concept keeps the two forms separately and the template
/// engine always names the form it is looking at.
///
/// # Examples
///
/// ```
/// use snomed_types::CharacteristicType;
///
/// let char_type = CharacteristicType::from_id(900000000000011006);
/// assert_eq!(char_type, Some(CharacteristicType::Inferred));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CharacteristicType {
    /// Stated relationship (as authored).
    Stated,
    /// Inferred relationship (computed by classifier).
    Inferred,
}

impl CharacteristicType {
    /// SCTID for stated relationship.
    pub const STATED_ID: SctId = 900000000000010007;
    /// SCTID for inferred relationship.
    pub const INFERRED_ID: SctId = 900000000000011006;

    /// Creates a CharacteristicType from its SCTID.
    ///
    /// Returns `None` if the ID doesn't match a known characteristic type.
    pub fn from_id(id: SctId) -> Option<Self> {
        match id {
            Self::STATED_ID => Some(Self::Stated),
            Self::INFERRED_ID => Some(Self::Inferred),
            _ => None,
        }
    }

    /// Returns the SCTID for this characteristic type.
    pub fn to_id(self) -> SctId {
        match self {
            Self::Stated => Self::STATED_ID,
            Self::Inferred => Self::INFERRED_ID,
        }
    }
}

impl std::fmt::Display for CharacteristicType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stated => write!(f, "stated"),
            Self::Inferred => write!(f, "inferred"),
        }
    }
}
