//! SNOMED CT Relationship type.
//!
//! A [`Relationship`] is one attribute of a concept in either its stated or
//! inferred form. For template matching two relationships are "the same"
//! when their type and value agree, whatever group they sit in; that notion
//! is captured by [`TypeValue`].

use crate::{well_known, CharacteristicType, SctId};

/// The target of a relationship: another concept, or a concrete literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RelationshipValue {
    /// Reference to a concept.
    Concept(SctId),
    /// Concrete value literal (e.g. `#250` or `"text"`).
    Concrete(String),
}

impl RelationshipValue {
    /// Returns the concept id if this value references a concept.
    pub fn concept_id(&self) -> Option<SctId> {
        match self {
            Self::Concept(id) => Some(*id),
            Self::Concrete(_) => None,
        }
    }
}

impl std::fmt::Display for RelationshipValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Concept(id) => write!(f, "{}", id),
            Self::Concrete(literal) => write!(f, "{}", literal),
        }
    }
}

/// Group-independent identity of a relationship: attribute type plus value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeValue {
    /// Attribute type.
    pub type_id: SctId,
    /// Attribute value.
    pub value: RelationshipValue,
}

impl TypeValue {
    /// Creates a type/value pair pointing at a concept.
    pub fn new(type_id: SctId, value_id: SctId) -> Self {
        Self {
            type_id,
            value: RelationshipValue::Concept(value_id),
        }
    }
}

impl std::fmt::Display for TypeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.type_id, self.value)
    }
}

/// A relationship (attribute) of a concept.
///
/// # Examples
///
/// ```
/// use snomed_types::{CharacteristicType, Relationship, well_known};
///
/// let rel = Relationship::new(
///     73211009,
///     well_known::FINDING_SITE,
///     113331007,
///     1,
///     CharacteristicType::Inferred,
/// );
///
/// assert!(!rel.is_is_a());
/// assert!(rel.is_grouped());
/// assert_eq!(rel.id, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Relationship {
    /// SCTID, or `None` for a relationship created in this run.
    pub id: Option<SctId>,
    /// Source concept (subject).
    pub source_id: SctId,
    /// Relationship type (e.g., IS_A, Finding site).
    pub type_id: SctId,
    /// Destination concept or concrete value.
    pub target: RelationshipValue,
    /// Role group number (0 = ungrouped).
    pub group_id: u16,
    /// Whether this is stated or inferred.
    pub characteristic_type: CharacteristicType,
    /// Whether this relationship is active.
    pub active: bool,
}

impl Relationship {
    /// Creates a new, unidentified, active relationship to a concept.
    pub fn new(
        source_id: SctId,
        type_id: SctId,
        destination_id: SctId,
        group_id: u16,
        characteristic_type: CharacteristicType,
    ) -> Self {
        Self {
            id: None,
            source_id,
            type_id,
            target: RelationshipValue::Concept(destination_id),
            group_id,
            characteristic_type,
            active: true,
        }
    }

    /// Creates a relationship from a type/value pair.
    pub fn from_type_value(
        source_id: SctId,
        type_value: &TypeValue,
        group_id: u16,
        characteristic_type: CharacteristicType,
    ) -> Self {
        Self {
            id: None,
            source_id,
            type_id: type_value.type_id,
            target: type_value.value.clone(),
            group_id,
            characteristic_type,
            active: true,
        }
    }

    /// Returns true if this is an IS_A (subtype) relationship.
    pub fn is_is_a(&self) -> bool {
        self.type_id == well_known::IS_A
    }

    /// Returns true if this relationship sits in a role group other than 0.
    pub fn is_grouped(&self) -> bool {
        self.group_id != 0
    }

    /// Returns the destination concept id, if the target is a concept.
    pub fn destination_id(&self) -> Option<SctId> {
        self.target.concept_id()
    }

    /// Returns the group-independent type/value identity.
    pub fn type_value(&self) -> TypeValue {
        TypeValue {
            type_id: self.type_id,
            value: self.target.clone(),
        }
    }

    /// Returns true if the type and value match, regardless of group.
    pub fn matches_type_value(&self, type_value: &TypeValue) -> bool {
        self.type_id == type_value.type_id && self.target == type_value.value
    }

    /// Clones this relationship without its identifier, so it will be
    /// written out as a new component.
    pub fn clone_fresh(&self) -> Self {
        Self {
            id: None,
            ..self.clone()
        }
    }

    /// Clones this relationship into another group, keeping its identifier.
    pub fn clone_into_group(&self, group_id: u16) -> Self {
        Self {
            group_id,
            ..self.clone()
        }
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}={}", self.group_id, self.type_id, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_relationship(type_id: SctId, group_id: u16) -> Relationship {
        Relationship {
            id: Some(100000028),
            source_id: 73211009,
            type_id,
            target: RelationshipValue::Concept(362969004),
            group_id,
            characteristic_type: CharacteristicType::Stated,
            active: true,
        }
    }

    #[test]
    fn test_relationship_is_a() {
        let rel = make_relationship(well_known::IS_A, 0);
        assert!(rel.is_is_a());
        assert!(!rel.is_grouped());
    }

    #[test]
    fn test_type_value_ignores_group() {
        let grouped = make_relationship(well_known::FINDING_SITE, 2);
        let ungrouped = make_relationship(well_known::FINDING_SITE, 0);
        assert_eq!(grouped.type_value(), ungrouped.type_value());
        assert!(ungrouped.matches_type_value(&TypeValue::new(well_known::FINDING_SITE, 362969004)));
    }

    #[test]
    fn test_clone_identity() {
        let rel = make_relationship(well_known::FINDING_SITE, 0);
        assert_eq!(rel.clone_into_group(3).id, Some(100000028));
        assert_eq!(rel.clone_into_group(3).group_id, 3);
        assert_eq!(rel.clone_fresh().id, None);
    }

    #[test]
    fn test_concrete_value_has_no_destination() {
        let mut rel = make_relationship(well_known::FINDING_SITE, 1);
        rel.target = RelationshipValue::Concrete("#250".to_string());
        assert_eq!(rel.destination_id(), None);
        assert_eq!(rel.to_string(), "[1] 363698007=#250");
    }
}
