//! Role groups.
//!
//! A [`RelationshipGroup`] is a value: cloning it gives an independent
//! working copy, which is how the remodeler edits a concept without touching
//! the live one until it commits.

use crate::{Relationship, SctId, TypeValue};

/// Relationships of one concept and one characteristic type sharing a group id.
///
/// Group 0 holds the ungrouped relationships. It is modelled as a group so
/// that matching can treat it uniformly, but it is *not* a role group:
/// [`is_grouped`](Self::is_grouped) returns false for it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelationshipGroup {
    group_id: u16,
    relationships: Vec<Relationship>,
}

impl RelationshipGroup {
    /// Reserved id of the ungrouped set.
    pub const UNGROUPED: u16 = 0;

    /// Creates an empty group.
    pub fn new(group_id: u16) -> Self {
        Self {
            group_id,
            relationships: Vec::new(),
        }
    }

    /// Creates a group from relationships, re-stamping their group id.
    pub fn with_relationships(
        group_id: u16,
        relationships: impl IntoIterator<Item = Relationship>,
    ) -> Self {
        let mut group = Self::new(group_id);
        for rel in relationships {
            group.add(rel);
        }
        group
    }

    /// Returns the group id.
    pub fn group_id(&self) -> u16 {
        self.group_id
    }

    /// Changes the group id of the group and every relationship in it.
    pub fn set_group_id(&mut self, group_id: u16) {
        self.group_id = group_id;
        for rel in &mut self.relationships {
            rel.group_id = group_id;
        }
    }

    /// False for group 0.
    pub fn is_grouped(&self) -> bool {
        self.group_id != Self::UNGROUPED
    }

    /// Relationships in insertion order.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Relationships other than IS_A.
    pub fn attributes(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter(|r| !r.is_is_a())
    }

    /// Number of relationships in the group.
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// Returns true if the group holds no relationships.
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    /// Adds a relationship, moving it into this group.
    ///
    /// Returns false (and adds nothing) when the same type/value is already
    /// present.
    pub fn add(&mut self, mut relationship: Relationship) -> bool {
        if self.contains_type_value(&relationship.type_value()) {
            return false;
        }
        relationship.group_id = self.group_id;
        self.relationships.push(relationship);
        true
    }

    /// Removes every relationship with this type/value, returning them.
    pub fn remove_type_value(&mut self, type_value: &TypeValue) -> Vec<Relationship> {
        let (removed, kept) = std::mem::take(&mut self.relationships)
            .into_iter()
            .partition(|r| r.matches_type_value(type_value));
        self.relationships = kept;
        removed
    }

    /// Removes every relationship of this attribute type, returning them.
    pub fn remove_type(&mut self, type_id: SctId) -> Vec<Relationship> {
        let (removed, kept) = std::mem::take(&mut self.relationships)
            .into_iter()
            .partition(|r: &Relationship| r.type_id == type_id);
        self.relationships = kept;
        removed
    }

    /// Keeps only relationships for which the predicate holds.
    pub fn retain(&mut self, f: impl FnMut(&Relationship) -> bool) {
        self.relationships.retain(f);
    }

    /// Removes all relationships, returning them.
    pub fn drain(&mut self) -> Vec<Relationship> {
        std::mem::take(&mut self.relationships)
    }

    /// Returns true if any relationship has this type/value.
    pub fn contains_type_value(&self, type_value: &TypeValue) -> bool {
        self.relationships
            .iter()
            .any(|r| r.matches_type_value(type_value))
    }

    /// Returns true if any relationship has this attribute type.
    pub fn contains_type(&self, type_id: SctId) -> bool {
        self.relationships.iter().any(|r| r.type_id == type_id)
    }

    /// Relationships of the given attribute type.
    pub fn relationships_of_type(&self, type_id: SctId) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter(move |r| r.type_id == type_id)
    }

    /// Sorted type/values of the attributes in this group.
    pub fn type_values(&self) -> Vec<TypeValue> {
        let mut tvs: Vec<TypeValue> = self.attributes().map(Relationship::type_value).collect();
        tvs.sort();
        tvs
    }

    /// Renders `{ t1=v1, t2=v2 }` with attributes sorted by type then value.
    pub fn to_expression(&self) -> String {
        let body = self
            .type_values()
            .iter()
            .map(TypeValue::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{ {} }}", body)
    }
}

impl std::fmt::Display for RelationshipGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.group_id, self.to_expression())
    }
}
