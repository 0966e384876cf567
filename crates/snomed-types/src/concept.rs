//! SNOMED CT Concept type.
//!
//! A [`Concept`] carries its stated and inferred relationships separately.
//! Role groups are derived on demand from the relationships' group ids.

use std::collections::BTreeMap;

use crate::{CharacteristicType, DefinitionStatus, Relationship, RelationshipGroup, SctId};

/// A SNOMED CT concept together with its relationships.
///
/// # Examples
///
/// ```
/// use snomed_types::{CharacteristicType, Concept, Relationship, well_known};
///
/// let mut concept = Concept::new(125605004).with_fsn("Fracture of bone (disorder)");
/// concept.add_relationship(Relationship::new(
///     125605004,
///     well_known::IS_A,
///     well_known::CLINICAL_FINDING,
///     0,
///     CharacteristicType::Stated,
/// ));
///
/// assert_eq!(concept.parents(CharacteristicType::Stated), vec![well_known::CLINICAL_FINDING]);
/// assert!(concept.is_primitive());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Concept {
    /// Unique identifier for this concept (SCTID).
    pub id: SctId,
    /// Whether this concept is active.
    pub active: bool,
    /// Whether this concept is primitive or fully defined.
    pub definition_status: DefinitionStatus,
    /// Fully specified name, if descriptions were loaded.
    pub fsn: Option<String>,
    /// Preferred term, when the caller knows it. The RF2 loader leaves this unset.
    pub preferred_term: Option<String>,
    /// Stated (authored) relationships.
    pub stated_relationships: Vec<Relationship>,
    /// Inferred (classified) relationships.
    pub inferred_relationships: Vec<Relationship>,
}

impl Concept {
    /// Creates an active, primitive concept with no descriptions or relationships.
    pub fn new(id: SctId) -> Self {
        Self {
            id,
            active: true,
            definition_status: DefinitionStatus::Primitive,
            fsn: None,
            preferred_term: None,
            stated_relationships: Vec::new(),
            inferred_relationships: Vec::new(),
        }
    }

    /// Sets the FSN.
    pub fn with_fsn(mut self, fsn: impl Into<String>) -> Self {
        self.fsn = Some(fsn.into());
        self
    }

    /// Sets the preferred term.
    pub fn with_preferred_term(mut self, term: impl Into<String>) -> Self {
        self.preferred_term = Some(term.into());
        self
    }

    /// Returns true if this concept is primitively defined.
    pub fn is_primitive(&self) -> bool {
        self.definition_status == DefinitionStatus::Primitive
    }

    /// Name used for display and ordering: FSN, then preferred term, then id.
    pub fn display_name(&self) -> String {
        self.fsn
            .clone()
            .or_else(|| self.preferred_term.clone())
            .unwrap_or_else(|| self.id.to_string())
    }

    /// All relationships of one characteristic type, active or not.
    pub fn relationships(&self, char_type: CharacteristicType) -> &[Relationship] {
        match char_type {
            CharacteristicType::Stated => &self.stated_relationships,
            CharacteristicType::Inferred => &self.inferred_relationships,
        }
    }

    fn relationships_mut(&mut self, char_type: CharacteristicType) -> &mut Vec<Relationship> {
        match char_type {
            CharacteristicType::Stated => &mut self.stated_relationships,
            CharacteristicType::Inferred => &mut self.inferred_relationships,
        }
    }

    /// Active relationships of one characteristic type.
    pub fn active_relationships(
        &self,
        char_type: CharacteristicType,
    ) -> impl Iterator<Item = &Relationship> {
        self.relationships(char_type).iter().filter(|r| r.active)
    }

    /// Adds a relationship to the form named by its characteristic type.
    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.relationships_mut(relationship.characteristic_type)
            .push(relationship);
    }

    /// Active parents via IS_A in the given form, in ascending id order.
    pub fn parents(&self, char_type: CharacteristicType) -> Vec<SctId> {
        let mut parents: Vec<SctId> = self
            .active_relationships(char_type)
            .filter(|r| r.is_is_a())
            .filter_map(Relationship::destination_id)
            .collect();
        parents.sort_unstable();
        parents.dedup();
        parents
    }

    /// Active relationship groups of the given form, ordered by group id.
    ///
    /// Group 0 is included whenever any active relationship is ungrouped
    /// (IS_A relationships live there too).
    pub fn relationship_groups(&self, char_type: CharacteristicType) -> Vec<RelationshipGroup> {
        let mut groups: BTreeMap<u16, RelationshipGroup> = BTreeMap::new();
        for rel in self.active_relationships(char_type) {
            groups
                .entry(rel.group_id)
                .or_insert_with(|| RelationshipGroup::new(rel.group_id))
                .add(rel.clone());
        }
        groups.into_values().collect()
    }

    /// A single active relationship group, if it has any members.
    pub fn relationship_group(
        &self,
        char_type: CharacteristicType,
        group_id: u16,
    ) -> Option<RelationshipGroup> {
        let group = RelationshipGroup::with_relationships(
            group_id,
            self.active_relationships(char_type)
                .filter(|r| r.group_id == group_id)
                .cloned(),
        );
        (!group.is_empty()).then_some(group)
    }

    /// Replaces every relationship of one form with the contents of `groups`.
    ///
    /// Inactive relationships of that form are kept as they are.
    pub fn set_relationship_groups(
        &mut self,
        char_type: CharacteristicType,
        groups: impl IntoIterator<Item = RelationshipGroup>,
    ) {
        let rels = self.relationships_mut(char_type);
        rels.retain(|r| !r.active);
        for mut group in groups {
            rels.extend(group.drain());
        }
    }

    /// Renders one form as a normalised expression string.
    ///
    /// `<<< parent1 + parent2 : t=v, t=v, { t=v, t=v }, { ... }` with
    /// ungrouped attributes and groups sorted, so two forms that only differ
    /// in group numbering or relationship order render identically.
    pub fn to_expression(&self, char_type: CharacteristicType) -> String {
        let parents = self
            .parents(char_type)
            .iter()
            .map(SctId::to_string)
            .collect::<Vec<_>>()
            .join(" + ");

        let mut ungrouped = Vec::new();
        let mut grouped = Vec::new();
        for group in self.relationship_groups(char_type) {
            if group.is_grouped() {
                grouped.push(group.to_expression());
            } else {
                ungrouped.extend(group.type_values().iter().map(|tv| tv.to_string()));
            }
        }
        grouped.sort();
        ungrouped.extend(grouped);

        let prefix = self.definition_status.expression_prefix();
        if ungrouped.is_empty() {
            format!("{} {}", prefix, parents)
        } else {
            format!("{} {} : {}", prefix, parents, ungrouped.join(", "))
        }
    }
}

impl std::fmt::Display for Concept {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.fsn {
            Some(fsn) => write!(f, "{} |{}|", self.id, fsn),
            None => write!(f, "{}", self.id),
        }
    }
}
