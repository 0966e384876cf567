//! Relationship file reader.
//!
//! Reads both `sct2_Relationship_Snapshot_*.txt` (inferred) and
//! `sct2_StatedRelationship_Snapshot_*.txt`; the two share a layout.

use csv::StringRecord;
use snomed_types::{CharacteristicType, Relationship, RelationshipValue, SctId};

use crate::parser::{parse, Rf2Record};
use crate::types::{RelationshipConfig, Rf2Result};

const RELATIONSHIP_COLUMNS: &[&str] = &[
    "id",
    "effectiveTime",
    "active",
    "moduleId",
    "sourceId",
    "destinationId",
    "relationshipGroup",
    "typeId",
    "characteristicTypeId",
    "modifierId",
];

/// One relationship row with its raw characteristic type id.
///
/// Rows whose characteristic type is neither stated nor inferred (additional
/// relationships) parse fine but have no [`Relationship`] form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipRow {
    /// Relationship SCTID.
    pub id: SctId,
    /// Whether the relationship is active.
    pub active: bool,
    /// Source concept.
    pub source_id: SctId,
    /// Destination concept.
    pub destination_id: SctId,
    /// Role group number.
    pub relationship_group: u16,
    /// Attribute type.
    pub type_id: SctId,
    /// Characteristic type SCTID.
    pub characteristic_type_id: SctId,
}

impl RelationshipRow {
    /// Returns true if the row passes type, characteristic and activity filters.
    pub fn passes_relationship_filter(&self, config: &RelationshipConfig) -> bool {
        self.passes_filter(&config.base)
            && (config.type_ids.is_empty() || config.type_ids.contains(&self.type_id))
            && (config.characteristic_type_ids.is_empty()
                || config
                    .characteristic_type_ids
                    .contains(&self.characteristic_type_id))
    }

    /// Converts the row to a domain relationship.
    ///
    /// Returns `None` for characteristic types the model does not carry.
    pub fn into_relationship(self) -> Option<Relationship> {
        let characteristic_type = CharacteristicType::from_id(self.characteristic_type_id)?;
        Some(Relationship {
            id: Some(self.id),
            source_id: self.source_id,
            type_id: self.type_id,
            target: RelationshipValue::Concept(self.destination_id),
            group_id: self.relationship_group,
            characteristic_type,
            active: self.active,
        })
    }
}

impl Rf2Record for RelationshipRow {
    const EXPECTED_COLUMNS: &'static [&'static str] = RELATIONSHIP_COLUMNS;

    fn from_record(record: &StringRecord) -> Rf2Result<Self> {
        parse::effective_time(parse::field(record, 1))?;
        Ok(RelationshipRow {
            id: parse::sctid(parse::field(record, 0))?,
            active: parse::boolean(parse::field(record, 2))?,
            source_id: parse::sctid(parse::field(record, 4))?,
            destination_id: parse::sctid(parse::field(record, 5))?,
            relationship_group: parse::integer(parse::field(record, 6))?,
            type_id: parse::sctid(parse::field(record, 7))?,
            characteristic_type_id: parse::sctid(parse::field(record, 8))?,
        })
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
