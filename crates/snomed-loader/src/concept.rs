//! Concept file reader (`sct2_Concept_Snapshot_*.txt`).
//!
//! Rows become bare [`Concept`]s; descriptions and relationships are attached
//! by the store afterwards.

use csv::StringRecord;
use snomed_types::{Concept, DefinitionStatus};

use crate::parser::{parse, Rf2Record};
use crate::types::{Rf2Error, Rf2Result};

const CONCEPT_COLUMNS: &[&str] = &[
    "id",
    "effectiveTime",
    "active",
    "moduleId",
    "definitionStatusId",
];

impl Rf2Record for Concept {
    const EXPECTED_COLUMNS: &'static [&'static str] = CONCEPT_COLUMNS;

    fn from_record(record: &StringRecord) -> Rf2Result<Self> {
        let id = parse::sctid(parse::field(record, 0))?;
        parse::effective_time(parse::field(record, 1))?;
        let active = parse::boolean(parse::field(record, 2))?;
        let status_id = parse::sctid(parse::field(record, 4))?;
        let definition_status =
            DefinitionStatus::from_id(status_id).ok_or(Rf2Error::UnknownCode {
                field: "definitionStatusId",
                value: status_id,
            })?;

        let mut concept = Concept::new(id);
        concept.active = active;
        concept.definition_status = definition_status;
        Ok(concept)
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn test_parse_concept_record() {
        let record = make_record(&[
            "404684003",
            "20020131",
            "1",
            "900000000000207008",
            "900000000000073002",
        ]);

        let concept = Concept::from_record(&record).unwrap();
        assert_eq!(concept.id, 404684003);
        assert!(concept.active);
        assert_eq!(concept.definition_status, DefinitionStatus::FullyDefined);
        assert!(concept.stated_relationships.is_empty());
    }

    #[test]
    fn test_unknown_definition_status() {
        let record = make_record(&["404684003", "20020131", "1", "900000000000207008", "12345"]);

        assert!(matches!(
            Concept::from_record(&record),
            Err(Rf2Error::UnknownCode {
                field: "definitionStatusId",
                value: 12345
            })
        ));
    }
}
