//! Description file reader (`sct2_Description_Snapshot-*.txt`).

use csv::StringRecord;
use snomed_types::{DescriptionType, SctId};

use crate::parser::{parse, Rf2Record};
use crate::types::{DescriptionConfig, Rf2Result};

const DESCRIPTION_COLUMNS: &[&str] = &[
    "id",
    "effectiveTime",
    "active",
    "moduleId",
    "conceptId",
    "languageCode",
    "typeId",
    "term",
    "caseSignificanceId",
];

/// The columns of a description row that naming a concept needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionRow {
    /// Description SCTID.
    pub id: SctId,
    /// Whether the description is active.
    pub active: bool,
    /// Concept the description belongs to.
    pub concept_id: SctId,
    /// Language code (e.g. `en`).
    pub language_code: String,
    /// Description type id (FSN, synonym, definition).
    pub type_id: SctId,
    /// The term text.
    pub term: String,
}

impl DescriptionRow {
    /// Parsed description type, if it is an FSN or synonym.
    pub fn description_type(&self) -> Option<DescriptionType> {
        DescriptionType::from_id(self.type_id)
    }

    /// Returns true if the row passes language, type and activity filters.
    pub fn passes_description_filter(&self, config: &DescriptionConfig) -> bool {
        self.passes_filter(&config.base)
            && (config.language_codes.is_empty()
                || config.language_codes.contains(&self.language_code))
            && (config.type_ids.is_empty() || config.type_ids.contains(&self.type_id))
    }
}

impl Rf2Record for DescriptionRow {
    const EXPECTED_COLUMNS: &'static [&'static str] = DESCRIPTION_COLUMNS;

    fn from_record(record: &StringRecord) -> Rf2Result<Self> {
        parse::effective_time(parse::field(record, 1))?;
        Ok(DescriptionRow {
            id: parse::sctid(parse::field(record, 0))?,
            active: parse::boolean(parse::field(record, 2))?,
            concept_id: parse::sctid(parse::field(record, 4))?,
            language_code: parse::field(record, 5).to_string(),
            type_id: parse::sctid(parse::field(record, 6))?,
            term: parse::field(record, 7).to_string(),
        })
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
