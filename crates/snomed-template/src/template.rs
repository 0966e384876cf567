//! Logical templates and their JSON form.
//!
//! A template file looks like:
//!
//! ```json
//! {
//!   "name": "Fracture of bone structure",
//!   "focusConcepts": ["404684003 |Clinical finding|"],
//!   "ungrouped": [],
//!   "groups": [
//!     {
//!       "cardinality": "1..*",
//!       "attributes": [
//!         { "type": 363698007, "allowableRange": "<< 272673000", "cardinality": "1..1" },
//!         { "type": 116676008, "allowableRange": "<< 72704001", "cardinality": "1..1" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Ids may be numbers or strings; a string may carry a `|term|` after the id.
//! Cardinalities default to `1..1`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use snomed_types::{Cardinality, SctId};

use crate::error::{TemplateError, TemplateResult};

/// One attribute constraint of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute type; matched exactly.
    pub type_id: SctId,
    /// Fixed value, used when there is no allowable range.
    pub value: Option<SctId>,
    /// Allowable range ECL, e.g. `<< 123037004 |Body structure|`.
    pub allowable_range: Option<String>,
    /// How many relationships in a group may satisfy this attribute.
    pub cardinality: Cardinality,
}

impl Attribute {
    /// Attribute with an allowable range and cardinality `1..1`.
    pub fn with_range(type_id: SctId, allowable_range: impl Into<String>) -> Self {
        Self {
            type_id,
            value: None,
            allowable_range: Some(allowable_range.into()),
            cardinality: Cardinality::default(),
        }
    }

    /// Attribute with a fixed value and cardinality `1..1`.
    pub fn with_value(type_id: SctId, value: SctId) -> Self {
        Self {
            type_id,
            value: Some(value),
            allowable_range: None,
            cardinality: Cardinality::default(),
        }
    }

    /// Sets the cardinality.
    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} = ", self.cardinality, self.type_id)?;
        match (&self.allowable_range, self.value) {
            (Some(range), _) if range.contains(" OR ") => write!(f, "({})", range.trim()),
            (Some(range), _) => write!(f, "{}", range.trim()),
            (None, Some(value)) => write!(f, "{}", value),
            (None, None) => write!(f, "?"),
        }
    }
}

/// A set of attributes that must appear together in one role group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeGroup {
    /// How many relationship groups may satisfy this group.
    pub cardinality: Cardinality,
    /// Attribute constraints.
    pub attributes: Vec<Attribute>,
    grouped: bool,
}

impl AttributeGroup {
    /// A role group constraint.
    pub fn new(cardinality: Cardinality, attributes: Vec<Attribute>) -> Self {
        Self {
            cardinality,
            attributes,
            grouped: true,
        }
    }

    /// The template's ungrouped attributes, wrapped for uniform matching.
    pub fn ungrouped(attributes: Vec<Attribute>) -> Self {
        Self {
            cardinality: Cardinality::required(),
            attributes,
            grouped: false,
        }
    }

    /// False for the ungrouped wrapper.
    pub fn is_grouped(&self) -> bool {
        self.grouped
    }

    /// True if every attribute may be absent (vacuously true when empty).
    ///
    /// Group-level cardinality is not enforced for such groups.
    pub fn all_attributes_optional(&self) -> bool {
        self.attributes.iter().all(|a| a.cardinality.is_optional())
    }

    /// Attribute types in this group.
    pub fn types(&self) -> impl Iterator<Item = SctId> + '_ {
        self.attributes.iter().map(|a| a.type_id)
    }
}

impl std::fmt::Display for AttributeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = self
            .attributes
            .iter()
            .map(Attribute::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        if self.grouped {
            write!(f, "[{}] {{ {} }}", self.cardinality, body)
        } else {
            write!(f, "{}", body)
        }
    }
}

/// Focus concepts plus attribute constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogicalTemplate {
    /// Concepts the template refines.
    pub focus_concepts: Vec<SctId>,
    /// Attributes expected outside any role group.
    pub ungrouped_attributes: Vec<Attribute>,
    /// Role group constraints, in declaration order.
    pub attribute_groups: Vec<AttributeGroup>,
}

/// A loaded template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Single-letter id assigned in load order (`A`, `B`, ...).
    pub id: char,
    /// Display name.
    pub name: String,
    /// File the template was read from, empty for in-memory templates.
    pub source: PathBuf,
    logical: LogicalTemplate,
    groups: Vec<AttributeGroup>,
}

impl Template {
    /// Creates a template from its logical form.
    pub fn new(id: char, name: impl Into<String>, logical: LogicalTemplate) -> Self {
        let mut groups = Vec::with_capacity(logical.attribute_groups.len() + 1);
        groups.push(AttributeGroup::ungrouped(logical.ungrouped_attributes.clone()));
        groups.extend(logical.attribute_groups.iter().cloned().map(|mut g| {
            g.grouped = true;
            g
        }));

        Self {
            id,
            name: name.into(),
            source: PathBuf::new(),
            logical,
            groups,
        }
    }

    /// Parses a template from its JSON text.
    pub fn from_json(id: char, json: &str) -> TemplateResult<Self> {
        parse_template(id, json, Path::new("<inline>"))
    }

    /// The logical form.
    pub fn logical(&self) -> &LogicalTemplate {
        &self.logical
    }

    /// The ungrouped attributes as a group, followed by every declared group.
    ///
    /// Index `i` of this slice corresponds to working group `i` during
    /// remodeling.
    pub fn attribute_groups(&self) -> &[AttributeGroup] {
        &self.groups
    }

    /// Types declared as ungrouped attributes.
    pub fn ungrouped_types(&self) -> BTreeSet<SctId> {
        self.logical.ungrouped_attributes.iter().map(|a| a.type_id).collect()
    }

    /// Types declared inside any role group.
    pub fn grouped_types(&self) -> BTreeSet<SctId> {
        self.logical
            .attribute_groups
            .iter()
            .flat_map(AttributeGroup::types)
            .collect()
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.id, self.name)
    }
}

/// Reads a template file, assigning it `id`.
pub fn load_template<P: AsRef<Path>>(path: P, id: char) -> TemplateResult<Template> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| TemplateError::TemplateRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_template(id, &json, path)
}

fn parse_template(id: char, json: &str, path: &Path) -> TemplateResult<Template> {
    let raw: RawTemplate =
        serde_json::from_str(json).map_err(|source| TemplateError::TemplateParse {
            path: path.to_path_buf(),
            source,
        })?;

    let name = raw.name.clone().unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.to_string())
    });

    let invalid = |reason: String| TemplateError::InvalidTemplate {
        name: name.clone(),
        reason,
    };

    let logical = LogicalTemplate {
        focus_concepts: raw
            .focus_concepts
            .iter()
            .map(|id| id.resolve().map_err(&invalid))
            .collect::<TemplateResult<_>>()?,
        ungrouped_attributes: raw
            .ungrouped
            .iter()
            .map(|a| a.resolve().map_err(&invalid))
            .collect::<TemplateResult<_>>()?,
        attribute_groups: raw
            .groups
            .iter()
            .map(|g| g.resolve().map_err(&invalid))
            .collect::<TemplateResult<_>>()?,
    };

    let mut template = Template::new(id, name, logical);
    template.source = path.to_path_buf();
    Ok(template)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTemplate {
    name: Option<String>,
    #[serde(default)]
    focus_concepts: Vec<RawId>,
    #[serde(default)]
    ungrouped: Vec<RawAttribute>,
    #[serde(default)]
    groups: Vec<RawGroup>,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    cardinality: Option<String>,
    #[serde(default)]
    attributes: Vec<RawAttribute>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAttribute {
    #[serde(rename = "type")]
    type_id: RawId,
    value: Option<RawId>,
    allowable_range: Option<String>,
    cardinality: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(SctId),
    Text(String),
}

impl RawId {
    fn resolve(&self) -> Result<SctId, String> {
        match self {
            RawId::Number(id) => Ok(*id),
            RawId::Text(text) => {
                let token = text
                    .trim()
                    .split(|c: char| c == '|' || c.is_whitespace())
                    .next()
                    .unwrap_or("");
                token
                    .parse()
                    .map_err(|_| format!("'{}' is not a concept id", text))
            }
        }
    }
}

fn resolve_cardinality(cardinality: &Option<String>) -> Result<Cardinality, String> {
    match cardinality {
        Some(text) => Cardinality::parse(text).map_err(|e| e.to_string()),
        None => Ok(Cardinality::default()),
    }
}

impl RawAttribute {
    fn resolve(&self) -> Result<Attribute, String> {
        Ok(Attribute {
            type_id: self.type_id.resolve()?,
            value: self.value.as_ref().map(RawId::resolve).transpose()?,
            allowable_range: self.allowable_range.clone(),
            cardinality: resolve_cardinality(&self.cardinality)?,
        })
    }
}

impl RawGroup {
    fn resolve(&self) -> Result<AttributeGroup, String> {
        Ok(AttributeGroup::new(
            resolve_cardinality(&self.cardinality)?,
            self.attributes
                .iter()
                .map(RawAttribute::resolve)
                .collect::<Result<_, _>>()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snomed_types::well_known;

    const FRACTURE_TEMPLATE: &str = r#"{
        "name": "Fracture of bone structure",
        "focusConcepts": ["404684003 |Clinical finding|"],
        "ungrouped": [
            { "type": "246454002 |Occurrence|", "allowableRange": "<< 282032007", "cardinality": "0..1" }
        ],
        "groups": [
            {
                "cardinality": "~1..*",
                "attributes": [
                    { "type": 363698007, "allowableRange": "<< 272673000", "cardinality": "1..1" },
                    { "type": 116676008, "allowableRange": "<< 72704001" }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_template() {
        let template = Template::from_json('A', FRACTURE_TEMPLATE).unwrap();
        assert_eq!(template.id, 'A');
        assert_eq!(template.name, "Fracture of bone structure");
        assert_eq!(template.logical().focus_concepts, vec![well_known::CLINICAL_FINDING]);

        let groups = template.attribute_groups();
        assert_eq!(groups.len(), 2);
        assert!(!groups[0].is_grouped());
        assert!(groups[0].all_attributes_optional());
        assert_eq!(groups[1].cardinality, Cardinality::one_or_more());
        assert_eq!(groups[1].attributes[1].cardinality, Cardinality::required());
    }

    #[test]
    fn test_type_sets() {
        let template = Template::from_json('A', FRACTURE_TEMPLATE).unwrap();
        assert_eq!(template.ungrouped_types(), BTreeSet::from([well_known::OCCURRENCE]));
        assert_eq!(
            template.grouped_types(),
            BTreeSet::from([well_known::FINDING_SITE, well_known::ASSOCIATED_MORPHOLOGY])
        );
    }

    #[test]
    fn test_bad_cardinality_is_rejected() {
        let json = r#"{ "groups": [ { "cardinality": "2..1", "attributes": [] } ] }"#;
        assert!(matches!(
            Template::from_json('A', json),
            Err(TemplateError::InvalidTemplate { .. })
        ));
    }

    #[test]
    fn test_bad_json_is_a_parse_error() {
        assert!(matches!(
            Template::from_json('A', "{ not json"),
            Err(TemplateError::TemplateParse { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        assert!(matches!(
            load_template("/no/such/template.json", 'A'),
            Err(TemplateError::TemplateRead { .. })
        ));
    }

    #[test]
    fn test_group_display() {
        let group = AttributeGroup::new(
            Cardinality::one_or_more(),
            vec![
                Attribute::with_range(well_known::FINDING_SITE, "<< 123037004 OR << 49755003"),
                Attribute::with_value(well_known::ASSOCIATED_MORPHOLOGY, 72704001)
                    .cardinality(Cardinality::optional()),
            ],
        );
        assert_eq!(
            group.to_string(),
            "[1..*] { [1..1] 363698007 = (<< 123037004 OR << 49755003), [0..1] 116676008 = 72704001 }"
        );
    }
}
