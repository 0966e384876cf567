//! Template matching.
//!
//! Each relationship group of a concept (group 0 included when it carries
//! attributes) is paired with the first template group it satisfies. There
//! is no backtracking: a relationship group that could satisfy two template
//! groups is always assigned to the earlier one, even when a different
//! assignment would let the concept match.
//!
//! Pairing is narrower than trying every relationship group against every
//! template group: group 0 is only tested against the template's ungrouped
//! attributes, and role groups only against declared groups. Ungrouped
//! relationships never count toward a declared group's cardinality, even
//! when they cover every attribute it names.

use std::collections::BTreeMap;

use snomed_types::{CharacteristicType, Concept, Relationship, RelationshipGroup};
use tracing::trace;

use crate::cache::DescendantsCache;
use crate::ecl;
use crate::error::{TemplateError, TemplateResult};
use crate::template::{Attribute, AttributeGroup, Template};

/// Outcome of matching one concept against one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMatch {
    /// Template that was tested.
    pub template_id: char,
    /// True if every group matched and every cardinality held.
    pub matched: bool,
    /// Cardinality diagnostics, `"<id> <found> found != <required> required. <group>"`.
    pub issues: Vec<String>,
    /// Relationship groups that matched no template group.
    pub unmatched_groups: Vec<u16>,
}

impl TemplateMatch {
    /// Returns true if the concept matched.
    pub fn is_match(&self) -> bool {
        self.matched
    }
}

/// Tests one form of a concept against a template.
///
/// With `allow_additional_ungrouped`, ungrouped relationships that satisfy no
/// ungrouped template attribute are tolerated instead of failing group 0.
pub fn matches_template(
    concept: &Concept,
    template: &Template,
    cache: &DescendantsCache<'_>,
    char_type: CharacteristicType,
    allow_additional_ungrouped: bool,
) -> TemplateResult<TemplateMatch> {
    let template_groups = template.attribute_groups();
    let rel_groups: Vec<RelationshipGroup> = concept
        .relationship_groups(char_type)
        .into_iter()
        .filter(|g| g.is_grouped() || g.attributes().next().is_some())
        .collect();

    let mut rel_to_template: BTreeMap<u16, Vec<usize>> = BTreeMap::new();
    let mut template_to_rel: BTreeMap<usize, Vec<u16>> = BTreeMap::new();

    for rel_group in &rel_groups {
        let allow_extra = allow_additional_ungrouped && !rel_group.is_grouped();
        for (index, template_group) in template_groups.iter().enumerate() {
            // Ungrouped pairs with ungrouped, role group with role group.
            if template_group.is_grouped() != rel_group.is_grouped() {
                continue;
            }
            if group_matches(rel_group, template_group, cache, allow_extra)? {
                rel_to_template
                    .entry(rel_group.group_id())
                    .or_default()
                    .push(index);
                template_to_rel
                    .entry(index)
                    .or_default()
                    .push(rel_group.group_id());
                break;
            }
        }
    }

    let outcome = validate_cardinality(
        template,
        &rel_groups,
        &rel_to_template,
        &template_to_rel,
    );
    trace!(
        concept_id = concept.id,
        template = %template.id,
        %char_type,
        matched = outcome.matched,
        "matched template"
    );
    Ok(outcome)
}

fn validate_cardinality(
    template: &Template,
    rel_groups: &[RelationshipGroup],
    rel_to_template: &BTreeMap<u16, Vec<usize>>,
    template_to_rel: &BTreeMap<usize, Vec<u16>>,
) -> TemplateMatch {
    let unmatched_groups: Vec<u16> = rel_groups
        .iter()
        .map(RelationshipGroup::group_id)
        .filter(|id| !rel_to_template.contains_key(id))
        .collect();

    let mut issues = Vec::new();
    for (index, template_group) in template.attribute_groups().iter().enumerate() {
        if template_group.all_attributes_optional() {
            continue;
        }
        let found = template_to_rel.get(&index).map_or(0, Vec::len);
        if !template_group.cardinality.satisfies(found) {
            issues.push(format!(
                "{} {} found != {} required. {}",
                template.id, found, template_group.cardinality, template_group
            ));
        }
    }

    TemplateMatch {
        template_id: template.id,
        matched: unmatched_groups.is_empty() && issues.is_empty(),
        issues,
        unmatched_groups,
    }
}

/// True if the relationship group satisfies the template group.
///
/// Every non-IS_A relationship must match some attribute, and each attribute
/// must be matched a number of times its cardinality allows.
pub fn matches_template_group(
    rel_group: &RelationshipGroup,
    template_group: &AttributeGroup,
    cache: &DescendantsCache<'_>,
) -> TemplateResult<bool> {
    group_matches(rel_group, template_group, cache, false)
}

fn group_matches(
    rel_group: &RelationshipGroup,
    template_group: &AttributeGroup,
    cache: &DescendantsCache<'_>,
    allow_extra: bool,
) -> TemplateResult<bool> {
    let relationships: Vec<&Relationship> = rel_group.attributes().collect();

    if !allow_extra {
        for rel in &relationships {
            if !matches_any_attribute(rel, &template_group.attributes, cache)? {
                return Ok(false);
            }
        }
    }

    for attribute in &template_group.attributes {
        let mut count = 0;
        for rel in &relationships {
            if matches_attribute(rel, attribute, cache)? {
                count += 1;
            }
        }
        if !attribute.cardinality.satisfies(count) {
            return Ok(false);
        }
    }

    Ok(true)
}

fn matches_any_attribute(
    rel: &Relationship,
    attributes: &[Attribute],
    cache: &DescendantsCache<'_>,
) -> TemplateResult<bool> {
    for attribute in attributes {
        if matches_attribute(rel, attribute, cache)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// True if the relationship satisfies one attribute constraint.
///
/// Types must be identical. The value is tested against the allowable range
/// if there is one, otherwise it must equal the fixed value. An attribute
/// with neither is an [`TemplateError::IllegalAttribute`].
pub fn matches_attribute(
    rel: &Relationship,
    attribute: &Attribute,
    cache: &DescendantsCache<'_>,
) -> TemplateResult<bool> {
    if rel.type_id != attribute.type_id {
        return Ok(false);
    }
    match (&attribute.allowable_range, attribute.value) {
        (Some(range), _) => ecl::matches_range(&rel.target, range, cache),
        (None, Some(value)) => Ok(rel.destination_id() == Some(value)),
        (None, None) => Err(TemplateError::IllegalAttribute {
            type_id: attribute.type_id,
        }),
    }
}

/// True if any relationship in the group satisfies the attribute.
pub fn contains_matching_relationship(
    group: &RelationshipGroup,
    attribute: &Attribute,
    cache: &DescendantsCache<'_>,
) -> TemplateResult<bool> {
    for rel in group.attributes() {
        if matches_attribute(rel, attribute, cache)? {
            return Ok(true);
        }
    }
    Ok(false)
}
