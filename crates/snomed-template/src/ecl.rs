//! The small slice of ECL the engine evaluates itself.
//!
//! Allowable ranges are disjunctions of `<< X`, `< X` and `*`. Anything
//! else (`>>`, refinements, bare ids, `MINUS`, ...) is rejected with
//! [`TemplateError::UnsupportedEcl`] rather than treated as a non-match.

use std::collections::BTreeSet;

use snomed_types::{well_known, RelationshipValue, SctId};

use crate::cache::DescendantsCache;
use crate::error::{TemplateError, TemplateResult};
use crate::template::{Attribute, AttributeGroup, LogicalTemplate};

/// One alternative of an allowable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeConstraint {
    /// `<< X`: X or any descendant.
    DescendantOrSelf(SctId),
    /// `< X`: any descendant of X.
    Descendant(SctId),
    /// `*`: anything.
    Any,
}

/// Parses `alt1 OR alt2 OR ...`.
pub fn parse_range(ecl: &str) -> TemplateResult<Vec<RangeConstraint>> {
    ecl.split(" OR ").map(parse_alternative).collect()
}

fn parse_alternative(alternative: &str) -> TemplateResult<RangeConstraint> {
    let alternative = alternative.trim();
    let unsupported = || TemplateError::UnsupportedEcl(alternative.to_string());

    if alternative == "*" {
        return Ok(RangeConstraint::Any);
    }
    if let Some(rest) = alternative.strip_prefix("<<") {
        return focus_id(rest)
            .map(RangeConstraint::DescendantOrSelf)
            .ok_or_else(unsupported);
    }
    if let Some(rest) = alternative.strip_prefix('<') {
        return focus_id(rest)
            .map(RangeConstraint::Descendant)
            .ok_or_else(unsupported);
    }
    Err(unsupported())
}

/// Reads `123037004` or `123037004 |Body structure|`; nothing else may follow.
fn focus_id(text: &str) -> Option<SctId> {
    let text = text.trim();
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, rest) = text.split_at(end);
    let rest = rest.trim();

    let term_only = rest.is_empty()
        || (rest.len() >= 2
            && rest.starts_with('|')
            && rest.ends_with('|')
            && rest.matches('|').count() == 2);
    if digits.is_empty() || !term_only {
        return None;
    }
    digits.parse().ok()
}

/// True if `target` lies within the allowable range.
///
/// The whole expression is parsed before any alternative is tested, so
/// unsupported syntax always surfaces. Concrete values only match `*`.
pub fn matches_range(
    target: &RelationshipValue,
    ecl: &str,
    cache: &DescendantsCache<'_>,
) -> TemplateResult<bool> {
    for constraint in parse_range(ecl)? {
        let matched = match (constraint, target) {
            (RangeConstraint::Any, _) => true,
            (_, RelationshipValue::Concrete(_)) => false,
            (RangeConstraint::DescendantOrSelf(focus), RelationshipValue::Concept(id)) => {
                cache.descendants_or_self(focus)?.contains(id)
            }
            (RangeConstraint::Descendant(focus), RelationshipValue::Concept(id)) => {
                cache.descendants(focus)?.contains(id)
            }
        };
        if matched {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Resolves an expression to the concepts it selects.
pub fn evaluate(ecl: &str, cache: &DescendantsCache<'_>) -> TemplateResult<BTreeSet<SctId>> {
    let mut selected = BTreeSet::new();
    for constraint in parse_range(ecl)? {
        match constraint {
            RangeConstraint::Any => selected.extend(cache.graph().concept_ids()),
            RangeConstraint::DescendantOrSelf(focus) => {
                selected.extend(cache.descendants_or_self(focus)?.iter().copied())
            }
            RangeConstraint::Descendant(focus) => {
                selected.extend(cache.descendants(focus)?.iter().copied())
            }
        }
    }
    Ok(selected)
}

/// Renders a template as an ECL-style expression for reports.
///
/// With `restrictive`, each group also asserts that no other attribute type
/// is present: `[0..0] (<< 410662002 MINUS (t1 OR t2)) = *`.
pub fn convert_to_ecl(template: &LogicalTemplate, restrictive: bool) -> String {
    let focus = if template.focus_concepts.is_empty() {
        "*".to_string()
    } else {
        template
            .focus_concepts
            .iter()
            .map(|id| format!("<< {}", id))
            .collect::<Vec<_>>()
            .join(" OR ")
    };

    let mut refinements: Vec<String> = template
        .ungrouped_attributes
        .iter()
        .map(Attribute::to_string)
        .collect();

    for group in &template.attribute_groups {
        refinements.push(group_to_ecl(group, restrictive));
    }

    if refinements.is_empty() {
        focus
    } else {
        format!("{} : {}", focus, refinements.join(", "))
    }
}

fn group_to_ecl(group: &AttributeGroup, restrictive: bool) -> String {
    let mut parts: Vec<String> = group.attributes.iter().map(Attribute::to_string).collect();
    if restrictive && !group.attributes.is_empty() {
        let types = group
            .types()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" OR ");
        parts.push(format!(
            "[0..0] (<< {} MINUS ({})) = *",
            well_known::CONCEPT_MODEL_ATTRIBUTE,
            types
        ));
    }
    format!("[{}] {{ {} }}", group.cardinality, parts.join(", "))
}
