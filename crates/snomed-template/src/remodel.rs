//! Relationship-group remodeling.
//!
//! [`GroupRemodel::remodel_concept`] reshapes a concept's stated role groups
//! to line up with a template, using the inferred form as the source of
//! truth for which values belong together. All edits happen on a
//! [`WorkingGroups`] copy; the live concept is never touched and the result
//! is a new [`Concept`] value.
//!
//! The steps, in order:
//!
//! 1. seed working groups from the stated form;
//! 2. strip template-grouped types from group 0;
//! 3. drop repeated attribute types within a group;
//! 4. satisfy each template attribute from the inferred form;
//! 5. move template-ungrouped types back to group 0;
//! 6. dissolve groups left with a single relationship;
//! 7. commit, or fail if the stated expression did not change.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use snomed_types::{
    well_known, CharacteristicType, Concept, Relationship, RelationshipGroup, RelationshipValue,
    SctId, TypeValue,
};
use tracing::{debug, info};

use crate::error::{TemplateError, TemplateResult};
use crate::fix::TemplateFix;
use crate::matcher::{matches_attribute, matches_template};
use crate::report::{ReportActionType, ReportSink, Severity};
use crate::template::{Attribute, Template};

const MIN_WORKING_GROUPS: usize = 3;

/// Result of remodeling one concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemodelOutcome {
    /// The stated form was reshaped.
    Committed {
        /// The remodelled concept; commit it to the store to apply.
        concept: Concept,
        /// Relationships added or moved while satisfying the template.
        changes_made: usize,
    },
    /// Nothing needed doing.
    NoChange,
}

/// Working copy of a concept's stated role groups.
///
/// Index `i` holds group `i`; index 0 is the ungrouped set. Indexes below
/// the template's group count are the targets of the matching template
/// groups and never serve as additional groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingGroups {
    groups: Vec<RelationshipGroup>,
    original_ungrouped: RelationshipGroup,
    template_slots: usize,
    additional_group: Option<usize>,
}

impl WorkingGroups {
    /// Seeds from the stated form, with room for at least every template
    /// group and never fewer than three groups.
    pub fn seed(concept: &Concept, template: &Template) -> Self {
        let stated = concept.relationship_groups(CharacteristicType::Stated);
        let max_group = stated
            .iter()
            .map(|g| usize::from(g.group_id()))
            .max()
            .unwrap_or(0);
        let template_slots = template.attribute_groups().len();
        let size = (max_group + 1).max(template_slots).max(MIN_WORKING_GROUPS);

        let mut groups: Vec<RelationshipGroup> =
            (0..size).map(|i| RelationshipGroup::new(i as u16)).collect();
        for group in stated {
            let index = usize::from(group.group_id());
            groups[index] = group;
        }

        Self {
            original_ungrouped: groups[0].clone(),
            groups,
            template_slots,
            additional_group: None,
        }
    }

    /// Current groups, including empty ones.
    pub fn groups(&self) -> &[RelationshipGroup] {
        &self.groups
    }

    /// One working group.
    pub fn group(&self, index: usize) -> Option<&RelationshipGroup> {
        self.groups.get(index)
    }

    /// Group opened for a second value during this pass, if any.
    pub fn additional_group(&self) -> Option<usize> {
        self.additional_group
    }

    fn ensure(&mut self, index: usize) {
        while self.groups.len() <= index {
            let next = self.groups.len() as u16;
            self.groups.push(RelationshipGroup::new(next));
        }
    }

    /// Index of a group already stating this type/value, grouped or not.
    fn stated_in(&self, type_value: &TypeValue, grouped: bool) -> Option<usize> {
        self.groups
            .iter()
            .enumerate()
            .filter(|(_, g)| g.is_grouped() == grouped)
            .find(|(_, g)| g.contains_type_value(type_value))
            .map(|(index, _)| index)
    }

    /// First empty group past the template's own groups, appending one if
    /// none is free.
    fn open_group(&mut self) -> usize {
        let free = self
            .groups
            .iter()
            .enumerate()
            .skip(self.template_slots.max(1))
            .find(|(_, g)| g.is_empty())
            .map(|(index, _)| index);
        match free {
            Some(index) => index,
            None => {
                let index = self.groups.len();
                self.ensure(index);
                index
            }
        }
    }
}

/// Remodels concepts against the templates of a [`TemplateFix`] run.
pub struct GroupRemodel<'g> {
    fix: TemplateFix<'g>,
    form_new_group_around: BTreeSet<SctId>,
    allow_multiple_same_type: BTreeSet<SctId>,
}

impl<'g> GroupRemodel<'g> {
    /// Wraps a run. A second value of finding site, causative agent or
    /// associated morphology may open a new group; no type may repeat
    /// within a group.
    pub fn new(fix: TemplateFix<'g>) -> Self {
        Self {
            fix,
            form_new_group_around: BTreeSet::from([
                well_known::FINDING_SITE,
                well_known::CAUSATIVE_AGENT,
                well_known::ASSOCIATED_MORPHOLOGY,
            ]),
            allow_multiple_same_type: BTreeSet::new(),
        }
    }

    /// Replaces the attribute types allowed to open an additional group.
    pub fn with_form_new_group_around(mut self, types: impl IntoIterator<Item = SctId>) -> Self {
        self.form_new_group_around = types.into_iter().collect();
        self
    }

    /// Attribute types that may appear more than once in a group.
    pub fn with_allow_multiple_same_type(mut self, types: impl IntoIterator<Item = SctId>) -> Self {
        self.allow_multiple_same_type = types.into_iter().collect();
        self
    }

    /// The underlying run.
    pub fn fix(&self) -> &TemplateFix<'g> {
        &self.fix
    }

    /// The underlying run, mutably (to add templates).
    pub fn fix_mut(&mut self) -> &mut TemplateFix<'g> {
        &mut self.fix
    }

    /// See [`TemplateFix::init`].
    pub fn init(&self) -> TemplateResult<()> {
        self.fix.init()
    }

    /// See [`TemplateFix::post_init`].
    pub fn post_init(&mut self) -> TemplateResult<()> {
        self.fix.post_init()
    }

    /// Reshapes the stated form of `concept` to fit `template`.
    ///
    /// Each added, moved or removed stated relationship is reported to
    /// `sink` once the result is known to differ from the original.
    pub fn remodel_concept(
        &self,
        concept: &Concept,
        template: &Template,
        sink: &mut dyn ReportSink,
    ) -> TemplateResult<RemodelOutcome> {
        let mut working = WorkingGroups::seed(concept, template);

        let mut restructured = remove_grouped_types(&mut working, template);
        restructured += self.remove_multiples(&mut working);

        let mut changes_made = 0;
        for (index, template_group) in template.attribute_groups().iter().enumerate() {
            let mandatory = !template_group.cardinality.is_optional();
            for attribute in &template_group.attributes {
                changes_made +=
                    self.find_attribute_to_state(concept, attribute, index, mandatory, &mut working)?;
            }
        }

        restructured += move_ungrouped_types(&mut working, template);
        restructured += collapse_lonely_groups(&mut working);

        debug!(
            concept_id = concept.id,
            template = %template.id,
            changes_made,
            restructured,
            "Remodel pass complete"
        );

        if changes_made == 0 && restructured == 0 {
            return Ok(RemodelOutcome::NoChange);
        }

        let remodelled = commit(concept, working);
        let before = concept.to_expression(CharacteristicType::Stated);
        let after = remodelled.to_expression(CharacteristicType::Stated);
        if before == after {
            return Err(TemplateError::validation(
                concept.id,
                "Stated modelling unchanged",
            ));
        }

        report_changes(concept, &remodelled, sink);
        info!(concept_id = concept.id, template = %template.id, %after, "Remodelled");
        Ok(RemodelOutcome::Committed {
            concept: remodelled,
            changes_made,
        })
    }

    /// States one template attribute in working group `target`, drawing
    /// values from the inferred form. Returns the number of relationships
    /// added or promoted.
    ///
    /// A fixed value in a mandatory group is added unless the group already
    /// holds that value or a more specific one. Otherwise inferred values
    /// within range are gathered and reduced to the most specific ones:
    /// one is stated directly, two are split across groups, three or more
    /// fail validation.
    pub fn find_attribute_to_state(
        &self,
        concept: &Concept,
        attribute: &Attribute,
        target: usize,
        mandatory: bool,
        working: &mut WorkingGroups,
    ) -> TemplateResult<usize> {
        working.ensure(target);

        if let (Some(value), true) = (attribute.value, mandatory) {
            return self.state_fixed_value(concept, attribute.type_id, value, target, working);
        }

        let cache = self.fix.cache();
        let mut values: Vec<RelationshipValue> = Vec::new();
        for rel in concept.active_relationships(CharacteristicType::Inferred) {
            if !values.contains(&rel.target) && matches_attribute(rel, attribute, cache)? {
                values.push(rel.target.clone());
            }
        }
        let values = self.remove_redundancies(values)?;

        match values.len() {
            0 => Ok(0),
            1 => {
                let type_value = TypeValue {
                    type_id: attribute.type_id,
                    value: values[0].clone(),
                };
                if working.stated_in(&type_value, target != 0).is_some() {
                    return Ok(0);
                }
                let index = if target == 0 {
                    target
                } else {
                    self.affinity(concept, &type_value, working)?.unwrap_or(target)
                };
                Ok(usize::from(self.state_value(concept, type_value, index, working)?))
            }
            2 => self.consider_additional_grouping(
                concept,
                attribute.type_id,
                values,
                target,
                working,
            ),
            n => {
                let listed = values
                    .iter()
                    .map(|v| format!("{} |{}|", v, self.display_name(v)))
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(TemplateError::validation(
                    concept.id,
                    format!(
                        "Unable to state {}: {} candidate values {}",
                        attribute.type_id, n, listed
                    ),
                ))
            }
        }
    }

    fn state_fixed_value(
        &self,
        concept: &Concept,
        type_id: SctId,
        value: SctId,
        target: usize,
        working: &mut WorkingGroups,
    ) -> TemplateResult<usize> {
        let cache = self.fix.cache();
        for existing in working.groups[target].relationships_of_type(type_id) {
            if let Some(existing) = existing.destination_id() {
                if cache.is_descendant_or_self(existing, value)? {
                    return Ok(0);
                }
            }
        }
        let stated = self.state_value(concept, TypeValue::new(type_id, value), target, working)?;
        Ok(usize::from(stated))
    }

    /// Keeps only values not subsumed by another candidate.
    fn remove_redundancies(
        &self,
        values: Vec<RelationshipValue>,
    ) -> TemplateResult<Vec<RelationshipValue>> {
        let cache = self.fix.cache();
        let mut kept = Vec::with_capacity(values.len());
        for candidate in &values {
            let redundant = match candidate {
                RelationshipValue::Concept(id) => {
                    let descendants = cache.descendants(*id)?;
                    values
                        .iter()
                        .filter_map(RelationshipValue::concept_id)
                        .any(|other| descendants.contains(&other))
                }
                RelationshipValue::Concrete(_) => false,
            };
            if !redundant {
                kept.push(candidate.clone());
            }
        }
        Ok(kept)
    }

    /// Adds `type_value` to group `index`, promoting the original ungrouped
    /// relationship (and its id) if there is one, and drops less specific
    /// values of the same type from that group.
    fn state_value(
        &self,
        concept: &Concept,
        type_value: TypeValue,
        index: usize,
        working: &mut WorkingGroups,
    ) -> TemplateResult<bool> {
        if working.groups[index].contains_type_value(&type_value) {
            return Ok(false);
        }

        let group_id = index as u16;
        let rel = match working
            .original_ungrouped
            .relationships()
            .iter()
            .find(|r| r.matches_type_value(&type_value))
        {
            Some(original) => original.clone_into_group(group_id),
            None => Relationship::from_type_value(
                concept.id,
                &type_value,
                group_id,
                CharacteristicType::Stated,
            ),
        };
        if index != 0 {
            working.groups[0].remove_type_value(&type_value);
        }

        if let RelationshipValue::Concept(value) = type_value.value {
            let cache = self.fix.cache();
            let mut less_specific = Vec::new();
            for sibling in working.groups[index].relationships_of_type(type_value.type_id) {
                if let Some(sibling_value) = sibling.destination_id() {
                    if cache.descendants(sibling_value)?.contains(&value) {
                        less_specific.push(sibling.type_value());
                    }
                }
            }
            for redundant in &less_specific {
                working.groups[index].remove_type_value(redundant);
            }
        }

        Ok(working.groups[index].add(rel))
    }

    /// Places two values of one attribute type.
    ///
    /// Values already stated are left alone. The rest are ranked: values
    /// inferred alongside something already in a working group go to that
    /// group, the others follow in display-name order. The first unplaced
    /// value fills `target`; a second goes to the additional group.
    fn consider_additional_grouping(
        &self,
        concept: &Concept,
        type_id: SctId,
        values: Vec<RelationshipValue>,
        target: usize,
        working: &mut WorkingGroups,
    ) -> TemplateResult<usize> {
        let mut ranked = Vec::with_capacity(values.len());
        for value in values {
            let type_value = TypeValue { type_id, value };
            if working.stated_in(&type_value, target != 0).is_some() {
                continue;
            }
            let affinity = if target == 0 {
                None
            } else {
                self.affinity(concept, &type_value, working)?
            };
            let name = self.display_name(&type_value.value);
            ranked.push((affinity, name, type_value));
        }
        ranked.sort_by(|a, b| by_affinity_then_name((a.0, a.1.as_str()), (b.0, b.1.as_str())));

        let mut changes = 0;
        for (affinity, _, type_value) in ranked {
            let index = match affinity {
                Some(index) => index,
                None if target == 0 || !working.groups[target].contains_type(type_id) => target,
                None => self.additional_group_for(concept, &type_value, target, working)?,
            };
            if self.state_value(concept, type_value, index, working)? {
                changes += 1;
            }
        }
        Ok(changes)
    }

    fn additional_group_for(
        &self,
        concept: &Concept,
        type_value: &TypeValue,
        target: usize,
        working: &mut WorkingGroups,
    ) -> TemplateResult<usize> {
        if let Some(index) = working.additional_group {
            if !working.groups[index].contains_type(type_value.type_id) {
                return Ok(index);
            }
        }
        if self.form_new_group_around.contains(&type_value.type_id) {
            let index = working.open_group();
            working.additional_group = Some(index);
            return Ok(index);
        }
        Err(TemplateError::validation(
            concept.id,
            format!(
                "No group available for {} |{}| alongside group {}",
                type_value,
                self.display_name(&type_value.value),
                target
            ),
        ))
    }

    /// The working group holding a relationship inferred in the same group
    /// as `type_value`. Two such groups is a validation failure.
    fn affinity(
        &self,
        concept: &Concept,
        type_value: &TypeValue,
        working: &WorkingGroups,
    ) -> TemplateResult<Option<usize>> {
        let mut found = BTreeSet::new();
        for inferred in concept
            .relationship_groups(CharacteristicType::Inferred)
            .iter()
            .filter(|g| g.is_grouped() && g.contains_type_value(type_value))
        {
            for partner in inferred
                .attributes()
                .filter(|r| !r.matches_type_value(type_value))
            {
                let partner = partner.type_value();
                found.extend(
                    working
                        .groups
                        .iter()
                        .enumerate()
                        .skip(1)
                        .filter(|(_, g)| g.contains_type_value(&partner))
                        .map(|(index, _)| index),
                );
            }
        }

        let mut found = found.into_iter();
        let first = found.next();
        match (first, found.next()) {
            (Some(a), Some(b)) => Err(TemplateError::validation(
                concept.id,
                format!(
                    "{} is grouped with relationships in both group {} and group {}",
                    type_value, a, b
                ),
            )),
            (first, _) => Ok(first),
        }
    }

    fn display_name(&self, value: &RelationshipValue) -> String {
        match value {
            RelationshipValue::Concept(id) => self
                .fix
                .graph()
                .concept(*id)
                .map(Concept::display_name)
                .unwrap_or_else(|| id.to_string()),
            RelationshipValue::Concrete(literal) => literal.clone(),
        }
    }

    fn remove_multiples(&self, working: &mut WorkingGroups) -> usize {
        let mut removed = 0;
        for group in &mut working.groups {
            let mut seen = BTreeSet::new();
            let before = group.len();
            group.retain(|r| {
                r.is_is_a() || self.allow_multiple_same_type.contains(&r.type_id) || seen.insert(r.type_id)
            });
            removed += before - group.len();
        }
        removed
    }

    /// Processes every concept in the subhierarchy, reporting each one.
    ///
    /// Validation failures are reported and the concept skipped; any other
    /// error ends the run.
    pub fn run_batch(&self, sink: &mut dyn ReportSink) -> TemplateResult<BatchSummary> {
        let matches = self.fix.find_all_template_matches()?;
        let cache = self.fix.cache();
        let mut summary = BatchSummary::default();

        for &id in self.fix.subhierarchy() {
            let concept = self
                .fix
                .graph()
                .concept(id)
                .ok_or(TemplateError::UnknownConcept(id))?;
            if !concept.active {
                continue;
            }

            if self.fix.is_excluded(concept) {
                sink.report(concept, Severity::Low, ReportActionType::Excluded, "");
                summary.excluded += 1;
                continue;
            }

            let Some(template) = matches.get(&id).and_then(|t| self.fix.template(*t)) else {
                let issues = self.fix.issues_for(id);
                let details = if issues.is_empty() {
                    "No template matched".to_string()
                } else {
                    issues.join("; ")
                };
                sink.report(concept, Severity::Medium, ReportActionType::Misaligned, &details);
                summary.misaligned += 1;
                continue;
            };

            let stated = matches_template(concept, template, cache, CharacteristicType::Stated, false)
                .map_err(|e| e.in_context(id, template.id))?;
            if stated.matched {
                sink.report(
                    concept,
                    Severity::None,
                    ReportActionType::Aligned,
                    &template.to_string(),
                );
                summary.aligned += 1;
                continue;
            }

            match self
                .remodel_concept(concept, template, sink)
                .map_err(|e| e.in_context(id, template.id))
            {
                Ok(RemodelOutcome::Committed {
                    concept: remodelled,
                    changes_made,
                }) => {
                    let details = format!(
                        "{}: {} changes. {}",
                        template,
                        changes_made,
                        remodelled.to_expression(CharacteristicType::Stated)
                    );
                    sink.report(concept, Severity::Low, ReportActionType::Remodelled, &details);
                    summary.remodelled.push(remodelled);
                }
                Ok(RemodelOutcome::NoChange) => {
                    let details = format!("{}: stated form does not match, nothing to change", template);
                    sink.report(concept, Severity::Medium, ReportActionType::Misaligned, &details);
                    summary.misaligned += 1;
                }
                Err(e) if e.is_validation_failure() => {
                    sink.report(
                        concept,
                        Severity::High,
                        ReportActionType::ValidationError,
                        &e.to_string(),
                    );
                    summary.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        for (label, count) in self.fix.summary() {
            info!(count, "{}", label);
        }
        info!(
            aligned = summary.aligned,
            remodelled = summary.remodelled.len(),
            misaligned = summary.misaligned,
            excluded = summary.excluded,
            failed = summary.failed,
            "Batch complete"
        );
        Ok(summary)
    }
}

/// Counts from [`GroupRemodel::run_batch`], plus the remodelled concepts.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Stated form already matched.
    pub aligned: usize,
    /// Remodelled concepts, ready to commit.
    pub remodelled: Vec<Concept>,
    /// Unmatched, or matched but nothing could be changed.
    pub misaligned: usize,
    /// Skipped by exclusion rules.
    pub excluded: usize,
    /// Validation failures.
    pub failed: usize,
}

fn by_affinity_then_name(a: (Option<usize>, &str), b: (Option<usize>, &str)) -> Ordering {
    match (a.0, b.0) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.1.cmp(b.1)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.1.cmp(b.1),
    }
}

fn remove_grouped_types(working: &mut WorkingGroups, template: &Template) -> usize {
    let grouped = template.grouped_types();
    let ungrouped = template.ungrouped_types();
    let ungrouped_set = &mut working.groups[0];
    let before = ungrouped_set.len();
    ungrouped_set.retain(|r| {
        r.is_is_a() || !grouped.contains(&r.type_id) || ungrouped.contains(&r.type_id)
    });
    before - ungrouped_set.len()
}

fn move_ungrouped_types(working: &mut WorkingGroups, template: &Template) -> usize {
    let grouped = template.grouped_types();
    let ungrouped_only: Vec<SctId> = template
        .ungrouped_types()
        .difference(&grouped)
        .copied()
        .collect();

    let mut moved = 0;
    for index in 1..working.groups.len() {
        for &type_id in &ungrouped_only {
            for rel in working.groups[index].remove_type(type_id) {
                working.groups[0].add(rel);
                moved += 1;
            }
        }
    }
    moved
}

fn collapse_lonely_groups(working: &mut WorkingGroups) -> usize {
    let mut collapsed = 0;
    for index in 1..working.groups.len() {
        if working.groups[index].len() == 1 {
            for rel in working.groups[index].drain() {
                working.groups[0].add(rel);
            }
            collapsed += 1;
        }
    }
    collapsed
}

/// Builds the remodelled concept: empty groups dropped, duplicate and
/// subset groups removed, groups renumbered from 1.
fn commit(concept: &Concept, working: WorkingGroups) -> Concept {
    let mut groups = working.groups.into_iter();
    let ungrouped = groups.next().unwrap_or_default();
    let grouped = remove_redundant_groups(groups.filter(|g| !g.is_empty()).collect());

    let renumbered = grouped.into_iter().enumerate().map(|(n, mut group)| {
        group.set_group_id(n as u16 + 1);
        group
    });

    let mut remodelled = concept.clone();
    remodelled.set_relationship_groups(
        CharacteristicType::Stated,
        std::iter::once(ungrouped).chain(renumbered),
    );
    remodelled
}

fn identified(group: &RelationshipGroup) -> usize {
    group.relationships().iter().filter(|r| r.id.is_some()).count()
}

fn remove_redundant_groups(groups: Vec<RelationshipGroup>) -> Vec<RelationshipGroup> {
    let mut distinct: Vec<RelationshipGroup> = Vec::with_capacity(groups.len());
    for group in groups {
        let type_values = group.type_values();
        match distinct.iter_mut().find(|g| g.type_values() == type_values) {
            Some(existing) if identified(&group) > identified(existing) => *existing = group,
            Some(_) => {}
            None => distinct.push(group),
        }
    }

    let contents: Vec<Vec<TypeValue>> = distinct.iter().map(RelationshipGroup::type_values).collect();
    distinct
        .into_iter()
        .enumerate()
        .filter(|(i, _)| {
            !contents.iter().enumerate().any(|(j, other)| {
                j != *i
                    && contents[*i].len() < other.len()
                    && contents[*i].iter().all(|tv| other.contains(tv))
            })
        })
        .map(|(_, group)| group)
        .collect()
}

/// Reports how the stated relationships differ between two versions.
fn report_changes(before: &Concept, after: &Concept, sink: &mut dyn ReportSink) {
    let old: Vec<&Relationship> = before.active_relationships(CharacteristicType::Stated).collect();
    let new: Vec<&Relationship> = after.active_relationships(CharacteristicType::Stated).collect();

    let same = |a: &Relationship, b: &Relationship| match (a.id, b.id) {
        (Some(x), Some(y)) => x == y,
        (None, None) => a.group_id == b.group_id && a.matches_type_value(&b.type_value()),
        _ => false,
    };

    let mut moves: BTreeMap<u16, Vec<String>> = BTreeMap::new();
    for rel in &new {
        match old.iter().find(|o| same(o, rel)) {
            Some(original) if original.group_id != rel.group_id => moves
                .entry(rel.group_id)
                .or_default()
                .push(format!("{} (was group {})", rel, original.group_id)),
            Some(_) => {}
            None => sink.report(
                after,
                Severity::Low,
                ReportActionType::RelationshipAdded,
                &rel.to_string(),
            ),
        }
    }
    for (_, moved) in moves {
        sink.report(
            after,
            Severity::Low,
            ReportActionType::RelationshipGroupModified,
            &moved.join(", "),
        );
    }
    for rel in &old {
        if !new.iter().any(|n| same(rel, n)) {
            sink.report(
                after,
                Severity::Low,
                ReportActionType::RelationshipRemoved,
                &rel.to_string(),
            );
        }
    }
}
