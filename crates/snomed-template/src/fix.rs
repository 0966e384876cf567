//! Run orchestration: subhierarchy, templates, exclusions, matching.
//!
//! A [`TemplateFix`] is the run context. It owns the descendants cache and
//! the loaded templates, and goes through two set-up steps:
//!
//! 1. [`init`](TemplateFix::init) checks every template file parses, before
//!    anything expensive happens;
//! 2. [`post_init`](TemplateFix::post_init) resolves the subhierarchy, loads
//!    the templates as `A`, `B`, `C`, ... and computes the exclusions.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;

use snomed_types::{well_known, CharacteristicType, Concept, SctId};
use tracing::{debug, info, warn};

use crate::cache::DescendantsCache;
use crate::ecl;
use crate::error::{TemplateError, TemplateResult};
use crate::graph::TerminologyGraph;
use crate::matcher::matches_template;
use crate::template::{load_template, LogicalTemplate, Template};

const DEFAULT_EXCLUSION_WORDS: [&str; 4] = ["subluxation", "avulsion", "associated", "co-occurrent"];
const COMPLEX_EXCLUSION_WORDS: [&str; 2] = ["due to", "without"];
const COMPLEX_ATTRIBUTE_TYPES: [SctId; 2] = [well_known::DUE_TO, well_known::AFTER];
const MAX_TEMPLATES: usize = 26;

/// Run configuration.
#[derive(Debug, Clone)]
pub struct TemplateFixConfig {
    /// Concepts to consider, as `<< X` style ECL.
    pub subhierarchy_ecl: String,
    /// Template files, loaded in order.
    pub template_paths: Vec<PathBuf>,
    /// Hierarchies whose members are never remodelled.
    pub exclusion_roots: Vec<SctId>,
    /// Keep concepts with complex attributes (due to, after) in scope.
    pub include_complex_templates: bool,
    /// Extra whole-word FSN exclusions.
    pub extra_exclusion_words: Vec<String>,
}

impl Default for TemplateFixConfig {
    fn default() -> Self {
        Self {
            subhierarchy_ecl: format!("<< {}", well_known::CLINICAL_FINDING),
            template_paths: Vec::new(),
            exclusion_roots: Vec::new(),
            include_complex_templates: false,
            extra_exclusion_words: Vec::new(),
        }
    }
}

impl TemplateFixConfig {
    /// Config for the subhierarchy rooted at `root`.
    pub fn for_subhierarchy(root: SctId) -> Self {
        Self {
            subhierarchy_ecl: format!("<< {}", root),
            ..Default::default()
        }
    }
}

/// Run context for template matching.
pub struct TemplateFix<'g> {
    graph: &'g dyn TerminologyGraph,
    cache: DescendantsCache<'g>,
    config: TemplateFixConfig,
    templates: Vec<Template>,
    subhierarchy: BTreeSet<SctId>,
    exclusions: HashSet<SctId>,
    exclusion_words: Vec<String>,
    summary: RefCell<BTreeMap<String, usize>>,
    issues: RefCell<BTreeMap<SctId, Vec<String>>>,
}

impl<'g> TemplateFix<'g> {
    /// Creates an uninitialised run over a graph.
    pub fn new(graph: &'g dyn TerminologyGraph, config: TemplateFixConfig) -> Self {
        Self {
            graph,
            cache: DescendantsCache::new(graph),
            config,
            templates: Vec::new(),
            subhierarchy: BTreeSet::new(),
            exclusions: HashSet::new(),
            exclusion_words: Vec::new(),
            summary: RefCell::new(BTreeMap::new()),
            issues: RefCell::new(BTreeMap::new()),
        }
    }

    /// Checks that every configured template file parses.
    pub fn init(&self) -> TemplateResult<()> {
        for path in &self.config.template_paths {
            load_template(path, 'A')?;
        }
        info!(
            templates = self.config.template_paths.len(),
            "Template files validated"
        );
        Ok(())
    }

    /// Resolves the subhierarchy, loads templates and computes exclusions.
    pub fn post_init(&mut self) -> TemplateResult<()> {
        self.subhierarchy = ecl::evaluate(&self.config.subhierarchy_ecl, &self.cache)?;
        if self.subhierarchy.is_empty() {
            return Err(TemplateError::EmptySubhierarchy(
                self.config.subhierarchy_ecl.clone(),
            ));
        }

        for path in self.config.template_paths.clone() {
            let id = self.next_template_id(&path.display().to_string())?;
            let template = load_template(&path, id)?;
            debug!(template = %template, path = %path.display(), "Loaded template");
            self.templates.push(template);
        }

        self.exclusions.clear();
        for &root in &self.config.exclusion_roots {
            let excluded = self.cache.descendants_or_self(root)?;
            self.exclusions.extend(excluded.iter().copied());
        }

        self.exclusion_words = DEFAULT_EXCLUSION_WORDS.iter().map(|w| w.to_string()).collect();
        if !self.config.include_complex_templates {
            self.exclusion_words
                .extend(COMPLEX_EXCLUSION_WORDS.iter().map(|w| w.to_string()));
        }
        self.exclusion_words.extend(
            self.config
                .extra_exclusion_words
                .iter()
                .map(|w| w.trim().to_lowercase()),
        );

        info!(
            subhierarchy = self.subhierarchy.len(),
            templates = self.templates.len(),
            exclusions = self.exclusions.len(),
            "Run initialised"
        );
        Ok(())
    }

    /// Adds an in-memory template, returning its id.
    pub fn add_template(
        &mut self,
        name: impl Into<String>,
        logical: LogicalTemplate,
    ) -> TemplateResult<char> {
        let name = name.into();
        let id = self.next_template_id(&name)?;
        self.templates.push(Template::new(id, name, logical));
        Ok(id)
    }

    fn next_template_id(&self, name: &str) -> TemplateResult<char> {
        let index = self.templates.len();
        if index >= MAX_TEMPLATES {
            return Err(TemplateError::InvalidTemplate {
                name: name.to_string(),
                reason: format!("at most {} templates per run", MAX_TEMPLATES),
            });
        }
        Ok(char::from(b'A' + index as u8))
    }

    /// Concepts in the subhierarchy whose inferred form matches `template`.
    ///
    /// Non-matching concepts have their diagnostics recorded, see
    /// [`issues_for`](Self::issues_for).
    pub fn find_template_matches(&self, template: &Template) -> TemplateResult<BTreeSet<SctId>> {
        let mut matched = BTreeSet::new();
        for &id in &self.subhierarchy {
            let concept = self.graph.concept(id).ok_or(TemplateError::UnknownConcept(id))?;
            if !concept.active {
                continue;
            }

            let outcome = matches_template(
                concept,
                template,
                &self.cache,
                CharacteristicType::Inferred,
                false,
            )
            .map_err(|e| e.in_context(id, template.id))?;

            if outcome.matched {
                matched.insert(id);
            } else {
                let mut issues = outcome.issues;
                issues.extend(
                    outcome
                        .unmatched_groups
                        .iter()
                        .map(|g| format!("{} group {} unmatched", template.id, g)),
                );
                self.record_issues(id, issues);
            }
        }

        info!(template = %template, matched = matched.len(), "Matched template");
        Ok(matched)
    }

    /// Matches every template, resolving concepts that match several.
    pub fn find_all_template_matches(&self) -> TemplateResult<BTreeMap<SctId, char>> {
        let mut by_concept: BTreeMap<SctId, Vec<&Template>> = BTreeMap::new();
        for template in &self.templates {
            for id in self.find_template_matches(template)? {
                by_concept.entry(id).or_default().push(template);
            }
        }

        let mut resolved = BTreeMap::new();
        for (id, matching) in by_concept {
            let Some(chosen) = most_specific_template(&matching) else {
                continue;
            };
            if matching.len() > 1 {
                let ids: String = matching.iter().map(|t| t.id).collect();
                warn!(
                    concept_id = id,
                    templates = %ids,
                    chosen = %chosen.id,
                    "Concept matches several templates"
                );
                self.bump("Multiple templates matched");
            }
            resolved.insert(id, chosen.id);
        }
        Ok(resolved)
    }

    /// True if the concept is out of scope for remodeling.
    ///
    /// A concept is excluded if it lies in an exclusion hierarchy, if its FSN
    /// contains an exclusion word as a whole word, or (unless complex
    /// templates are included) if it has an inferred complex attribute.
    pub fn is_excluded(&self, concept: &Concept) -> bool {
        if self.exclusions.contains(&concept.id) {
            self.bump("Excluded by hierarchy");
            return true;
        }

        if let Some(fsn) = &concept.fsn {
            let padded = format!(" {} ", fsn.to_lowercase());
            if let Some(word) = self
                .exclusion_words
                .iter()
                .find(|w| padded.contains(&format!(" {} ", w)))
            {
                self.bump(&format!("Excluded by word '{}'", word));
                return true;
            }
        }

        if !self.config.include_complex_templates
            && concept
                .active_relationships(CharacteristicType::Inferred)
                .any(|r| COMPLEX_ATTRIBUTE_TYPES.contains(&r.type_id))
        {
            self.bump("Excluded as complex");
            return true;
        }

        false
    }

    pub(crate) fn bump(&self, key: &str) {
        *self.summary.borrow_mut().entry(key.to_string()).or_insert(0) += 1;
    }

    pub(crate) fn record_issues(&self, concept_id: SctId, issues: Vec<String>) {
        if issues.is_empty() {
            return;
        }
        self.issues
            .borrow_mut()
            .entry(concept_id)
            .or_default()
            .extend(issues);
    }

    /// Summary counters, by label.
    pub fn summary(&self) -> BTreeMap<String, usize> {
        self.summary.borrow().clone()
    }

    /// Diagnostics recorded against a concept.
    pub fn issues_for(&self, concept_id: SctId) -> Vec<String> {
        self.issues
            .borrow()
            .get(&concept_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Loaded templates, in id order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Template by id.
    pub fn template(&self, id: char) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// The run's descendants cache.
    pub fn cache(&self) -> &DescendantsCache<'g> {
        &self.cache
    }

    /// The graph being processed.
    pub fn graph(&self) -> &'g dyn TerminologyGraph {
        self.graph
    }

    /// Concepts selected by the subhierarchy expression.
    pub fn subhierarchy(&self) -> &BTreeSet<SctId> {
        &self.subhierarchy
    }

    /// Run configuration.
    pub fn config(&self) -> &TemplateFixConfig {
        &self.config
    }
}

/// Picks one template among several that match the same concept.
///
/// The last-declared (highest id) template wins.
pub fn most_specific_template<'t>(matching: &[&'t Template]) -> Option<&'t Template> {
    matching.iter().copied().max_by_key(|t| t.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snomed_loader::SnomedStore;
    use snomed_types::{Cardinality, Relationship};

    use crate::template::{Attribute, AttributeGroup};

    const BONE: SctId = 272673000;
    const FRACTURE: SctId = 72704001;
    const FRACTURE_OF_BONE: SctId = 125605004;
    const ASSOCIATED_FINDING: SctId = 5000001;
    const DISASSOCIATED: SctId = 5000002;
    const INFECTION_DUE_TO: SctId = 5000003;

    fn make_relationship(source: SctId, type_id: SctId, dest: SctId, group: u16) -> Relationship {
        Relationship::new(source, type_id, dest, group, CharacteristicType::Inferred)
    }

    fn create_test_store() -> SnomedStore {
        let mut store = SnomedStore::new();
        store.insert_concepts([
            Concept::new(well_known::CLINICAL_FINDING).with_fsn("Clinical finding (finding)"),
            Concept::new(well_known::BODY_STRUCTURE),
            Concept::new(well_known::MORPHOLOGIC_ABNORMALITY),
            Concept::new(BONE),
            Concept::new(FRACTURE),
            Concept::new(FRACTURE_OF_BONE).with_fsn("Fracture of bone (disorder)"),
            Concept::new(ASSOCIATED_FINDING).with_fsn("Associated finding (finding)"),
            Concept::new(DISASSOCIATED).with_fsn("Disassociated state (finding)"),
            Concept::new(INFECTION_DUE_TO).with_fsn("Infection of bone (disorder)"),
        ]);
        let mut rels = vec![
            make_relationship(BONE, well_known::IS_A, well_known::BODY_STRUCTURE, 0),
            make_relationship(FRACTURE, well_known::IS_A, well_known::MORPHOLOGIC_ABNORMALITY, 0),
            make_relationship(FRACTURE_OF_BONE, well_known::FINDING_SITE, BONE, 1),
            make_relationship(FRACTURE_OF_BONE, well_known::ASSOCIATED_MORPHOLOGY, FRACTURE, 1),
            make_relationship(INFECTION_DUE_TO, well_known::DUE_TO, FRACTURE, 0),
        ];
        for finding in [FRACTURE_OF_BONE, ASSOCIATED_FINDING, DISASSOCIATED, INFECTION_DUE_TO] {
            rels.push(make_relationship(finding, well_known::IS_A, well_known::CLINICAL_FINDING, 0));
        }
        store.insert_relationships(rels);
        store
    }

    fn fracture_template() -> LogicalTemplate {
        LogicalTemplate {
            focus_concepts: vec![well_known::CLINICAL_FINDING],
            ungrouped_attributes: vec![],
            attribute_groups: vec![AttributeGroup::new(
                Cardinality::one_or_more(),
                vec![
                    Attribute::with_range(well_known::FINDING_SITE, "<< 123037004"),
                    Attribute::with_range(well_known::ASSOCIATED_MORPHOLOGY, "<< 49755003"),
                ],
            )],
        }
    }

    fn create_fix(store: &SnomedStore) -> TemplateFix<'_> {
        let mut fix = TemplateFix::new(store, TemplateFixConfig::default());
        fix.post_init().unwrap();
        fix
    }

    #[test]
    fn test_post_init_resolves_subhierarchy() {
        let store = create_test_store();
        let fix = create_fix(&store);
        assert_eq!(fix.subhierarchy().len(), 5);
        assert_eq!(
            TemplateFixConfig::for_subhierarchy(FRACTURE_OF_BONE).subhierarchy_ecl,
            "<< 125605004"
        );
        assert!(fix.subhierarchy().contains(&well_known::CLINICAL_FINDING));
        assert!(!fix.subhierarchy().contains(&BONE));
    }

    #[test]
    fn test_empty_subhierarchy_is_fatal() {
        let store = create_test_store();
        let config = TemplateFixConfig {
            subhierarchy_ecl: format!("< {}", FRACTURE),
            ..Default::default()
        };
        let mut fix = TemplateFix::new(&store, config);
        assert!(matches!(
            fix.post_init(),
            Err(TemplateError::EmptySubhierarchy(_))
        ));
    }

    #[test]
    fn test_missing_template_file_fails_init() {
        let store = create_test_store();
        let config = TemplateFixConfig {
            template_paths: vec![PathBuf::from("/no/such/template.json")],
            ..Default::default()
        };
        let fix = TemplateFix::new(&store, config);
        assert!(matches!(fix.init(), Err(TemplateError::TemplateRead { .. })));
    }

    #[test]
    fn test_template_ids_are_assigned_in_order() {
        let store = create_test_store();
        let mut fix = create_fix(&store);
        assert_eq!(fix.add_template("first", fracture_template()).unwrap(), 'A');
        assert_eq!(fix.add_template("second", LogicalTemplate::default()).unwrap(), 'B');
        assert_eq!(fix.template('B').unwrap().name, "second");

        for n in 2..MAX_TEMPLATES {
            fix.add_template(format!("t{}", n), LogicalTemplate::default()).unwrap();
        }
        assert_eq!(fix.templates().last().unwrap().id, 'Z');
        assert!(matches!(
            fix.add_template("one too many", LogicalTemplate::default()),
            Err(TemplateError::InvalidTemplate { .. })
        ));
    }

    #[test]
    fn test_find_template_matches_uses_inferred_form() {
        let store = create_test_store();
        let mut fix = create_fix(&store);
        fix.add_template("Fracture", fracture_template()).unwrap();

        let template = fix.template('A').unwrap();
        let matched = fix.find_template_matches(template).unwrap();
        assert_eq!(matched, BTreeSet::from([FRACTURE_OF_BONE]));

        let issues = fix.issues_for(ASSOCIATED_FINDING);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("A 0 found != 1..* required."));
        assert!(fix.issues_for(FRACTURE_OF_BONE).is_empty());
    }

    #[test]
    fn test_most_specific_template_is_last_declared() {
        let a = Template::new('A', "general", LogicalTemplate::default());
        let b = Template::new('B', "specific", LogicalTemplate::default());
        assert_eq!(most_specific_template(&[&a, &b]).unwrap().id, 'B');
        assert_eq!(most_specific_template(&[&b, &a]).unwrap().id, 'B');
        assert!(most_specific_template(&[]).is_none());
    }

    #[test]
    fn test_conflicting_matches_resolve_to_last_template() {
        let store = create_test_store();
        let mut fix = create_fix(&store);
        fix.add_template("Fracture", fracture_template()).unwrap();
        fix.add_template("Fracture again", fracture_template()).unwrap();

        let resolved = fix.find_all_template_matches().unwrap();
        assert_eq!(resolved.get(&FRACTURE_OF_BONE), Some(&'B'));
        assert_eq!(fix.summary().get("Multiple templates matched"), Some(&1));
    }

    #[test]
    fn test_exclusion_words_are_whole_words() {
        let store = create_test_store();
        let fix = create_fix(&store);

        assert!(fix.is_excluded(store.get_concept(ASSOCIATED_FINDING).unwrap()));
        assert!(!fix.is_excluded(store.get_concept(DISASSOCIATED).unwrap()));
        assert!(!fix.is_excluded(store.get_concept(FRACTURE_OF_BONE).unwrap()));
        assert_eq!(fix.summary().get("Excluded by word 'associated'"), Some(&1));
    }

    #[test]
    fn test_complex_attributes_exclude_unless_included() {
        let store = create_test_store();
        let fix = create_fix(&store);
        let infection = store.get_concept(INFECTION_DUE_TO).unwrap();
        assert!(fix.is_excluded(infection));

        let mut inclusive = TemplateFix::new(
            &store,
            TemplateFixConfig {
                include_complex_templates: true,
                ..Default::default()
            },
        );
        inclusive.post_init().unwrap();
        assert!(!inclusive.is_excluded(infection));
    }

    #[test]
    fn test_exclusion_hierarchies_and_extra_words() {
        let store = create_test_store();
        let mut fix = TemplateFix::new(
            &store,
            TemplateFixConfig {
                exclusion_roots: vec![FRACTURE_OF_BONE],
                extra_exclusion_words: vec!["Infection".to_string()],
                ..Default::default()
            },
        );
        fix.post_init().unwrap();

        assert!(fix.is_excluded(store.get_concept(FRACTURE_OF_BONE).unwrap()));
        assert_eq!(fix.summary().get("Excluded by hierarchy"), Some(&1));
        let infection = store.get_concept(INFECTION_DUE_TO).unwrap();
        assert!(fix.is_excluded(infection));
        assert_eq!(fix.summary().get("Excluded by word 'infection'"), Some(&1));
    }
}
