//! End-to-end remodeling scenarios over a small in-memory terminology.

use std::path::PathBuf;

use snomed_loader::SnomedStore;
use snomed_template::{
    matches_template, Attribute, AttributeGroup, GroupRemodel, LogicalTemplate, MemoryReport,
    RemodelOutcome, ReportActionType, Template, TemplateError, TemplateFix, TemplateFixConfig,
};
use snomed_types::{well_known, Cardinality, CharacteristicType, Concept, Relationship, SctId};

const ARM: SctId = 53120007;
const LEFT_ARM: SctId = 368208006;
const FRACTURE: SctId = 72704001;
const OBSERVABLE: SctId = 363787002;
const GLUCOSE_LEVEL: SctId = 434912009;

const ALIGNED: SctId = 7000001;
const DRIFTED: SctId = 7000002;
const EXCLUDED: SctId = 7000003;
const UNMATCHED: SctId = 7000004;

const STATED_SITE_ID: SctId = 1001;
const STATED_MORPHOLOGY_ID: SctId = 1002;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn make_relationship(
    source: SctId,
    type_id: SctId,
    dest: SctId,
    group: u16,
    char_type: CharacteristicType,
) -> Relationship {
    Relationship::new(source, type_id, dest, group, char_type)
}

/// A clinical finding with IS_A in both forms, plus the given attributes.
fn make_finding(
    id: SctId,
    fsn: &str,
    stated: &[(SctId, SctId, u16, Option<SctId>)],
    inferred: &[(SctId, SctId, u16)],
) -> Concept {
    let mut concept = Concept::new(id).with_fsn(fsn);
    for char_type in [CharacteristicType::Stated, CharacteristicType::Inferred] {
        concept.add_relationship(make_relationship(
            id,
            well_known::IS_A,
            well_known::CLINICAL_FINDING,
            0,
            char_type,
        ));
    }
    for &(type_id, dest, group, rel_id) in stated {
        let mut rel = make_relationship(id, type_id, dest, group, CharacteristicType::Stated);
        rel.id = rel_id;
        concept.add_relationship(rel);
    }
    for &(type_id, dest, group) in inferred {
        concept.add_relationship(make_relationship(
            id,
            type_id,
            dest,
            group,
            CharacteristicType::Inferred,
        ));
    }
    concept
}

fn grouped_site_and_morphology() -> [(SctId, SctId, u16); 2] {
    [
        (well_known::FINDING_SITE, LEFT_ARM, 1),
        (well_known::ASSOCIATED_MORPHOLOGY, FRACTURE, 1),
    ]
}

fn drifted_concept() -> Concept {
    make_finding(
        DRIFTED,
        "Fracture of left arm (disorder)",
        &[
            (well_known::FINDING_SITE, LEFT_ARM, 0, Some(STATED_SITE_ID)),
            (well_known::ASSOCIATED_MORPHOLOGY, FRACTURE, 0, Some(STATED_MORPHOLOGY_ID)),
        ],
        &grouped_site_and_morphology(),
    )
}

fn create_test_store() -> SnomedStore {
    let mut store = SnomedStore::new();
    store.insert_concepts([
        Concept::new(well_known::CLINICAL_FINDING).with_fsn("Clinical finding (finding)"),
        Concept::new(well_known::BODY_STRUCTURE),
        Concept::new(well_known::MORPHOLOGIC_ABNORMALITY),
        Concept::new(ARM).with_preferred_term("Arm"),
        Concept::new(LEFT_ARM).with_preferred_term("Left arm"),
        Concept::new(FRACTURE).with_preferred_term("Fracture"),
        Concept::new(OBSERVABLE),
        Concept::new(GLUCOSE_LEVEL),
    ]);
    store.insert_relationships(
        [
            (ARM, well_known::BODY_STRUCTURE),
            (LEFT_ARM, ARM),
            (FRACTURE, well_known::MORPHOLOGIC_ABNORMALITY),
            (GLUCOSE_LEVEL, OBSERVABLE),
        ]
        .map(|(child, parent)| {
            make_relationship(child, well_known::IS_A, parent, 0, CharacteristicType::Inferred)
        }),
    );

    let aligned_rels: Vec<_> = grouped_site_and_morphology()
        .iter()
        .map(|&(t, d, g)| (t, d, g, None))
        .collect();
    store.insert_concepts([
        make_finding(
            ALIGNED,
            "Fracture of arm (disorder)",
            &aligned_rels,
            &grouped_site_and_morphology(),
        ),
        drifted_concept(),
        make_finding(
            EXCLUDED,
            "Fracture associated with osteoporosis (disorder)",
            &[],
            &grouped_site_and_morphology(),
        ),
        make_finding(UNMATCHED, "Disorder of arm (disorder)", &[], &[]),
    ]);
    store
}

fn single_group_template(attributes: Vec<Attribute>) -> Template {
    Template::new(
        'A',
        "Single group",
        LogicalTemplate {
            focus_concepts: vec![well_known::CLINICAL_FINDING],
            ungrouped_attributes: vec![],
            attribute_groups: vec![AttributeGroup::new(Cardinality::required(), attributes)],
        },
    )
}

#[test]
fn test_ungrouped_site_and_morphology_are_grouped() {
    let store = create_test_store();
    let remodel = GroupRemodel::new(TemplateFix::new(&store, TemplateFixConfig::default()));
    let template = snomed_template::load_template(fixture("fracture_of_bone.json"), 'A').unwrap();
    let concept = drifted_concept();

    let mut report = MemoryReport::new();
    let outcome = remodel
        .remodel_concept(&concept, &template, &mut report)
        .unwrap();
    let RemodelOutcome::Committed {
        concept: remodelled,
        changes_made,
    } = outcome
    else {
        panic!("expected a committed remodel");
    };

    assert_eq!(changes_made, 2);

    let groups = remodelled.relationship_groups(CharacteristicType::Stated);
    assert_eq!(groups.len(), 2);
    assert!(!groups[0].is_grouped());
    assert_eq!(groups[0].attributes().count(), 0);
    assert_eq!(groups[1].group_id(), 1);
    let mut ids: Vec<_> = groups[1].relationships().iter().filter_map(|r| r.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![STATED_SITE_ID, STATED_MORPHOLOGY_ID]);

    assert_ne!(
        remodelled.to_expression(CharacteristicType::Stated),
        concept.to_expression(CharacteristicType::Stated)
    );
    assert_eq!(report.count(ReportActionType::RelationshipGroupModified), 1);

    // The input is untouched and the result now matches on its stated form.
    assert_eq!(concept, drifted_concept());
    let stated = matches_template(
        &remodelled,
        &template,
        remodel.fix().cache(),
        CharacteristicType::Stated,
        false,
    )
    .unwrap();
    assert!(stated.is_match());
}

#[test]
fn test_remodel_that_changes_nothing_is_a_validation_failure() {
    let store = create_test_store();
    let remodel = GroupRemodel::new(TemplateFix::new(&store, TemplateFixConfig::default()));
    let template = single_group_template(vec![Attribute::with_range(
        well_known::FINDING_SITE,
        "<< 123037004",
    )]);
    let concept = make_finding(
        DRIFTED,
        "Lesion of left arm (disorder)",
        &[(well_known::FINDING_SITE, LEFT_ARM, 0, Some(STATED_SITE_ID))],
        &[(well_known::FINDING_SITE, LEFT_ARM, 1)],
    );

    let mut report = MemoryReport::new();
    let err = remodel
        .remodel_concept(&concept, &template, &mut report)
        .unwrap_err();
    assert!(err.is_validation_failure());
    assert!(err.to_string().contains("Stated modelling unchanged"));
    assert!(report.rows().is_empty());
}

#[test]
fn test_single_relationship_group_is_dissolved() {
    let store = create_test_store();
    let remodel = GroupRemodel::new(TemplateFix::new(&store, TemplateFixConfig::default()));
    let template = single_group_template(vec![
        Attribute::with_range(well_known::INTERPRETS, "<< 363787002"),
        Attribute::with_range(well_known::HAS_INTERPRETATION, "<< 362981000")
            .cardinality(Cardinality::optional()),
    ]);
    let concept = make_finding(
        DRIFTED,
        "Glucose level finding (finding)",
        &[],
        &[(well_known::INTERPRETS, GLUCOSE_LEVEL, 1)],
    );

    let mut report = MemoryReport::new();
    let outcome = remodel
        .remodel_concept(&concept, &template, &mut report)
        .unwrap();
    let RemodelOutcome::Committed {
        concept: remodelled,
        changes_made,
    } = outcome
    else {
        panic!("expected a committed remodel");
    };

    assert_eq!(changes_made, 1);
    let interprets: Vec<_> = remodelled
        .active_relationships(CharacteristicType::Stated)
        .filter(|r| r.type_id == well_known::INTERPRETS)
        .collect();
    assert_eq!(interprets.len(), 1);
    assert_eq!(interprets[0].group_id, 0);
    assert_eq!(interprets[0].id, None);
    assert_eq!(remodelled.relationship_groups(CharacteristicType::Stated).len(), 1);
    assert_eq!(report.count(ReportActionType::RelationshipAdded), 1);
}

#[test]
fn test_batch_run_reports_every_concept() {
    let store = create_test_store();
    let config = TemplateFixConfig {
        template_paths: vec![fixture("fracture_of_bone.json")],
        ..Default::default()
    };
    let mut remodel = GroupRemodel::new(TemplateFix::new(&store, config));
    remodel.init().unwrap();
    remodel.post_init().unwrap();
    assert_eq!(remodel.fix().templates()[0].name, "Fracture of bone structure");

    let mut report = MemoryReport::new();
    let summary = remodel.run_batch(&mut report).unwrap();

    assert_eq!(summary.aligned, 1);
    assert_eq!(summary.excluded, 1);
    assert_eq!(summary.misaligned, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.remodelled.len(), 1);
    assert_eq!(summary.remodelled[0].id, DRIFTED);

    assert_eq!(report.rows_for(ALIGNED).next().unwrap().action, ReportActionType::Aligned);
    assert_eq!(report.rows_for(EXCLUDED).next().unwrap().action, ReportActionType::Excluded);
    let unmatched = report.rows_for(UNMATCHED).next().unwrap();
    assert_eq!(unmatched.action, ReportActionType::Misaligned);
    assert!(unmatched.details.starts_with("A 0 found != 1..1 required."));
    assert!(report
        .rows_for(DRIFTED)
        .any(|r| r.action == ReportActionType::Remodelled));
}

#[test]
fn test_remodelled_concepts_can_be_committed_to_the_store() {
    let mut store = create_test_store();
    let config = TemplateFixConfig {
        template_paths: vec![fixture("fracture_of_bone.json")],
        ..Default::default()
    };
    let remodelled = {
        let mut remodel = GroupRemodel::new(TemplateFix::new(&store, config));
        remodel.post_init().unwrap();
        remodel.run_batch(&mut MemoryReport::new()).unwrap().remodelled
    };

    let relationship_count = store.relationship_count();
    for concept in remodelled {
        store.replace_concept(concept);
    }
    assert_eq!(store.relationship_count(), relationship_count);
    assert_eq!(
        store
            .get_concept(DRIFTED)
            .unwrap()
            .relationship_groups(CharacteristicType::Stated)
            .len(),
        2
    );
}

#[test]
fn test_unparseable_template_stops_the_run_at_init() {
    let store = create_test_store();
    let config = TemplateFixConfig {
        template_paths: vec![fixture("fracture_of_bone.json"), fixture("broken.json")],
        ..Default::default()
    };
    let remodel = GroupRemodel::new(TemplateFix::new(&store, config));
    assert!(matches!(
        remodel.init(),
        Err(TemplateError::InvalidTemplate { .. })
    ));
}
