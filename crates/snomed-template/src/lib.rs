//! # snomed-template
//!
//! Template matching and relationship-group remodeling for SNOMED CT.
//!
//! A run is set up as a [`TemplateFix`] over a [`TerminologyGraph`] (an
//! [`snomed_loader::SnomedStore`] works directly). Concepts in the chosen
//! subhierarchy are matched against logical templates on their inferred
//! form; [`GroupRemodel`] then reshapes the stated role groups of concepts
//! whose stated form has drifted from their template.
//!
//! ## Usage
//!
//! ```rust
//! use snomed_loader::SnomedStore;
//! use snomed_template::{
//!     Attribute, AttributeGroup, GroupRemodel, LogicalTemplate, MemoryReport, TemplateFix,
//!     TemplateFixConfig,
//! };
//! use snomed_types::{well_known, Cardinality, Concept};
//!
//! let mut store = SnomedStore::new();
//! store.insert_concepts([Concept::new(well_known::CLINICAL_FINDING)]);
//!
//! let mut remodel = GroupRemodel::new(TemplateFix::new(&store, TemplateFixConfig::default()));
//! remodel.post_init().unwrap();
//! remodel
//!     .fix_mut()
//!     .add_template(
//!         "Finding site",
//!         LogicalTemplate {
//!             focus_concepts: vec![well_known::CLINICAL_FINDING],
//!             ungrouped_attributes: vec![],
//!             attribute_groups: vec![AttributeGroup::new(
//!                 Cardinality::one_or_more(),
//!                 vec![Attribute::with_range(well_known::FINDING_SITE, "<< 123037004")],
//!             )],
//!         },
//!     )
//!     .unwrap();
//!
//! let mut report = MemoryReport::new();
//! let summary = remodel.run_batch(&mut report).unwrap();
//! assert_eq!(summary.misaligned, 1);
//! ```
//!
//! ## Allowable ranges
//!
//! Only `<< X`, `< X` and `*` (joined by ` OR `) are evaluated locally. Other
//! ECL fails with [`TemplateError::UnsupportedEcl`].

#![warn(missing_docs)]

pub mod cache;
pub mod ecl;
pub mod error;
pub mod fix;
pub mod graph;
pub mod matcher;
pub mod remodel;
pub mod report;
pub mod template;

pub use cache::{DescendantSet, DescendantsCache};
pub use error::{TemplateError, TemplateResult, ValidationFailure};
pub use fix::{most_specific_template, TemplateFix, TemplateFixConfig};
pub use graph::TerminologyGraph;
pub use matcher::{
    contains_matching_relationship, matches_attribute, matches_template, matches_template_group,
    TemplateMatch,
};
pub use remodel::{BatchSummary, GroupRemodel, RemodelOutcome, WorkingGroups};
pub use report::{MemoryReport, ReportActionType, ReportRow, ReportSink, Severity, TracingReport};
pub use template::{load_template, Attribute, AttributeGroup, LogicalTemplate, Template};
