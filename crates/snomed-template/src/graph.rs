//! Read access to the concept graph.

use snomed_loader::SnomedStore;
use snomed_types::{Concept, SctId};

/// The terminology the engine matches against.
///
/// Children are taken from the inferred IS_A hierarchy.
pub trait TerminologyGraph {
    /// Resolves an id to the canonical in-memory concept.
    fn concept(&self, id: SctId) -> Option<&Concept>;

    /// Direct inferred children of a concept.
    fn children(&self, id: SctId) -> Vec<SctId>;

    /// Every concept id in the graph.
    fn concept_ids(&self) -> Vec<SctId>;
}

impl TerminologyGraph for SnomedStore {
    fn concept(&self, id: SctId) -> Option<&Concept> {
        self.get_concept(id)
    }

    fn children(&self, id: SctId) -> Vec<SctId> {
        self.get_children(id)
    }

    fn concept_ids(&self) -> Vec<SctId> {
        SnomedStore::concept_ids(self).copied().collect()
    }
}
