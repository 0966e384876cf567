//! Memoised descendant sets.
//!
//! A [`DescendantsCache`] belongs to one run. Sets are computed by walking
//! the inferred hierarchy on first request and shared as `Rc<HashSet>` from
//! then on; callers get read-only views.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use snomed_types::SctId;

use crate::error::{TemplateError, TemplateResult};
use crate::graph::TerminologyGraph;

/// Shared, read-only set of concept ids.
pub type DescendantSet = Rc<HashSet<SctId>>;

/// Run-scoped cache of descendant sets.
pub struct DescendantsCache<'g> {
    graph: &'g dyn TerminologyGraph,
    or_self: RefCell<HashMap<SctId, DescendantSet>>,
    strict: RefCell<HashMap<SctId, DescendantSet>>,
}

impl<'g> DescendantsCache<'g> {
    /// Creates an empty cache over a graph.
    pub fn new(graph: &'g dyn TerminologyGraph) -> Self {
        Self {
            graph,
            or_self: RefCell::new(HashMap::new()),
            strict: RefCell::new(HashMap::new()),
        }
    }

    /// The graph this cache reads from.
    pub fn graph(&self) -> &'g dyn TerminologyGraph {
        self.graph
    }

    /// The concept plus all its descendants.
    ///
    /// Fails with [`TemplateError::UnknownConcept`] if the graph cannot
    /// resolve `id`.
    pub fn descendants_or_self(&self, id: SctId) -> TemplateResult<DescendantSet> {
        let cached = self.or_self.borrow().get(&id).cloned();
        if let Some(set) = cached {
            return Ok(set);
        }

        let concept = self
            .graph
            .concept(id)
            .ok_or(TemplateError::UnknownConcept(id))?;

        let mut descendants = HashSet::from([concept.id]);
        let mut queue: VecDeque<SctId> = self.graph.children(concept.id).into();
        while let Some(current) = queue.pop_front() {
            if descendants.insert(current) {
                queue.extend(self.graph.children(current));
            }
        }

        let set = Rc::new(descendants);
        self.or_self.borrow_mut().insert(id, Rc::clone(&set));
        Ok(set)
    }

    /// All descendants of the concept, excluding itself.
    pub fn descendants(&self, id: SctId) -> TemplateResult<DescendantSet> {
        let cached = self.strict.borrow().get(&id).cloned();
        if let Some(set) = cached {
            return Ok(set);
        }

        let mut descendants = (*self.descendants_or_self(id)?).clone();
        descendants.remove(&id);

        let set = Rc::new(descendants);
        self.strict.borrow_mut().insert(id, Rc::clone(&set));
        Ok(set)
    }

    /// True if `candidate` is `ancestor` or one of its descendants.
    pub fn is_descendant_or_self(&self, candidate: SctId, ancestor: SctId) -> TemplateResult<bool> {
        Ok(self.descendants_or_self(ancestor)?.contains(&candidate))
    }

    /// Number of concepts with a cached descendants-or-self set.
    pub fn len(&self) -> usize {
        self.or_self.borrow().len()
    }

    /// Returns true if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached set.
    pub fn clear(&self) {
        self.or_self.borrow_mut().clear();
        self.strict.borrow_mut().clear();
    }
}

impl std::fmt::Debug for DescendantsCache<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescendantsCache")
            .field("or_self", &self.or_self.borrow().len())
            .field("strict", &self.strict.borrow().len())
            .finish()
    }
}
