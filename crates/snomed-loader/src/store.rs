//! In-memory SNOMED CT concept store.
//!
//! Holds every loaded concept with its stated and inferred relationships,
//! plus a reverse index of inferred IS_A relationships for child lookups.
//! Relationship files can be parsed in parallel via rayon.
//!
//! ```ignore
//! let files = discover_rf2_files("/path/to/release")?;
//! let mut store = SnomedStore::new();
//! store.load_all(&files)?;
//!
//! let children = store.get_children(404684003);
//! ```

use std::collections::HashMap;
use std::path::Path;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use snomed_types::{CharacteristicType, Concept, DescriptionType, Relationship, SctId};

use crate::description::DescriptionRow;
use crate::parser::Rf2Parser;
use crate::relationship::RelationshipRow;
use crate::types::{DescriptionConfig, LoadStats, RelationshipConfig, Rf2Config, Rf2Files, Rf2Result};

/// In-memory store of concepts and their relationships.
#[derive(Default)]
pub struct SnomedStore {
    /// Concepts indexed by SCTID.
    concepts: HashMap<SctId, Concept>,
    /// Inferred IS_A children indexed by parent.
    children: HashMap<SctId, Vec<SctId>>,
    /// Number of descriptions attached to concepts.
    description_count: usize,
    /// Number of relationships attached to concepts.
    relationship_count: usize,
}

impl std::fmt::Debug for SnomedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnomedStore")
            .field("concepts", &self.concepts.len())
            .field("children", &self.children.len())
            .field("description_count", &self.description_count)
            .field("relationship_count", &self.relationship_count)
            .finish()
    }
}

impl SnomedStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with room for `concept_count` concepts.
    pub fn with_capacity(concept_count: usize) -> Self {
        Self {
            concepts: HashMap::with_capacity(concept_count),
            children: HashMap::with_capacity(concept_count),
            ..Self::default()
        }
    }

    /// Loads concepts from an RF2 concept file.
    pub fn load_concepts<P: AsRef<Path>>(
        &mut self,
        path: P,
        config: Rf2Config,
    ) -> Rf2Result<LoadStats> {
        let mut parser = Rf2Parser::<_, Concept>::from_path(path, config)?;
        let mut stats = LoadStats::default();

        for concept in parser.by_ref() {
            let concept = concept?;
            self.concepts.insert(concept.id, concept);
            stats.loaded += 1;
        }
        stats.skipped = parser.records_skipped();

        Ok(stats)
    }

    /// Loads descriptions and names the concepts they belong to.
    pub fn load_descriptions<P: AsRef<Path>>(
        &mut self,
        path: P,
        config: DescriptionConfig,
    ) -> Rf2Result<LoadStats> {
        let mut parser = Rf2Parser::<_, DescriptionRow>::from_path(path, config.base.clone())?;
        let mut rows = Vec::new();
        let mut stats = LoadStats::default();

        for row in parser.by_ref() {
            let row = row?;
            if row.passes_description_filter(&config) {
                rows.push(row);
            } else {
                stats.skipped += 1;
            }
        }
        stats.skipped += parser.records_skipped();

        let total = rows.len();
        stats.orphaned = self.insert_descriptions(rows);
        stats.loaded = total - stats.orphaned;
        Ok(stats)
    }

    /// Loads relationships from an inferred or stated relationship file.
    ///
    /// Rows are routed to the stated or inferred form by their
    /// characteristic type; additional relationships are skipped.
    pub fn load_relationships<P: AsRef<Path>>(
        &mut self,
        path: P,
        config: RelationshipConfig,
    ) -> Rf2Result<LoadStats> {
        let mut parser = Rf2Parser::<_, RelationshipRow>::from_path(path, config.base.clone())?;
        let mut relationships = Vec::new();
        let mut stats = LoadStats::default();

        for row in parser.by_ref() {
            let row = row?;
            match row
                .passes_relationship_filter(&config)
                .then(|| row.into_relationship())
                .flatten()
            {
                Some(rel) => relationships.push(rel),
                None => stats.skipped += 1,
            }
        }
        stats.skipped += parser.records_skipped();

        let total = relationships.len();
        stats.orphaned = self.insert_relationships(relationships);
        stats.loaded = total - stats.orphaned;
        Ok(stats)
    }

    /// Loads relationships using parallel parsing.
    ///
    /// Reads all lines into memory, then parses them in parallel using
    /// rayon. Malformed rows fail the whole load, as with the serial reader.
    #[cfg(feature = "parallel")]
    pub fn load_relationships_parallel<P: AsRef<Path>>(
        &mut self,
        path: P,
        config: RelationshipConfig,
    ) -> Rf2Result<LoadStats> {
        let lines = read_data_lines::<RelationshipRow, _>(path)?;

        let rows: Vec<Option<Relationship>> = lines
            .par_iter()
            .map(|line| {
                let row = parse_line::<RelationshipRow>(line)?;
                Ok(row
                    .passes_relationship_filter(&config)
                    .then(|| row.into_relationship())
                    .flatten())
            })
            .collect::<Rf2Result<_>>()?;

        let skipped = rows.iter().filter(|r| r.is_none()).count();
        let relationships: Vec<Relationship> = rows.into_iter().flatten().collect();
        let total = relationships.len();
        let orphaned = self.insert_relationships(relationships);

        Ok(LoadStats {
            loaded: total - orphaned,
            skipped,
            orphaned,
        })
    }

    /// Loads every file of a discovered release.
    ///
    /// Concepts are loaded first so descriptions and relationships can be
    /// attached to them. Returns per-file statistics in load order:
    /// concepts, descriptions, inferred and stated relationships.
    pub fn load_all(&mut self, files: &Rf2Files) -> Rf2Result<[LoadStats; 4]> {
        let mut stats: [LoadStats; 4] = Default::default();

        if let Some(ref path) = files.concept_file {
            stats[0] = self.load_concepts(path, Rf2Config::default())?;
        }
        if let Some(ref path) = files.description_file {
            stats[1] = self.load_descriptions(path, DescriptionConfig::english_fsns())?;
        }
        if let Some(ref path) = files.relationship_file {
            stats[2] = self.load_relationship_file(path, RelationshipConfig::inferred_only())?;
        }
        if let Some(ref path) = files.stated_relationship_file {
            stats[3] = self.load_relationship_file(path, RelationshipConfig::stated_only())?;
        }

        Ok(stats)
    }

    #[cfg(feature = "parallel")]
    fn load_relationship_file(
        &mut self,
        path: &Path,
        config: RelationshipConfig,
    ) -> Rf2Result<LoadStats> {
        self.load_relationships_parallel(path, config)
    }

    #[cfg(not(feature = "parallel"))]
    fn load_relationship_file(
        &mut self,
        path: &Path,
        config: RelationshipConfig,
    ) -> Rf2Result<LoadStats> {
        self.load_relationships(path, config)
    }

    /// Bulk inserts concepts, replacing any with the same id.
    pub fn insert_concepts(&mut self, concepts: impl IntoIterator<Item = Concept>) {
        for concept in concepts {
            self.replace_concept(concept);
        }
    }

    /// Attaches FSNs to loaded concepts.
    ///
    /// Other description types are ignored: without the language refsets
    /// there is no way to tell which synonym is preferred. Returns the number
    /// of rows whose concept is not in the store.
    pub fn insert_descriptions(&mut self, rows: impl IntoIterator<Item = DescriptionRow>) -> usize {
        let mut orphaned = 0;
        for row in rows {
            let Some(concept) = self.concepts.get_mut(&row.concept_id) else {
                orphaned += 1;
                continue;
            };
            if row.description_type() == Some(DescriptionType::Fsn) {
                concept.fsn = Some(row.term);
                self.description_count += 1;
            }
        }
        orphaned
    }

    /// Attaches relationships to their source concepts.
    ///
    /// Returns the number of relationships whose source is not in the store.
    pub fn insert_relationships(
        &mut self,
        relationships: impl IntoIterator<Item = Relationship>,
    ) -> usize {
        let mut orphaned = 0;
        for rel in relationships {
            let Some(concept) = self.concepts.get_mut(&rel.source_id) else {
                orphaned += 1;
                continue;
            };
            if is_inferred_is_a(&rel) {
                if let Some(parent) = rel.destination_id() {
                    self.children.entry(parent).or_default().push(rel.source_id);
                }
            }
            concept.add_relationship(rel);
            self.relationship_count += 1;
        }
        orphaned
    }

    /// Replaces a concept, keeping the child index in step with its inferred
    /// parents. Returns the previous version.
    pub fn replace_concept(&mut self, concept: Concept) -> Option<Concept> {
        let previous = self.concepts.remove(&concept.id);
        if let Some(ref old) = previous {
            self.relationship_count -= old.stated_relationships.len() + old.inferred_relationships.len();
            for parent in inferred_parents(old) {
                if let Some(children) = self.children.get_mut(&parent) {
                    children.retain(|&c| c != old.id);
                }
            }
        }

        for parent in inferred_parents(&concept) {
            self.children.entry(parent).or_default().push(concept.id);
        }
        self.relationship_count +=
            concept.stated_relationships.len() + concept.inferred_relationships.len();
        self.concepts.insert(concept.id, concept);
        previous
    }

    // Query methods

    /// Gets a concept by its ID.
    pub fn get_concept(&self, id: SctId) -> Option<&Concept> {
        self.concepts.get(&id)
    }

    /// Returns true if a concept exists in the store.
    pub fn has_concept(&self, id: SctId) -> bool {
        self.concepts.contains_key(&id)
    }

    /// Gets parent concepts via active inferred IS_A.
    pub fn get_parents(&self, concept_id: SctId) -> Vec<SctId> {
        self.concepts
            .get(&concept_id)
            .map(|c| c.parents(CharacteristicType::Inferred))
            .unwrap_or_default()
    }

    /// Gets child concepts via active inferred IS_A.
    pub fn get_children(&self, concept_id: SctId) -> Vec<SctId> {
        self.children.get(&concept_id).cloned().unwrap_or_default()
    }

    /// Returns the number of concepts.
    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    /// Returns the number of descriptions attached to concepts.
    pub fn description_count(&self) -> usize {
        self.description_count
    }

    /// Returns the number of relationships attached to concepts.
    pub fn relationship_count(&self) -> usize {
        self.relationship_count
    }

    /// Returns an iterator over all concepts.
    pub fn concepts(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values()
    }

    /// Returns an iterator over all concept IDs.
    pub fn concept_ids(&self) -> impl Iterator<Item = &SctId> {
        self.concepts.keys()
    }
}

fn is_inferred_is_a(rel: &Relationship) -> bool {
    rel.active && rel.is_is_a() && rel.characteristic_type == CharacteristicType::Inferred
}

fn inferred_parents(concept: &Concept) -> impl Iterator<Item = SctId> + '_ {
    concept
        .inferred_relationships
        .iter()
        .filter(|r| is_inferred_is_a(r))
        .filter_map(Relationship::destination_id)
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARALLEL PARSING HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Reads all data lines from a file after validating its header.
#[cfg(feature = "parallel")]
fn read_data_lines<T: crate::parser::Rf2Record, P: AsRef<Path>>(path: P) -> Rf2Result<Vec<String>> {
    use std::io::{BufRead, BufReader};

    let path = path.as_ref();
    if !path.exists() {
        return Err(crate::types::Rf2Error::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let mut lines = BufReader::new(std::fs::File::open(path)?).lines();
    let header = lines.next().transpose()?.unwrap_or_default();
    let header = csv::StringRecord::from(header.trim_end_matches('\r').split('\t').collect::<Vec<_>>());
    crate::parser::validate_headers(&header, T::EXPECTED_COLUMNS)?;

    lines
        .map(|line| line.map(|l| l.trim_end_matches('\r').to_string()).map_err(crate::types::Rf2Error::from))
        .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
        .collect()
}

/// Parses one tab-separated line as a record.
#[cfg(feature = "parallel")]
fn parse_line<T: crate::parser::Rf2Record>(line: &str) -> Rf2Result<T> {
    T::from_record(&csv::StringRecord::from(line.split('\t').collect::<Vec<_>>()))
}
