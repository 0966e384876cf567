//! # snomed-loader
//!
//! Loads a SNOMED CT RF2 snapshot (concepts, descriptions, inferred and
//! stated relationships) into an in-memory [`SnomedStore`].
//!
//! ## Features
//!
//! - `parallel` (default): parses relationship files with rayon.
//!
//! ## Usage
//!
//! ```ignore
//! use snomed_loader::{discover_rf2_files, SnomedStore};
//!
//! let files = discover_rf2_files("/path/to/SnomedCT_InternationalRF2")?;
//! let mut store = SnomedStore::new();
//! let [concepts, descriptions, inferred, stated] = store.load_all(&files)?;
//! println!("{} concepts", concepts.loaded);
//! ```

#![warn(missing_docs)]

mod concept;
mod description;
mod loader;
pub mod parser;
mod relationship;
mod store;
mod types;

pub use description::DescriptionRow;
pub use loader::discover_rf2_files;
pub use parser::{Rf2Parser, Rf2Record};
pub use relationship::RelationshipRow;
pub use store::SnomedStore;
pub use types::{
    DescriptionConfig, LoadStats, RelationshipConfig, Rf2Config, Rf2Error, Rf2Files, Rf2Result,
};

// Re-export snomed-types for convenience
pub use snomed_types;
