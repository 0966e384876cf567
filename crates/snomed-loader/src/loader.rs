//! RF2 release discovery.

use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{Rf2Error, Rf2Files, Rf2Result};

/// Discovers the snapshot files of a SNOMED CT release directory.
///
/// `path` may be the release root, its `Snapshot` directory, the
/// `Terminology` directory itself, or a directory one level above a release.
/// Fails when any of the concept, description, inferred or stated
/// relationship files is missing.
pub fn discover_rf2_files<P: AsRef<Path>>(path: P) -> Rf2Result<Rf2Files> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Rf2Error::DirectoryNotFound {
            path: path.display().to_string(),
        });
    }

    let terminology_dir = find_terminology_dir(path)?;
    let mut files = Rf2Files::new();

    for entry in fs::read_dir(&terminology_dir)? {
        let entry = entry?;
        let filename = entry.file_name();
        let filename = filename.to_string_lossy();

        if !filename.ends_with(".txt") {
            continue;
        }

        let slot = match snapshot_kind(&filename) {
            Some(SnapshotKind::Concept) => {
                files.release_date = extract_release_date(&filename);
                &mut files.concept_file
            }
            Some(SnapshotKind::Description) => &mut files.description_file,
            Some(SnapshotKind::Relationship) => &mut files.relationship_file,
            Some(SnapshotKind::StatedRelationship) => &mut files.stated_relationship_file,
            None => continue,
        };
        *slot = Some(entry.path());
    }

    if !files.has_required_files() {
        return Err(Rf2Error::RequiredFileMissing {
            file_type: files.missing_files().join(", "),
            directory: terminology_dir.display().to_string(),
        });
    }

    Ok(files)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapshotKind {
    Concept,
    Description,
    Relationship,
    StatedRelationship,
}

fn snapshot_kind(filename: &str) -> Option<SnapshotKind> {
    // sct2_RelationshipConcreteValues_Snapshot shares the Relationship prefix.
    if filename.starts_with("sct2_Concept_Snapshot") {
        Some(SnapshotKind::Concept)
    } else if filename.starts_with("sct2_Description_Snapshot") {
        Some(SnapshotKind::Description)
    } else if filename.starts_with("sct2_Relationship_Snapshot") {
        Some(SnapshotKind::Relationship)
    } else if filename.starts_with("sct2_StatedRelationship_Snapshot") {
        Some(SnapshotKind::StatedRelationship)
    } else {
        None
    }
}

/// Finds the Terminology directory within an RF2 release structure.
fn find_terminology_dir(base: &Path) -> Rf2Result<PathBuf> {
    if base.ends_with("Terminology") && base.is_dir() {
        return Ok(base.to_path_buf());
    }

    let candidates = |dir: &Path| [dir.join("Snapshot").join("Terminology"), dir.join("Terminology")];

    if let Some(found) = candidates(base).into_iter().find(|p| p.is_dir()) {
        return Ok(found);
    }

    for entry in fs::read_dir(base)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Some(found) = candidates(&entry.path()).into_iter().find(|p| p.is_dir()) {
                return Ok(found);
            }
        }
    }

    Err(Rf2Error::DirectoryNotFound {
        path: format!("Terminology directory not found in {}", base.display()),
    })
}

/// Extracts release date from RF2 filename.
///
/// RF2 files have names like `sct2_Concept_Snapshot_INT_20251201.txt`
fn extract_release_date(filename: &str) -> Option<String> {
    filename
        .trim_end_matches(".txt")
        .rsplit('_')
        .next()
        .filter(|last| last.len() == 8 && last.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "snomed-loader-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_extract_release_date() {
        assert_eq!(
            extract_release_date("sct2_Concept_Snapshot_INT_20251201.txt"),
            Some("20251201".to_string())
        );
        assert_eq!(
            extract_release_date("sct2_Description_Snapshot-en_INT_20251201.txt"),
            Some("20251201".to_string())
        );
        assert_eq!(extract_release_date("invalid_filename.txt"), None);
    }

    #[test]
    fn test_snapshot_kind() {
        assert_eq!(
            snapshot_kind("sct2_StatedRelationship_Snapshot_INT_20251201.txt"),
            Some(SnapshotKind::StatedRelationship)
        );
        assert_eq!(
            snapshot_kind("sct2_RelationshipConcreteValues_Snapshot_INT_20251201.txt"),
            None
        );
        assert_eq!(snapshot_kind("der2_cRefset_Snapshot.txt"), None);
    }

    #[test]
    fn test_discover_release_layout() {
        let root = scratch_dir("discover");
        let terminology = root.join("Release").join("Snapshot").join("Terminology");
        fs::create_dir_all(&terminology).unwrap();
        for name in [
            "sct2_Concept_Snapshot_INT_20250101.txt",
            "sct2_Description_Snapshot-en_INT_20250101.txt",
            "sct2_Relationship_Snapshot_INT_20250101.txt",
            "sct2_StatedRelationship_Snapshot_INT_20250101.txt",
        ] {
            fs::write(terminology.join(name), "").unwrap();
        }

        let files = discover_rf2_files(&root).unwrap();
        assert!(files.has_required_files());
        assert_eq!(files.release_date.as_deref(), Some("20250101"));

        fs::remove_file(terminology.join("sct2_StatedRelationship_Snapshot_INT_20250101.txt"))
            .unwrap();
        assert!(matches!(
            discover_rf2_files(&root),
            Err(Rf2Error::RequiredFileMissing { .. })
        ));

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_directory() {
        assert!(matches!(
            discover_rf2_files("/definitely/not/a/release"),
            Err(Rf2Error::DirectoryNotFound { .. })
        ));
    }
}
