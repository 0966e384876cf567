//! Driver configuration, read once from the environment.

use std::path::PathBuf;

use snomed_template::TemplateFixConfig;
use snomed_types::SctId;
use thiserror::Error;

const DEFAULT_DATA_PATH: &str = "data/SnomedCT_InternationalRF2_PRODUCTION";
const DEFAULT_REPORT_PATH: &str = "remodel-report.jsonl";

/// Errors raised while reading the driver configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No template file was named.
    #[error("REMODEL_TEMPLATES must name at least one template file")]
    NoTemplates,

    /// A list entry that should be a concept id is not one.
    #[error("{var}: '{value}' is not a concept id")]
    InvalidConceptId {
        /// Environment variable holding the entry.
        var: &'static str,
        /// The offending entry.
        value: String,
    },
}

/// Everything the driver needs to run.
#[derive(Debug, Clone)]
pub struct RemodelConfig {
    /// RF2 release directory.
    pub data_path: PathBuf,
    /// Matching and exclusion settings.
    pub fix: TemplateFixConfig,
    /// Where the JSON-lines report goes.
    pub report_path: PathBuf,
    /// Report only; leave the loaded store untouched.
    pub dry_run: bool,
}

impl RemodelConfig {
    /// Reads `SNOMED_DATA_PATH`, `REMODEL_SUBHIERARCHY`, `REMODEL_TEMPLATES`,
    /// `REMODEL_EXCLUSIONS`, `REMODEL_INCLUDE_COMPLEX`, `REMODEL_REPORT_PATH`
    /// and `REMODEL_DRY_RUN`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut fix = TemplateFixConfig::default();
        if let Some(ecl) = lookup("REMODEL_SUBHIERARCHY") {
            fix.subhierarchy_ecl = ecl;
        }
        fix.template_paths = split_list(lookup("REMODEL_TEMPLATES"))
            .map(PathBuf::from)
            .collect();
        fix.exclusion_roots = split_list(lookup("REMODEL_EXCLUSIONS"))
            .map(|id| {
                id.split('|')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .parse::<SctId>()
                    .map_err(|_| ConfigError::InvalidConceptId {
                        var: "REMODEL_EXCLUSIONS",
                        value: id.clone(),
                    })
            })
            .collect::<Result<_, _>>()?;
        fix.include_complex_templates = flag(lookup("REMODEL_INCLUDE_COMPLEX"));

        if fix.template_paths.is_empty() {
            return Err(ConfigError::NoTemplates);
        }

        Ok(Self {
            data_path: lookup("SNOMED_DATA_PATH")
                .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string())
                .into(),
            fix,
            report_path: lookup("REMODEL_REPORT_PATH")
                .unwrap_or_else(|| DEFAULT_REPORT_PATH.to_string())
                .into(),
            dry_run: flag(lookup("REMODEL_DRY_RUN")),
        })
    }
}

fn split_list(value: Option<String>) -> impl Iterator<Item = String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .into_iter()
}

fn flag(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim),
        Some("1") | Some("true") | Some("yes")
    )
}
