//! SNOMED CT role-group remodeling batch driver.

mod config;

use std::fs::File;
use std::io::BufWriter;

use snomed_loader::{discover_rf2_files, SnomedStore};
use snomed_template::{GroupRemodel, MemoryReport, ReportActionType, TemplateFix, TracingReport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::RemodelConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = RemodelConfig::from_env()?;
    tracing::info!("Loading SNOMED CT data from: {}", config.data_path.display());

    let files = discover_rf2_files(&config.data_path)?;
    tracing::info!("Discovered RF2 files: {:?}", files.release_date);

    let mut store = SnomedStore::new();
    let [concepts, descriptions, inferred, stated] = store.load_all(&files)?;
    tracing::info!(
        "Loaded {} concepts, {} descriptions, {} inferred and {} stated relationships",
        concepts.loaded,
        descriptions.loaded,
        inferred.loaded,
        stated.loaded
    );

    let (summary, report) = {
        let mut remodel = GroupRemodel::new(TemplateFix::new(&store, config.fix.clone()));
        remodel.init()?;
        remodel.post_init()?;

        let mut sink = (MemoryReport::new(), TracingReport);
        let summary = remodel.run_batch(&mut sink)?;
        (summary, sink.0)
    };

    let writer = BufWriter::new(File::create(&config.report_path)?);
    report.write_json_lines(writer)?;
    tracing::info!(
        "Wrote {} report rows ({} remodelled, {} validation errors) to {}",
        report.rows().len(),
        report.count(ReportActionType::Remodelled),
        report.count(ReportActionType::ValidationError),
        config.report_path.display()
    );

    if config.dry_run {
        tracing::info!("Dry run: {} remodelled concepts not applied", summary.remodelled.len());
        return Ok(());
    }

    let applied = summary.remodelled.len();
    for concept in summary.remodelled {
        store.replace_concept(concept);
    }
    tracing::info!(
        "Applied {} remodelled concepts; store now holds {} relationships",
        applied,
        store.relationship_count()
    );

    Ok(())
}
