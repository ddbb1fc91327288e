mod display;

use std::path::{Path, PathBuf};

use anyhow::Context;
use brevvalg_core::{
    Compactor, DocumentSelector, IssuedDecision, Query, StaticCatalog, Vocabulary, ingest,
};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "brevvalg", version, about = "Letter-code decision table")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a legacy letter export into a compacted table.
    Compact {
        /// Export file (.json or .csv).
        #[arg(long, env = "BREVVALG_INPUT")]
        input: PathBuf,
        /// Where to write the compacted table.
        #[arg(long, env = "BREVVALG_TABLE")]
        output: PathBuf,
        /// JSON overlay adding or overriding vocabulary entries.
        #[arg(long, env = "BREVVALG_VOCABULARY")]
        vocabulary: Option<PathBuf>,
    },
    /// Select letters for a case context.
    Select {
        #[arg(long, env = "BREVVALG_TABLE")]
        table: PathBuf,
        #[arg(long, env = "BREVVALG_CATALOG")]
        catalog: Option<PathBuf>,
        #[arg(long)]
        behavior: Option<String>,
        #[arg(long)]
        application_type: Option<String>,
        #[arg(long)]
        verdict: Option<String>,
        #[arg(long)]
        origin: Option<String>,
        /// Issued decision; omit when no decision has been issued.
        #[arg(long, value_enum)]
        decision: Option<Decision>,
        #[arg(long)]
        non_recovery: Option<bool>,
        /// Caller enhet, used for appeals-unit letters.
        #[arg(long, env = "BREVVALG_ENHET")]
        enhet: Option<String>,
        /// Print the selection as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show bucket counts and a card per rule.
    Inspect {
        #[arg(long, env = "BREVVALG_TABLE")]
        table: PathBuf,
        /// Only show this behavior type.
        #[arg(long)]
        behavior: Option<String>,
    },
    /// List the manual patches applied after compaction.
    Patches,
}

#[derive(Clone, Copy, ValueEnum)]
enum Decision {
    Manual,
    Calculated,
}

impl From<Decision> for IssuedDecision {
    fn from(d: Decision) -> Self {
        match d {
            Decision::Manual => IssuedDecision::Manual,
            Decision::Calculated => IssuedDecision::Calculated,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::debug!("brevvalg v{}", env!("CARGO_PKG_VERSION"));

    match Cli::parse().command {
        Command::Compact {
            input,
            output,
            vocabulary,
        } => run_compact(&input, &output, vocabulary.as_deref()),
        Command::Select {
            table,
            catalog,
            behavior,
            application_type,
            verdict,
            origin,
            decision,
            non_recovery,
            enhet,
            json,
        } => {
            let query = Query {
                behavior_type: behavior,
                application_type,
                verdict_type: verdict,
                application_origin: origin,
                decision: decision.map(Into::into),
                is_non_recovery_decision: non_recovery,
            };
            run_select(&table, catalog.as_deref(), &query, enhet.as_deref(), json)
        }
        Command::Inspect { table, behavior } => {
            let table = brevvalg_store::read_table(&table)
                .with_context(|| format!("reading table {}", table.display()))?;
            display::print_table(&table, behavior.as_deref());
            Ok(())
        }
        Command::Patches => {
            for patch in Compactor::standard().patches() {
                display::print_patch(patch);
            }
            Ok(())
        }
    }
}

fn run_compact(input: &Path, output: &Path, overlay: Option<&Path>) -> anyhow::Result<()> {
    let mut vocabulary = Vocabulary::standard();
    if let Some(path) = overlay {
        let overlay = brevvalg_store::load_vocabulary_overlay(path)
            .with_context(|| format!("reading vocabulary overlay {}", path.display()))?;
        vocabulary = vocabulary.with_overlay(overlay);
    }

    let rows = brevvalg_store::read_export(input)
        .with_context(|| format!("reading export {}", input.display()))?;
    let ingested = ingest::ingest(&rows, &vocabulary);
    display::print_report(&ingested.report);

    let table = Compactor::standard().compact(ingested.groups);
    brevvalg_store::write_table(output, &table)
        .with_context(|| format!("writing table {}", output.display()))?;

    eprintln!(
        "  Wrote {} rules in {} buckets to {}",
        table.rule_count(),
        table.len(),
        output.display()
    );
    Ok(())
}

fn run_select(
    table: &Path,
    catalog: Option<&Path>,
    query: &Query,
    enhet: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let table = brevvalg_store::read_table(table)
        .with_context(|| format!("reading table {}", table.display()))?;
    let catalog = match catalog {
        Some(path) => brevvalg_store::load_catalog(path)
            .with_context(|| format!("reading catalog {}", path.display()))?,
        None => StaticCatalog::default(),
    };

    let selector = DocumentSelector::new(table, catalog);
    let options = selector.select(query, enhet);
    if json {
        println!("{}", serde_json::to_string_pretty(&options)?);
    } else {
        display::print_options(&options);
    }
    Ok(())
}
