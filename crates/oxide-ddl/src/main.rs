//! oxide-ddl CLI
//!
//! Generates migration SQL from two schema snapshots.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_ddl_core::prelude::*;

/// Marker placed between statements for migration runners that split files.
const BREAKPOINT: &str = "--> statement-breakpoint";

/// Generate dialect-correct migration SQL from two schema snapshots.
#[derive(Parser)]
#[command(name = "oxide-ddl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true, env = "OXIDE_DDL_VERBOSE")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diff two snapshots and print the migration.
    Generate {
        /// Snapshot to migrate from. Omit or leave empty to start from an
        /// empty schema.
        #[arg(long, env = "OXIDE_DDL_FROM")]
        from: Option<PathBuf>,

        /// Snapshot to migrate to.
        #[arg(long, env = "OXIDE_DDL_TO")]
        to: PathBuf,

        /// Rename or move hint, `FROM->TO` (repeatable).
        #[arg(
            long = "rename",
            value_name = "FROM->TO",
            env = "OXIDE_DDL_RENAMES",
            value_delimiter = ','
        )]
        renames: Vec<String>,

        /// The source snapshot was introspected from a live database.
        #[arg(long, env = "OXIDE_DDL_PUSH")]
        push: bool,

        /// Fail instead of recreating views the dialect cannot rename.
        #[arg(long, env = "OXIDE_DDL_STRICT_RENAMES")]
        strict_renames: bool,

        /// Drop and create renamed unique constraints instead of renaming them.
        #[arg(long, env = "OXIDE_DDL_LEGACY_CONSTRAINTS")]
        legacy_constraints: bool,

        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Sql, env = "OXIDE_DDL_FORMAT")]
        format: Format,

        /// Separate SQL statements with breakpoint markers.
        #[arg(long, env = "OXIDE_DDL_BREAKPOINTS")]
        breakpoints: bool,
    },

    /// Validate a snapshot.
    Check {
        /// Snapshot file.
        snapshot: PathBuf,
    },

    /// Render a persisted statement journal.
    Render {
        /// Journal file: a JSON array of statements, or the output of
        /// `generate --format json`.
        journal: PathBuf,

        /// Target dialect. Defaults to the journal's own.
        #[arg(short, long, env = "OXIDE_DDL_DIALECT")]
        dialect: Option<String>,

        /// Separate SQL statements with breakpoint markers.
        #[arg(long, env = "OXIDE_DDL_BREAKPOINTS")]
        breakpoints: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// One SQL statement per line.
    Sql,
    /// Statement journal with the rename metadata.
    Json,
}

/// `generate --format json` output.
#[derive(Serialize)]
struct JournalEntry<'a> {
    dialect: Dialect,
    statements: &'a [Statement],
    warnings: Vec<String>,
    #[serde(rename = "_meta")]
    meta: &'a Meta,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Generate {
            from,
            to,
            renames,
            push,
            strict_renames,
            legacy_constraints,
            format,
            breakpoints,
        } => {
            let mut options = DiffOptions::new().legacy_constraint_recreate(legacy_constraints);
            if push {
                options = options.push();
            }
            if strict_renames {
                options = options.view_rename_fallback(ViewRenameFallback::Fail);
            }
            generate(from, &to, &renames, &options, format, breakpoints)?;
        }

        Commands::Check { snapshot } => {
            let parsed = read_snapshot(&snapshot)?;
            parsed
                .validate()
                .with_context(|| format!("Invalid snapshot {}", snapshot.display()))?;
            println!(
                "{}: valid {} snapshot (version {}, {} tables)",
                snapshot.display(),
                parsed.dialect,
                parsed.version,
                parsed.tables.len()
            );
        }

        Commands::Render {
            journal,
            dialect,
            breakpoints,
        } => {
            let (recorded, statements) = read_journal(&journal)?;
            let dialect = match (dialect, recorded) {
                (Some(name), _) => name.parse::<Dialect>()?,
                (None, Some(recorded)) => recorded,
                (None, None) => bail!(
                    "{} does not record a dialect, pass --dialect",
                    journal.display()
                ),
            };
            let sql = render_all(dialect.renderer().as_ref(), &statements)
                .with_context(|| format!("Failed to render {} for {dialect}", journal.display()))?;
            print_sql(&sql, breakpoints);
        }
    }

    Ok(())
}

fn generate(
    from: Option<PathBuf>,
    to: &Path,
    renames: &[String],
    options: &DiffOptions,
    format: Format,
    breakpoints: bool,
) -> anyhow::Result<()> {
    let to_snapshot = read_snapshot(to)?;
    let from_snapshot = match from.filter(|p| !p.as_os_str().is_empty()) {
        Some(path) => read_snapshot(&path)?,
        None => {
            debug!("no source snapshot, starting from an empty schema");
            Snapshot::empty(to_snapshot.dialect)
        }
    };

    let mut resolver = HintResolver::new(renames).context("Failed to parse rename hints")?;
    let plan = diff(&from_snapshot, &to_snapshot, &mut resolver, options)
        .context("Failed to diff snapshots")?;
    info!(
        dialect = %plan.dialect,
        statements = plan.statements.len(),
        warnings = plan.warnings.len(),
        "migration generated"
    );

    match format {
        Format::Sql => {
            let sql = plan.to_sql().context("Failed to render SQL")?;
            print_sql(&sql, breakpoints);
        }
        Format::Json => {
            let entry = JournalEntry {
                dialect: plan.dialect,
                statements: &plan.statements,
                warnings: plan.warnings.iter().map(ToString::to_string).collect(),
                meta: &plan.meta,
            };
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
    }
    Ok(())
}

fn read_snapshot(path: &Path) -> anyhow::Result<Snapshot> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    Snapshot::from_json(&json)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))
}

/// Reads a journal and the dialect it records, if any.
fn read_journal(path: &Path) -> anyhow::Result<(Option<Dialect>, Vec<Statement>)> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read journal {}", path.display()))?;
    let parse_error = || format!("Failed to parse journal {}", path.display());

    let value: serde_json::Value = serde_json::from_str(&json).with_context(parse_error)?;
    match value {
        serde_json::Value::Object(mut entry) => {
            let dialect: Option<Dialect> = entry
                .remove("dialect")
                .map(serde_json::from_value)
                .transpose()
                .with_context(parse_error)?;
            let statements = entry
                .remove("statements")
                .context("Journal object has no statements")?;
            let statements: Vec<Statement> =
                serde_json::from_value(statements).with_context(parse_error)?;
            Ok((dialect, statements))
        }
        _ => Ok((None, Statement::journal_from_json(&json).with_context(parse_error)?)),
    }
}

fn print_sql(sql: &[String], breakpoints: bool) {
    if breakpoints {
        println!("{}", sql.join(&format!("\n{BREAKPOINT}\n")));
    } else {
        for statement in sql {
            println!("{statement}");
        }
    }
}
