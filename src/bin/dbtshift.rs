//! dbtshift: PostgreSQL to Snowflake translation for dbt models
//!
//! # Usage
//!
//! ```bash
//! # Translate a directory of report queries into ./models
//! dbtshift translate reports/ --out models
//!
//! # Machine-readable report on stdout
//! dbtshift translate reports/visits.sql --format json
//!
//! # Tables a block file creates
//! dbtshift tables reports/blocks/base.sql
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use serde::Serialize;

use dbtshift::discover::{SourceFile, discover};
use dbtshift::prelude::*;

#[derive(Parser)]
#[command(name = "dbtshift")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Translate PostgreSQL report queries into Snowflake dbt models", long_about = None)]
#[command(after_help = "EXAMPLES:
    dbtshift translate reports/ --out models
    dbtshift translate q.sql --format json
    dbtshift tables reports/blocks/base.sql
    dbtshift catalog")]
struct Cli {
    /// Config file (default: ./dbtshift.toml, then the user config directory)
    #[arg(short, long, global = true, env = "DBTSHIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Sql,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliDialect {
    Postgres,
    Snowflake,
}

impl From<CliDialect> for Dialect {
    fn from(val: CliDialect) -> Self {
        match val {
            CliDialect::Postgres => Dialect::Postgres,
            CliDialect::Snowflake => Dialect::Snowflake,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Translate .sql files or directories
    Translate {
        /// Files or directories to translate
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write translated files into this directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "sql")]
        format: OutputFormat,

        /// Source dialect (overrides the config file)
        #[arg(long, value_enum)]
        from: Option<CliDialect>,

        /// Target dialect (overrides the config file)
        #[arg(long, value_enum)]
        to: Option<CliDialect>,
    },
    /// List the tables a file creates (`name AS (`)
    Tables { file: PathBuf },
    /// Show the effective external table catalog
    Catalog,
}

/// One entry of the JSON report.
#[derive(Serialize)]
struct FileReport<'a> {
    path: String,
    kind: UnitKind,
    #[serde(flatten)]
    translation: &'a Translation,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "dbtshift=debug" } else { "dbtshift=info" };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        level
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into()),
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns `false` when any unit was degraded.
fn run(cli: Cli) -> Result<bool> {
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Translate {
            paths,
            out,
            format,
            from,
            to,
        } => {
            if let Some(dialect) = from {
                config.source_dialect = dialect.into();
            }
            if let Some(dialect) = to {
                config.target_dialect = dialect.into();
            }
            translate_paths(&config, &paths, out.as_deref(), format)
        }
        Commands::Tables { file } => {
            show_tables(&config, &file)?;
            Ok(true)
        }
        Commands::Catalog => {
            show_catalog(&config);
            Ok(true)
        }
    }
}

fn translate_paths(
    config: &Config,
    paths: &[PathBuf],
    out: Option<&Path>,
    format: OutputFormat,
) -> Result<bool> {
    let discovery = discover(paths, config);
    for skipped in &discovery.skipped {
        eprintln!("{} {} (ignored keyword)", "SKIPPED".yellow(), skipped.display());
    }
    if discovery.files.is_empty() {
        eprintln!("{}", "No .sql files found.".yellow());
        return Ok(true);
    }

    let mut ok = true;
    let mut files: Vec<&SourceFile> = Vec::new();
    let mut units = Vec::new();
    for file in &discovery.files {
        match file.load() {
            Ok(unit) => {
                files.push(file);
                units.push(unit);
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.path.display(), e);
                ok = false;
            }
        }
    }

    eprintln!(
        "{} {} file(s), {} block(s), {} → {}",
        "Translating".cyan().bold(),
        units.len(),
        discovery.blocks().count(),
        config.source_dialect,
        config.target_dialect
    );

    let translator = Translator::new(config);
    let results = translator.translate_batch(&units);

    let targets = match out {
        Some(dir) => Some(output_paths(dir, paths, &files)?),
        None => None,
    };

    for (i, (file, translation)) in files.iter().zip(&results).enumerate() {
        print_status(&file.path, translation);
        ok &= !translation.is_degraded();

        if let Some(targets) = &targets {
            let target = &targets[i];
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(target, format!("{}\n", translation.sql))
                .with_context(|| format!("writing {}", target.display()))?;
        } else if matches!(format, OutputFormat::Sql) {
            println!("-- {}", file.path.display());
            println!("{}\n", translation.sql);
        }
    }

    if matches!(format, OutputFormat::Json) {
        let report: Vec<FileReport> = files
            .iter()
            .zip(&results)
            .map(|(file, translation)| FileReport {
                path: file.path.display().to_string(),
                kind: file.kind,
                translation,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let degraded = results.iter().filter(|t| t.is_degraded()).count();
    if degraded == 0 {
        eprintln!("{} {} file(s) translated", "✓".green(), results.len());
    } else {
        eprintln!(
            "{} {} of {} file(s) degraded",
            "⚠".yellow(),
            degraded,
            results.len()
        );
    }
    Ok(ok)
}

/// Output file for each input, keeping its path below the input root it was
/// found under. Two inputs mapping to the same output is an error.
fn output_paths(dir: &Path, roots: &[PathBuf], files: &[&SourceFile]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut targets = Vec::with_capacity(files.len());

    for file in files {
        let relative = roots
            .iter()
            .filter(|root| root.is_dir())
            .find_map(|root| file.path.strip_prefix(root).ok())
            .map(Path::to_path_buf)
            .or_else(|| file.path.file_name().map(PathBuf::from))
            .with_context(|| format!("no file name in {}", file.path.display()))?;

        let target = dir.join(relative);
        if !seen.insert(target.clone()) {
            bail!(
                "{} would overwrite another translated file at {}",
                file.path.display(),
                target.display()
            );
        }
        targets.push(target);
    }
    Ok(targets)
}

fn print_status(path: &Path, translation: &Translation) {
    let (mark, label) = match translation.outcome {
        Outcome::Translated => ("✓".green(), "".normal()),
        Outcome::Placeholder => ("⚠".yellow(), " (placeholder)".yellow()),
        Outcome::Passthrough => ("✗".red(), " (unchanged)".red()),
    };
    eprintln!("{} {}{}", mark, path.display(), label);
    for diagnostic in &translation.diagnostics {
        eprintln!("    {} {}", diagnostic.code.dimmed(), diagnostic.message);
    }
}

fn show_tables(config: &Config, file: &Path) -> Result<()> {
    let sql = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let translation = Translator::new(config).translate(&sql);
    let tables = produced_tables(&translation.sql);

    if tables.is_empty() {
        println!("{}", "No tables created.".yellow());
        return Ok(());
    }
    println!("{}", format!("Tables created by {}:", file.display()).cyan().bold());
    for table in tables {
        println!("  {}", table.green());
    }
    Ok(())
}

fn show_catalog(config: &Config) {
    let catalog = config.catalog();
    println!("{} {}", "Schema:".cyan().bold(), catalog.schema());
    for table in catalog.tables() {
        println!("  {} → {}", table.green(), catalog.qualify(table).dimmed());
    }
}
