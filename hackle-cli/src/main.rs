use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use hackle_analyzer::{
    analyze_units, AnalysisConfig, Diagnostic, DiagnosticLevel, SourceFile, SourceMap, SourceUnit,
};
use pathdiff::diff_paths;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use walkdir::WalkDir;

const DEFAULT_CONFIG: &str = "hackle.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "hackle",
    version,
    about = "Analyze PHP syntax trees for type and reference errors.",
    long_about = "Analyze PHP programs supplied as JSON syntax-tree documents. \
                  Directories are searched recursively for *.json files."
)]
struct Cli {
    /// JSON syntax-tree documents or directories containing them.
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Configuration file (defaults to ./hackle.toml when present).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Skip speculative re-analysis of callees.
    #[arg(long, action = ArgAction::SetTrue)]
    quick: bool,

    /// Warn about expressions PHP 5 and PHP 7 evaluate differently.
    #[arg(long = "backward-compat", action = ArgAction::SetTrue)]
    backward_compat: bool,

    /// Output format for diagnostics.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Log analysis decisions to stderr.
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mut config = load_config(cli.config.as_deref())?;
    if cli.quick {
        config = config.quick(true);
    }
    if cli.backward_compat {
        config = config.backward_compatible(true);
    }
    tracing::debug!(?config, "configuration loaded");

    let mut paths = BTreeSet::new();
    for input in &cli.inputs {
        collect_inputs(input, &mut paths)?;
    }
    if paths.is_empty() {
        bail!("no JSON syntax-tree documents found");
    }

    let mut units = Vec::new();
    let mut sources = SourceMap::new();
    for path in &paths {
        let unit = load_unit(path)?;
        if let Some(source) = load_source(&unit) {
            sources.insert(unit.path.clone(), source);
        }
        units.push(unit);
    }

    let analysis = analyze_units(&units, config, &sources)
        .context("failed to collect declarations")?;
    let diagnostics = analysis.diagnostics;

    match cli.format {
        Format::Json => {
            let rendered = serde_json::to_string_pretty(diagnostics.entries())
                .context("failed to render diagnostics")?;
            println!("{rendered}");
        }
        Format::Text => {
            for diagnostic in diagnostics.entries() {
                print_diagnostic(&sources, diagnostic);
            }
        }
    }

    if diagnostics.has_errors() {
        let errors = diagnostics
            .entries()
            .iter()
            .filter(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
            .count();
        bail!("analysis found {} error(s)", errors);
    }
    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::new("debug"),
        Err(_) => EnvFilter::new("warn"),
    };

    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .context("failed to initialize logging")?;
    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<AnalysisConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = env::current_dir()
                .context("failed to determine current directory")?
                .join(DEFAULT_CONFIG);
            if !default.is_file() {
                return Ok(AnalysisConfig::default());
            }
            default
        }
    };
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("invalid configuration in {}", path.display()))
}

fn collect_inputs(path: &Path, targets: &mut BTreeSet<PathBuf>) -> Result<()> {
    let metadata =
        fs::metadata(path).with_context(|| format!("failed to access {}", path.display()))?;
    if metadata.is_file() {
        targets.insert(path.to_path_buf());
        return Ok(());
    }
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("failed to walk directory {}", path.display()))?;
        let is_json = entry.path().extension().and_then(|ext| ext.to_str()) == Some("json");
        if entry.file_type().is_file() && is_json {
            targets.insert(entry.into_path());
        }
    }
    Ok(())
}

fn load_unit(path: &Path) -> Result<SourceUnit> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    SourceUnit::from_json(&contents).with_context(|| format!("failed to load {}", path.display()))
}

/// Source text for a unit: the file at `path` when it exists, else the
/// document's embedded `source`.
fn load_source(unit: &SourceUnit) -> Option<SourceFile> {
    let path = PathBuf::from(&unit.path);
    match fs::read_to_string(&path) {
        Ok(contents) => Some(SourceFile::new(path, contents)),
        Err(_) => unit
            .source
            .clone()
            .map(|contents| SourceFile::new(path, contents)),
    }
}

/// Absolute paths are shown relative to the current directory.
fn display_path(path: &str) -> String {
    let path = Path::new(path);
    if !path.is_absolute() {
        return path.display().to_string();
    }
    env::current_dir()
        .ok()
        .and_then(|cwd| diff_paths(path, cwd))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

fn print_diagnostic(sources: &SourceMap, diagnostic: &Diagnostic) {
    let (level_label, level_marker) = match diagnostic.level {
        DiagnosticLevel::Error => ("error", "  -"),
        DiagnosticLevel::Warning => ("warning", "  ~"),
    };
    eprintln!(
        "{} {}[{}]: {}",
        level_marker, level_label, diagnostic.kind, diagnostic.message
    );
    eprintln!("     --> {}:{}", display_path(&diagnostic.file), diagnostic.line);
    if let Some(raw_line) = sources
        .get(&diagnostic.file)
        .and_then(|source| source.line(diagnostic.line))
    {
        eprintln!("      {}", raw_line.replace('\t', "    "));
    }
}
