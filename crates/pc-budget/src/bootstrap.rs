use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use budget_core::error::BudgetError;
use budget_core::settings::DEFAULT_INPUT;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use walkdir::WalkDir;

/// Spreadsheet extensions considered during input discovery.
const WORKBOOK_EXTENSIONS: [&str; 3] = ["xlsx", "xlsm", "xls"];

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a Python-style level name to a `tracing` filter directive.
///
/// Unknown names are passed through unchanged so that full `EnvFilter`
/// directives (`"budget_data=debug"`) keep working.
pub fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Logs go to stderr. When `log_file` is given, the same events are appended
/// to that file without ANSI colours.
pub fn setup_logging(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(level_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("warn"));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

// ── Input discovery ────────────────────────────────────────────────────────────

/// Decide which workbook to read.
///
/// An explicit path must exist. Without one, `DEFAULT_INPUT` in `dir` is
/// used when present, otherwise the best candidate found by
/// [`discover_workbook`].
pub fn resolve_input_path(
    explicit: Option<&Path>,
    output: &Path,
    dir: &Path,
) -> Result<PathBuf, BudgetError> {
    if let Some(path) = explicit {
        return if path.exists() {
            Ok(path.to_path_buf())
        } else {
            Err(BudgetError::FileNotFound(path.to_path_buf()))
        };
    }

    let default = dir.join(DEFAULT_INPUT);
    if default.exists() {
        return Ok(default);
    }

    match discover_workbook(dir, output) {
        Some(found) => {
            info!("Auto-selected input workbook {}", found.display());
            Ok(found)
        }
        None => Err(BudgetError::FileNotFound(default)),
    }
}

/// Scan `dir` (not recursively) for a spreadsheet to use as input.
///
/// Lock files (`~$…`) and the output workbook are skipped. Names containing
/// `template` or `monthly` win; otherwise the first name in sort order.
pub fn discover_workbook(dir: &Path, output: &Path) -> Option<PathBuf> {
    let output_name = output.file_name();

    let candidates: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            let is_workbook = entry
                .path()
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| WORKBOOK_EXTENSIONS.contains(&ext.as_str()));
            is_workbook && !name.starts_with('~') && Some(entry.file_name()) != output_name
        })
        .map(|entry| entry.into_path())
        .collect();

    debug!("Input candidates in {}: {:?}", dir.display(), candidates);

    let preferred = candidates.iter().find(|path| {
        path.file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .is_some_and(|n| n.contains("template") || n.contains("monthly"))
    });
    preferred.or(candidates.first()).cloned()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
