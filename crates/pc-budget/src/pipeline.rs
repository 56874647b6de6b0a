//! The calculator run: load, aggregate, report.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use budget_core::columns::HeaderAliases;
use budget_core::error::BudgetError;
use budget_core::settings::{OutputFormat, Settings};
use budget_data::analysis::analyze_budget;
use budget_data::reader::load_workbook;
use budget_report::console::ConsoleReporter;
use budget_report::themes::Theme;
use budget_report::workbook::{build_workbook, save_atomic, SHEET_NAMES};
use tracing::info;

use crate::bootstrap;

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub models: usize,
    pub warning_count: usize,
}

/// Run the calculator against the current directory, printing to stdout.
pub fn run(settings: &Settings) -> anyhow::Result<RunSummary> {
    let mut reporter =
        ConsoleReporter::stdout(Theme::from_name(&settings.theme), settings.no_color);
    execute(settings, Path::new("."), &mut reporter)
}

/// Run the calculator, discovering the input in `search_dir` when none is
/// given.
///
/// The output workbook is only touched after every stage has succeeded.
pub fn execute<W: Write>(
    settings: &Settings,
    search_dir: &Path,
    reporter: &mut ConsoleReporter<W>,
) -> anyhow::Result<RunSummary> {
    let aliases = match &settings.aliases {
        Some(path) => HeaderAliases::load(path)
            .with_context(|| format!("invalid alias file {}", path.display()))?,
        None => HeaderAliases::default(),
    };

    let input =
        bootstrap::resolve_input_path(settings.input.as_deref(), &settings.output, search_dir)?;
    info!("Reading {}", input.display());

    let loaded = load_workbook(&input, &aliases)?;
    let report = analyze_budget(loaded);
    let workbook = build_workbook(&report)?;

    match settings.format {
        OutputFormat::Table => {
            let today = chrono::Local::now().date_naive();
            reporter.print_report(&report, &input, today)?;
        }
        OutputFormat::Json => reporter.print_json(&report)?,
    }

    save_atomic(&settings.output, &workbook)
        .with_context(|| format!("cannot write {}", settings.output.display()))?;
    info!("Results written to {}", settings.output.display());

    if settings.format == OutputFormat::Table {
        reporter.print_sheets_written(&settings.output, &SHEET_NAMES)?;
    }

    Ok(RunSummary {
        input,
        output: settings.output.clone(),
        models: report.net_records.len(),
        warning_count: report.warning_count,
    })
}

/// Process exit code for a failed run: the code of the first
/// [`BudgetError`] in the chain, 1 otherwise.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<BudgetError>())
        .map_or(1, BudgetError::exit_code)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::TempDir;

    const MONTH_HEADERS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    enum Cell<'a> {
        Text(&'a str),
        Num(f64),
    }

    fn write_book(path: &Path, sheets: &[(&str, Vec<Vec<Cell>>)]) {
        let mut book = Workbook::new();
        for (name, rows) in sheets {
            let sheet = book.add_worksheet().set_name(*name).unwrap();
            for (r, row) in rows.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    match cell {
                        Cell::Text(t) => sheet.write_string(r as u32, c as u16, *t).unwrap(),
                        Cell::Num(n) => sheet.write_number(r as u32, c as u16, *n).unwrap(),
                    };
                }
            }
        }
        book.save(path).unwrap();
    }

    fn budget_sheet<'a>(rows: &[(&'a str, f64, [f64; 12])]) -> Vec<Vec<Cell<'a>>> {
        let mut header = vec![Cell::Text("PC Model"), Cell::Text("Unit Price")];
        header.extend(MONTH_HEADERS.iter().map(|m| Cell::Text(*m)));
        let mut out = vec![header];
        for (model, price, qty) in rows {
            let mut row = vec![Cell::Text(*model), Cell::Num(*price)];
            row.extend(qty.iter().map(|q| Cell::Num(*q)));
            out.push(row);
        }
        out
    }

    fn settings(args: &[&str]) -> Settings {
        let mut full = vec!["pc-budget"];
        full.extend_from_slice(args);
        Settings::load_from(full).expect("parse settings")
    }

    fn quiet_reporter() -> ConsoleReporter<Vec<u8>> {
        ConsoleReporter::new(Vec::new(), Theme::dark(), false)
    }

    fn dell_workbook(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        write_book(
            &path,
            &[
                (
                    "1. Rental PC",
                    budget_sheet(&[(
                        "Dell Latitude",
                        2500.0,
                        [50.0, 50.0, 45.0, 45.0, 45.0, 45.0, 45.0, 45.0, 45.0, 45.0, 45.0, 45.0],
                    )]),
                ),
                (
                    "2. Returning PC",
                    budget_sheet(&[(
                        "Dell Latitude",
                        2500.0,
                        [0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                    )]),
                ),
            ],
        );
        path
    }

    // ── execute ───────────────────────────────────────────────────────────────

    #[test]
    fn test_execute_writes_output_and_prints_tables() {
        let tmp = TempDir::new().expect("tempdir");
        let input = dell_workbook(tmp.path(), "budget.xlsx");
        let output = tmp.path().join("results.xlsx");
        let settings = settings(&[
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ]);

        let mut reporter = quiet_reporter();
        let summary = execute(&settings, tmp.path(), &mut reporter).expect("run succeeds");

        assert!(output.exists());
        assert_eq!(summary.models, 1);
        assert_eq!(summary.warning_count, 0);

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(text.contains("$87,500.00"));
        assert!(text.contains("Sheet 4: Monthly Summary"));
    }

    #[test]
    fn test_execute_json_format() {
        let tmp = TempDir::new().expect("tempdir");
        let input = dell_workbook(tmp.path(), "budget.xlsx");
        let output = tmp.path().join("results.xlsx");
        let settings = settings(&[
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--format",
            "json",
        ]);

        let mut reporter = quiet_reporter();
        execute(&settings, tmp.path(), &mut reporter).expect("run succeeds");

        let value: serde_json::Value = serde_json::from_slice(&reporter.into_inner()).unwrap();
        let march_qty = &value["monthly"][2]["net_quantity"];
        assert_eq!(march_qty, 35);
        assert!(output.exists());
    }

    #[test]
    fn test_schema_error_writes_nothing() {
        let tmp = TempDir::new().expect("tempdir");
        let input = tmp.path().join("broken.xlsx");
        let no_months = vec![
            vec![Cell::Text("PC Model"), Cell::Text("Unit Price")],
            vec![Cell::Text("A"), Cell::Num(10.0)],
        ];
        write_book(
            &input,
            &[("Rental", no_months), ("Returning", budget_sheet(&[]))],
        );
        let output = tmp.path().join("results.xlsx");
        let settings = settings(&[
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ]);

        let err = execute(&settings, tmp.path(), &mut quiet_reporter()).unwrap_err();
        assert_eq!(exit_code(&err), 3);
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_input_exit_code() {
        let tmp = TempDir::new().expect("tempdir");
        let output = tmp.path().join("results.xlsx");
        let settings = settings(&[
            tmp.path().join("missing.xlsx").to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ]);

        let err = execute(&settings, tmp.path(), &mut quiet_reporter()).unwrap_err();
        assert_eq!(exit_code(&err), 2);
        assert!(!output.exists());
    }

    #[test]
    fn test_bad_alias_file_exit_code() {
        let tmp = TempDir::new().expect("tempdir");
        let input = dell_workbook(tmp.path(), "budget.xlsx");
        let aliases = tmp.path().join("aliases.json");
        std::fs::write(&aliases, "{ not json").unwrap();
        let settings = settings(&[
            input.to_str().unwrap(),
            "--aliases",
            aliases.to_str().unwrap(),
            "--output",
            tmp.path().join("out.xlsx").to_str().unwrap(),
        ]);

        let err = execute(&settings, tmp.path(), &mut quiet_reporter()).unwrap_err();
        assert_eq!(exit_code(&err), 1);
        assert!(format!("{err:#}").contains("aliases.json"));
    }

    #[test]
    fn test_discovers_input_in_search_dir() {
        let tmp = TempDir::new().expect("tempdir");
        dell_workbook(tmp.path(), "2025_monthly.xlsx");
        let output = tmp.path().join("results.xlsx");
        let settings = settings(&["--output", output.to_str().unwrap()]);

        let summary = execute(&settings, tmp.path(), &mut quiet_reporter()).expect("run");
        assert!(summary.input.ends_with("2025_monthly.xlsx"));
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let tmp = TempDir::new().expect("tempdir");
        let input = dell_workbook(tmp.path(), "budget.xlsx");
        let output = tmp.path().join("results.xlsx");
        let settings = settings(&[
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--format",
            "json",
        ]);

        let mut first = quiet_reporter();
        execute(&settings, tmp.path(), &mut first).unwrap();
        let mut second = quiet_reporter();
        execute(&settings, tmp.path(), &mut second).unwrap();

        assert_eq!(first.into_inner(), second.into_inner());
    }

    // ── exit_code ─────────────────────────────────────────────────────────────

    #[test]
    fn test_exit_code_through_context() {
        let err = anyhow::Error::new(BudgetError::schema("Rental", "no month columns"))
            .context("while loading");
        assert_eq!(exit_code(&err), 3);

        let plain = anyhow::anyhow!("something else");
        assert_eq!(exit_code(&plain), 1);
    }
}
