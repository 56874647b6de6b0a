//! Spreadsheet output: the four-sheet results workbook.
//!
//! The workbook is serialized in memory, written to a sibling temporary file
//! and renamed over the target, so a failed run never leaves a half-written
//! report behind.

use std::fs;
use std::path::{Path, PathBuf};

use budget_core::error::{BudgetError, Result};
use budget_core::formatting::{
    format_count, format_currency, COUNT_NUM_FORMAT, CURRENCY_NUM_FORMAT,
};
use budget_core::models::SheetTable;
use budget_core::months::Month;
use budget_data::analysis::BudgetReport;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};
use tracing::{debug, info};

/// Sheets of the results workbook, in order.
pub const SHEET_NAMES: [&str; 4] = [
    "Overall Summary",
    "Rental PC",
    "Returning PC",
    "Monthly Summary",
];

/// Widest a column is allowed to grow, in characters.
pub const MAX_COLUMN_WIDTH: usize = 40;

const TOTAL_FILL: u32 = 0xFFF2CC;
const HEADER_FILL: u32 = 0xD9E1F2;

// ── Formats ───────────────────────────────────────────────────────────────────

/// Cell formats shared by every sheet.
pub(crate) struct Formats {
    pub header: Format,
    pub text: Format,
    pub currency: Format,
    pub count: Format,
    pub total_text: Format,
    pub total_currency: Format,
    pub total_count: Format,
}

impl Formats {
    pub fn new() -> Self {
        let total = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(TOTAL_FILL))
            .set_border_top(FormatBorder::Thin);
        Self {
            header: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(HEADER_FILL))
                .set_border_bottom(FormatBorder::Thin),
            text: Format::new(),
            currency: Format::new().set_num_format(CURRENCY_NUM_FORMAT),
            count: Format::new().set_num_format(COUNT_NUM_FORMAT),
            total_currency: total.clone().set_num_format(CURRENCY_NUM_FORMAT),
            total_count: total.clone().set_num_format(COUNT_NUM_FORMAT),
            total_text: total,
        }
    }
}

// ── SheetWriter ───────────────────────────────────────────────────────────────

/// Writes cells into one worksheet and tracks the width each column needs.
pub(crate) struct SheetWriter<'a> {
    sheet: &'a mut Worksheet,
    widths: Vec<usize>,
}

impl<'a> SheetWriter<'a> {
    pub fn new(sheet: &'a mut Worksheet) -> Self {
        Self {
            sheet,
            widths: Vec::new(),
        }
    }

    pub fn header(&mut self, headers: &[String], format: &Format) -> Result<()> {
        for (col, text) in headers.iter().enumerate() {
            self.text(0, col, text, format)?;
        }
        Ok(())
    }

    pub fn text(&mut self, row: u32, col: usize, text: &str, format: &Format) -> Result<()> {
        self.track(col, text.chars().count());
        self.sheet
            .write_string_with_format(row, col_num(col), text, format)
            .map_err(xlsx_error)?;
        Ok(())
    }

    pub fn money(&mut self, row: u32, col: usize, value: Decimal, format: &Format) -> Result<()> {
        let shown = format_currency(value);
        self.track(col, shown.chars().count());
        self.sheet
            .write_number_with_format(row, col_num(col), to_f64(value), format)
            .map_err(xlsx_error)?;
        Ok(())
    }

    pub fn count(&mut self, row: u32, col: usize, value: i64, format: &Format) -> Result<()> {
        let shown = format_count(value);
        self.track(col, shown.chars().count());
        self.sheet
            .write_number_with_format(row, col_num(col), value as f64, format)
            .map_err(xlsx_error)?;
        Ok(())
    }

    pub fn formula(&mut self, row: u32, col: usize, formula: &str, format: &Format) -> Result<()> {
        self.sheet
            .write_formula_with_format(row, col_num(col), formula, format)
            .map_err(xlsx_error)?;
        Ok(())
    }

    /// Make column `col` at least `len` characters wide.
    pub fn reserve(&mut self, col: usize, len: usize) {
        self.track(col, len);
    }

    /// Apply the tracked column widths and freeze the header row.
    pub fn finish(self) -> Result<()> {
        for (col, width) in self.widths.iter().enumerate() {
            let width = (width + 2).min(MAX_COLUMN_WIDTH);
            self.sheet
                .set_column_width(col_num(col), width as f64)
                .map_err(xlsx_error)?;
        }
        self.sheet.set_freeze_panes(1, 0).map_err(xlsx_error)?;
        Ok(())
    }

    fn track(&mut self, col: usize, len: usize) {
        if self.widths.len() <= col {
            self.widths.resize(col + 1, 0);
        }
        self.widths[col] = self.widths[col].max(len);
    }
}

fn col_num(col: usize) -> u16 {
    u16::try_from(col).unwrap_or(u16::MAX)
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

pub(crate) fn xlsx_error(err: XlsxError) -> BudgetError {
    BudgetError::WorkbookWrite(err.to_string())
}

/// Header labels: `first`, `Unit Price`, the twelve months, then `tail`.
pub(crate) fn month_headers(first: &str, tail: &[&str]) -> Vec<String> {
    let mut headers = vec![first.to_string(), "Unit Price".to_string()];
    headers.extend(Month::ALL.iter().map(|m| m.abbreviation().to_string()));
    headers.extend(tail.iter().map(|t| t.to_string()));
    headers
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Build the results workbook and return its bytes.
pub fn build_workbook(report: &BudgetReport) -> Result<Vec<u8>> {
    let formats = Formats::new();
    let mut workbook = Workbook::new();

    write_overall_summary(add_sheet(&mut workbook, SHEET_NAMES[0])?, report, &formats)?;
    write_sheet_costs(add_sheet(&mut workbook, SHEET_NAMES[1])?, &report.rental, &formats)?;
    write_sheet_costs(add_sheet(&mut workbook, SHEET_NAMES[2])?, &report.returning, &formats)?;
    write_monthly_summary(add_sheet(&mut workbook, SHEET_NAMES[3])?, report, &formats)?;

    workbook.save_to_buffer().map_err(xlsx_error)
}

/// Build the results workbook and write it to `path`, replacing any
/// existing file.
pub fn write_report(report: &BudgetReport, path: &Path) -> Result<()> {
    let bytes = build_workbook(report)?;
    save_atomic(path, &bytes)?;
    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Write `bytes` to a temporary sibling of `path`, then rename it into place.
pub fn save_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    if let Err(err) = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    debug!("Renamed {} -> {}", tmp.display(), path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn add_sheet<'a>(workbook: &'a mut Workbook, name: &str) -> Result<&'a mut Worksheet> {
    workbook.add_worksheet().set_name(name).map_err(xlsx_error)
}

// ── Sheets ────────────────────────────────────────────────────────────────────

fn write_overall_summary(sheet: &mut Worksheet, report: &BudgetReport, f: &Formats) -> Result<()> {
    let mut w = SheetWriter::new(sheet);
    w.header(
        &month_headers("PC Model", &["Annual Net Cost", "Annual Net Qty"]),
        &f.header,
    )?;

    let mut row = 1;
    for record in report.records() {
        w.text(row, 0, &record.model, &f.text)?;
        w.money(row, 1, record.unit_price, &f.currency)?;
        for (i, cost) in record.net_cost.iter().enumerate() {
            w.money(row, 2 + i, *cost, &f.currency)?;
        }
        w.money(row, 14, record.annual_net_cost(), &f.currency)?;
        w.count(row, 15, record.annual_net_quantity(), &f.count)?;
        row += 1;
    }

    w.text(row, 0, "TOTAL", &f.total_text)?;
    w.text(row, 1, "", &f.total_text)?;
    for (i, summary) in report.monthly.iter().enumerate() {
        w.money(row, 2 + i, summary.net_cost, &f.total_currency)?;
    }
    w.money(row, 14, report.annual.net_cost, &f.total_currency)?;
    w.count(row, 15, report.annual.net_quantity, &f.total_count)?;
    w.finish()
}

fn write_sheet_costs(sheet: &mut Worksheet, table: &SheetTable, f: &Formats) -> Result<()> {
    let mut w = SheetWriter::new(sheet);
    w.header(&month_headers("PC Model", &["Annual Total"]), &f.header)?;

    let mut row = 1;
    for record in table.records() {
        w.text(row, 0, record.model(), &f.text)?;
        w.money(row, 1, record.unit_price(), &f.currency)?;
        for (i, cost) in record.monthly_cost().iter().enumerate() {
            w.money(row, 2 + i, *cost, &f.currency)?;
        }
        w.money(row, 14, record.annual_total(), &f.currency)?;
        row += 1;
    }

    w.text(row, 0, "TOTAL", &f.total_text)?;
    w.text(row, 1, "", &f.total_text)?;
    for (i, cost) in table.monthly_cost_totals().iter().enumerate() {
        w.money(row, 2 + i, *cost, &f.total_currency)?;
    }
    w.money(row, 14, table.annual_cost_total(), &f.total_currency)?;
    w.finish()
}

fn write_monthly_summary(sheet: &mut Worksheet, report: &BudgetReport, f: &Formats) -> Result<()> {
    let mut w = SheetWriter::new(sheet);
    let headers: Vec<String> = [
        "Month",
        "Rental PC Cost",
        "Returning PC Cost",
        "Net Monthly Cost",
        "Net PC Quantity",
        "Trend",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();
    w.header(&headers, &f.header)?;

    for (i, summary) in report.monthly.iter().enumerate() {
        let row = i as u32 + 1;
        w.text(row, 0, summary.month.full_name(), &f.text)?;
        w.money(row, 1, summary.rental_cost, &f.currency)?;
        w.money(row, 2, summary.returning_cost, &f.currency)?;
        w.money(row, 3, summary.net_cost, &f.currency)?;
        w.count(row, 4, summary.net_quantity, &f.count)?;
        let trend = match i {
            0 => "",
            _ => report.trend[i - 1].direction.label(),
        };
        w.text(row, 5, trend, &f.text)?;
    }

    let row = report.monthly.len() as u32 + 1;
    let annual = &report.annual;
    w.text(row, 0, "Annual", &f.total_text)?;
    w.money(row, 1, annual.rental_cost, &f.total_currency)?;
    w.money(row, 2, annual.returning_cost, &f.total_currency)?;
    w.money(row, 3, annual.net_cost, &f.total_currency)?;
    w.count(row, 4, annual.net_quantity, &f.total_count)?;
    w.text(row, 5, "", &f.total_text)?;
    w.finish()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
