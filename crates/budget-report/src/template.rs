//! Input template: a two-sheet workbook with the headers the loader expects.

use std::path::Path;

use budget_core::error::{BudgetError, Result};
use budget_core::months::MONTHS;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::info;

use crate::workbook::{month_headers, save_atomic, xlsx_error, Formats, SheetWriter};

pub const RENTAL_SHEET: &str = "1. Rental PC";
pub const RETURNING_SHEET: &str = "2. Returning PC";

/// Room left for model names in a blank template.
const MODEL_COLUMN_CHARS: usize = 30;

/// One sample row of the template.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRow {
    pub model: &'static str,
    pub unit_price: Decimal,
    pub quantities: [u64; MONTHS],
}

impl TemplateRow {
    fn new(model: &'static str, unit_price: i64, quantities: [u64; MONTHS]) -> Self {
        Self {
            model,
            unit_price: Decimal::from(unit_price),
            quantities,
        }
    }
}

const RENTAL_MODELS: [(&str, i64); 8] = [
    ("HP Elite SFF 800 G9 PC (4G087AV)", 3690),
    ("LIFE BOOK U9313", 4130),
    ("SurfacePro8", 6750),
    ("ThinkPad L13Gen2", 4200),
    ("ThinkPad X13 Gen 4", 4010),
    ("ThinkPad X13 Gen5", 3800),
    ("Dell Latitude 7440", 4500),
    ("Lenovo ThinkPad T16", 5800),
];

/// Sample rental fleet: quantities change at the start of Q2 and again in July.
pub fn sample_rental() -> Vec<TemplateRow> {
    const Q1: [u64; 8] = [1, 80, 2, 18, 70, 0, 0, 0];
    const Q2: [u64; 8] = [1, 80, 2, 18, 70, 20, 15, 0];
    const H2: [u64; 8] = [1, 80, 2, 18, 70, 50, 25, 25];

    RENTAL_MODELS
        .iter()
        .enumerate()
        .map(|(i, (model, price))| {
            let quantities = std::array::from_fn(|m| match m {
                0..=2 => Q1[i],
                3..=5 => Q2[i],
                _ => H2[i],
            });
            TemplateRow::new(model, *price, quantities)
        })
        .collect()
}

/// Sample returns in March, June and September.
pub fn sample_returning() -> Vec<TemplateRow> {
    const MODELS: [(&str, i64); 4] = [
        ("HP Elite SFF 800 G9 PC (4G087AV)", 3690),
        ("LIFE BOOK U9313", 4130),
        ("ThinkPad L13Gen2", 4200),
        ("ThinkPad X13 Gen 4", 4010),
    ];
    const MAR: [u64; 4] = [0, 20, 5, 10];
    const JUN: [u64; 4] = [0, 15, 3, 15];
    const SEP: [u64; 4] = [1, 10, 2, 5];

    MODELS
        .iter()
        .enumerate()
        .map(|(i, (model, price))| {
            let mut quantities = [0; MONTHS];
            quantities[2] = MAR[i];
            quantities[5] = JUN[i];
            quantities[8] = SEP[i];
            TemplateRow::new(model, *price, quantities)
        })
        .collect()
}

/// Build the template workbook and return its bytes.
pub fn build_template(with_examples: bool) -> Result<Vec<u8>> {
    let formats = Formats::new();
    let mut workbook = Workbook::new();

    let (rental, returning) = if with_examples {
        (sample_rental(), sample_returning())
    } else {
        (Vec::new(), Vec::new())
    };

    let sheet = workbook
        .add_worksheet()
        .set_name(RENTAL_SHEET)
        .map_err(xlsx_error)?;
    write_template_sheet(sheet, &rental, &formats)?;

    let sheet = workbook
        .add_worksheet()
        .set_name(RETURNING_SHEET)
        .map_err(xlsx_error)?;
    write_template_sheet(sheet, &returning, &formats)?;

    workbook.save_to_buffer().map_err(xlsx_error)
}

/// Write the template to `path`. An existing file is only replaced when
/// `force` is set.
pub fn write_template(path: &Path, with_examples: bool, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(BudgetError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    let bytes = build_template(with_examples)?;
    save_atomic(path, &bytes)?;
    info!(
        "Template written to {}{}",
        path.display(),
        if with_examples { " with sample data" } else { "" }
    );
    Ok(())
}

fn write_template_sheet(sheet: &mut Worksheet, rows: &[TemplateRow], f: &Formats) -> Result<()> {
    let mut w = SheetWriter::new(sheet);
    w.header(&month_headers("PC Model", &["Total"]), &f.header)?;
    w.reserve(0, MODEL_COLUMN_CHARS);

    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        w.text(r, 0, row.model, &f.text)?;
        w.money(r, 1, row.unit_price, &f.currency)?;
        for (m, qty) in row.quantities.iter().enumerate() {
            w.count(r, 2 + m, i64::try_from(*qty).unwrap_or(i64::MAX), &f.count)?;
        }
        // Spreadsheet rows are 1-based; months sit in columns C..N.
        w.formula(r, 14, &format!("=SUM(C{0}:N{0})", r + 1), &f.count)?;
    }
    w.finish()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use budget_core::columns::HeaderAliases;
    use budget_core::months::Month;
    use budget_data::analysis::analyze_budget;
    use budget_data::reader::load_workbook;
    use calamine::{open_workbook_auto, Reader};
    use tempfile::TempDir;

    // ── Sample data ───────────────────────────────────────────────────────────

    #[test]
    fn test_sample_rental_quantities_by_quarter() {
        let rows = sample_rental();
        assert_eq!(rows.len(), 8);

        let t16 = rows.iter().find(|r| r.model == "Lenovo ThinkPad T16").unwrap();
        assert_eq!(t16.quantities[Month::Jun.index()], 0);
        assert_eq!(t16.quantities[Month::Jul.index()], 25);

        let x13 = rows.iter().find(|r| r.model == "ThinkPad X13 Gen5").unwrap();
        assert_eq!(x13.quantities[Month::Mar.index()], 0);
        assert_eq!(x13.quantities[Month::Apr.index()], 20);
        assert_eq!(x13.quantities[Month::Dec.index()], 50);
    }

    #[test]
    fn test_sample_returning_months() {
        let rows = sample_returning();
        assert_eq!(rows.len(), 4);
        let life = &rows[1];
        assert_eq!(life.model, "LIFE BOOK U9313");
        assert_eq!(life.quantities[Month::Mar.index()], 20);
        assert_eq!(life.quantities[Month::Jun.index()], 15);
        assert_eq!(life.quantities[Month::Sep.index()], 10);
        assert_eq!(life.quantities.iter().sum::<u64>(), 45);
    }

    // ── Writing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_blank_template_has_headers_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("template.xlsx");
        write_template(&path, false, false).unwrap();

        let mut book = open_workbook_auto(&path).unwrap();
        assert_eq!(book.sheet_names(), vec![RENTAL_SHEET, RETURNING_SHEET]);

        let range = book.worksheet_range(RENTAL_SHEET).unwrap();
        let rows: Vec<_> = range.rows().collect();
        assert_eq!(rows.len(), 1);
        let header: Vec<String> = rows[0].iter().map(|c| c.to_string()).collect();
        assert_eq!(header[0], "PC Model");
        assert_eq!(header[1], "Unit Price");
        assert_eq!(header[2], "Jan");
        assert_eq!(header[13], "Dec");
        assert_eq!(header[14], "Total");
    }

    #[test]
    fn test_template_with_examples_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("template.xlsx");
        write_template(&path, true, false).unwrap();

        let loaded = load_workbook(&path, &HeaderAliases::default()).unwrap();
        assert_eq!(loaded.rental.len(), 8);
        assert_eq!(loaded.returning.len(), 4);
        assert_eq!(loaded.warning_count(), 0);

        let report = analyze_budget(loaded);
        // March: returns of 20 LIFE BOOK, 5 L13, 10 X13 Gen 4.
        let march = &report.monthly[Month::Mar.index()];
        assert_eq!(
            march.returning_cost,
            Decimal::from(20 * 4130 + 5 * 4200 + 10 * 4010)
        );
        assert_eq!(march.net_quantity, 171 - 35);
    }

    #[test]
    fn test_total_column_is_sum_formula() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("template.xlsx");
        write_template(&path, true, false).unwrap();

        let mut book = open_workbook_auto(&path).unwrap();
        let formulas = book.worksheet_formula(RENTAL_SHEET).unwrap();
        let any_sum = formulas.rows().flatten().any(|f| f.contains("SUM(C2:N2)"));
        assert!(any_sum);
    }

    #[test]
    fn test_refuses_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("template.xlsx");
        std::fs::write(&path, b"keep me").unwrap();

        let err = write_template(&path, false, false).unwrap_err();
        assert!(matches!(err, BudgetError::Config(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");

        write_template(&path, false, true).unwrap();
        assert_ne!(std::fs::read(&path).unwrap(), b"keep me");
    }
}
