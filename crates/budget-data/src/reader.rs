//! Workbook loading for the PC budget calculator.
//!
//! Opens the input spreadsheet, reads the rental (first) and returning
//! (second) sheets, resolves their headers against the alias table and
//! converts every data row into a [`PcRecord`] inside a [`SheetTable`].

use std::path::Path;
use std::str::FromStr;

use budget_core::columns::{CanonicalField, HeaderAliases};
use budget_core::error::{BudgetError, Result, RowWarning, WarningKind};
use budget_core::models::{PcRecord, SheetTable};
use budget_core::months::{Month, MONTHS};
use calamine::{open_workbook_auto, Data, Range, Reader};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

/// Largest PC count accepted in a month cell.
pub const MAX_QUANTITY: u64 = u32::MAX as u64;

/// Largest unit price accepted, in currency units.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

// ── Public API ────────────────────────────────────────────────────────────────

/// The two input tables, ready for aggregation.
#[derive(Debug, Clone)]
pub struct LoadedWorkbook {
    pub rental: SheetTable,
    pub returning: SheetTable,
}

impl LoadedWorkbook {
    /// Total recoverable row/cell problems across both sheets.
    pub fn warning_count(&self) -> usize {
        self.rental.warnings().len() + self.returning.warnings().len()
    }
}

/// Load the rental and returning tables from the workbook at `path`.
///
/// The workbook handle is released before this function returns; no file
/// stays open during computation.
pub fn load_workbook(path: &Path, aliases: &HeaderAliases) -> Result<LoadedWorkbook> {
    let [(rental_name, rental_range), (returning_name, returning_range)] =
        read_first_two_sheets(path)?;

    let rental = parse_sheet(&rental_name, &rental_range, aliases)?;
    let returning = parse_sheet(&returning_name, &returning_range, aliases)?;

    info!(
        "Loaded {}: {} rental models, {} returning models",
        path.display(),
        rental.len(),
        returning.len()
    );

    Ok(LoadedWorkbook { rental, returning })
}

/// Convert one sheet's cell range into a [`SheetTable`].
///
/// The first row of the range is the header row.
pub fn parse_sheet(name: &str, range: &Range<Data>, aliases: &HeaderAliases) -> Result<SheetTable> {
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| BudgetError::schema(name, "sheet is empty, expected a header row"))?;
    let layout = ColumnLayout::resolve(name, header, aliases)?;

    // 1-based spreadsheet row of the header.
    let header_row = range.start().map(|(r, _)| r + 1).unwrap_or(1);
    let mut table = SheetTable::new(name);
    let mut rows_read = 0u32;

    for (offset, row) in rows.enumerate() {
        let row_number = header_row + 1 + offset as u32;
        if row.iter().all(is_blank) {
            continue;
        }
        rows_read += 1;

        let Some(model) = row.get(layout.model).and_then(cell_text) else {
            record_warning(&mut table, row_number, WarningKind::MissingModel);
            continue;
        };

        if model.eq_ignore_ascii_case("total") {
            debug!("{}: skipping summary row {} ('{}')", name, row_number, model);
            continue;
        }

        let unit_price = match parse_price(row.get(layout.unit_price)) {
            Ok(price) => price,
            Err(raw) => {
                record_warning(&mut table, row_number, WarningKind::InvalidPrice { raw });
                Decimal::ZERO
            }
        };

        let mut quantities = [0u64; MONTHS];
        for month in Month::ALL {
            let Some(col) = layout.months[month.index()] else {
                continue;
            };
            match parse_quantity(row.get(col)) {
                Ok(qty) => quantities[month.index()] = qty,
                Err(raw) => {
                    record_warning(&mut table, row_number, WarningKind::InvalidQuantity { month, raw })
                }
            }
        }

        table.insert(PcRecord::new(model, unit_price, quantities));
    }

    debug!(
        "Sheet {}: {} rows read, {} models, {} warnings",
        name,
        rows_read,
        table.len(),
        table.warnings().len()
    );

    Ok(table)
}

// ── Column layout ─────────────────────────────────────────────────────────────

/// Column index of each canonical field within a sheet's rows.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnLayout {
    model: usize,
    unit_price: usize,
    months: [Option<usize>; MONTHS],
    /// Present for diagnostics only; the values are recomputed.
    total: Option<usize>,
}

impl ColumnLayout {
    fn resolve(sheet: &str, header: &[Data], aliases: &HeaderAliases) -> Result<Self> {
        let mut model = None;
        let mut unit_price = None;
        let mut total = None;
        let mut months: [Option<usize>; MONTHS] = [None; MONTHS];

        for (idx, cell) in header.iter().enumerate() {
            let Some(text) = cell_text(cell) else {
                continue;
            };

            if let Some(month) = Month::from_header(&text) {
                match months[month.index()] {
                    Some(first) => warn!(
                        "{}: duplicate {} column '{}' at position {} ignored, using position {}",
                        sheet,
                        month,
                        text,
                        idx + 1,
                        first + 1
                    ),
                    None => months[month.index()] = Some(idx),
                }
                continue;
            }

            match aliases.resolve(&text) {
                Some(CanonicalField::Model) => {
                    model.get_or_insert(idx);
                }
                Some(CanonicalField::UnitPrice) => {
                    unit_price.get_or_insert(idx);
                }
                Some(CanonicalField::Total) => {
                    total.get_or_insert(idx);
                }
                None => debug!("{}: ignoring column '{}'", sheet, text),
            }
        }

        if months.iter().all(Option::is_none) {
            return Err(BudgetError::schema(
                sheet,
                "no month columns found, expected headers like Jan, Feb, ... Dec",
            ));
        }
        let model = model.ok_or_else(|| missing_field(sheet, CanonicalField::Model, aliases))?;
        let unit_price =
            unit_price.ok_or_else(|| missing_field(sheet, CanonicalField::UnitPrice, aliases))?;

        let missing: Vec<&str> = Month::ALL
            .iter()
            .filter(|m| months[m.index()].is_none())
            .map(|m| m.abbreviation())
            .collect();
        if !missing.is_empty() {
            warn!(
                "{}: no column for {}, quantities treated as 0",
                sheet,
                missing.join(", ")
            );
        }
        if let Some(idx) = total {
            debug!("{}: total column at position {} ignored, totals are recomputed", sheet, idx + 1);
        }

        Ok(Self {
            model,
            unit_price,
            months,
            total,
        })
    }
}

fn missing_field(sheet: &str, field: CanonicalField, aliases: &HeaderAliases) -> BudgetError {
    BudgetError::schema(
        sheet,
        format!(
            "no '{}' column found (accepted headers: {})",
            field.label(),
            aliases.aliases(field).join(", ")
        ),
    )
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Open `path`, copy out the first two sheets and drop the workbook handle.
fn read_first_two_sheets(path: &Path) -> Result<[(String, Range<Data>); 2]> {
    if !path.exists() {
        return Err(BudgetError::FileNotFound(path.to_path_buf()));
    }

    let read_error = |e: calamine::Error| BudgetError::WorkbookRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut workbook = open_workbook_auto(path).map_err(read_error)?;
    let names = workbook.sheet_names().to_owned();
    if names.len() < 2 {
        return Err(BudgetError::schema(
            path.display().to_string(),
            format!(
                "workbook must contain at least 2 sheets (rental, returning), found {}",
                names.len()
            ),
        ));
    }
    if names.len() > 2 {
        debug!("Ignoring {} extra sheet(s) after '{}'", names.len() - 2, names[1]);
    }

    let rental = workbook.worksheet_range(&names[0]).map_err(read_error)?;
    let returning = workbook.worksheet_range(&names[1]).map_err(read_error)?;

    Ok([(names[0].clone(), rental), (names[1].clone(), returning)])
}

fn record_warning(table: &mut SheetTable, row: u32, kind: WarningKind) {
    let warning = RowWarning {
        sheet: table.name().to_string(),
        row,
        kind,
    };
    warn!("{}", warning);
    table.push_warning(warning);
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Trimmed, non-empty text of a cell.
fn cell_text(cell: &Data) -> Option<String> {
    if is_blank(cell) {
        return None;
    }
    let text = cell.to_string().trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// A month cell as a PC count, at most [`MAX_QUANTITY`]. `Err` carries the
/// raw cell text.
fn parse_quantity(cell: Option<&Data>) -> std::result::Result<u64, String> {
    let qty = match cell {
        None | Some(Data::Empty) => return Ok(0),
        Some(Data::Int(v)) => u64::try_from(*v).map_err(|_| v.to_string())?,
        Some(Data::Float(v)) => {
            if v.is_finite() && *v >= 0.0 && v.fract() == 0.0 && *v <= MAX_QUANTITY as f64 {
                *v as u64
            } else {
                return Err(v.to_string());
            }
        }
        Some(Data::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(0);
            }
            trimmed
                .replace(',', "")
                .parse::<u64>()
                .map_err(|_| trimmed.to_string())?
        }
        Some(other) => return Err(other.to_string()),
    };

    if qty > MAX_QUANTITY {
        return Err(cell.map(|c| c.to_string().trim().to_string()).unwrap_or_default());
    }
    Ok(qty)
}

/// A unit price cell, non-negative and at most [`MAX_UNIT_PRICE`]. `Err`
/// carries the raw cell text.
fn parse_price(cell: Option<&Data>) -> std::result::Result<Decimal, String> {
    let price = match cell {
        None | Some(Data::Empty) => return Ok(Decimal::ZERO),
        Some(Data::Int(v)) => Some(Decimal::from(*v)),
        Some(Data::Float(v)) if v.is_finite() => Decimal::from_f64(*v).map(|d| d.normalize()),
        Some(Data::String(s)) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
                .collect();
            if cleaned.is_empty() {
                return Ok(Decimal::ZERO);
            }
            Decimal::from_str(&cleaned).ok()
        }
        Some(_) => None,
    };

    match price {
        Some(p) if (!p.is_sign_negative() || p.is_zero()) && p <= MAX_UNIT_PRICE => Ok(p),
        _ => Err(cell.map(|c| c.to_string().trim().to_string()).unwrap_or_default()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
