use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::RowWarning;
use crate::months::{Month, MONTHS};

/// Collapse runs of whitespace, trim and lowercase a header cell.
///
/// # Examples
///
/// ```
/// use budget_core::models::normalize_header;
///
/// assert_eq!(normalize_header("  Unit   Price "), "unit price");
/// ```
pub fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Canonical key for a PC model name: trimmed, inner whitespace collapsed,
/// case-folded.
///
/// Two rows whose names produce the same key describe the same model.
///
/// # Examples
///
/// ```
/// use budget_core::models::normalize_model_key;
///
/// assert_eq!(normalize_model_key(" Dell  Latitude 7440 "), "dell latitude 7440");
/// assert_eq!(normalize_model_key("THINKPAD x13"), normalize_model_key("ThinkPad X13"));
/// ```
pub fn normalize_model_key(model: &str) -> String {
    normalize_header(model)
}

// ── PcRecord ──────────────────────────────────────────────────────────────────

/// One model's row from a budget sheet.
///
/// `annual_total` is always derived from the monthly quantities and unit
/// price; a "Total" column in the input is never trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PcRecord {
    model: String,
    unit_price: Decimal,
    monthly_quantity: [u64; MONTHS],
    annual_total: Decimal,
}

impl PcRecord {
    pub fn new(model: impl Into<String>, unit_price: Decimal, monthly_quantity: [u64; MONTHS]) -> Self {
        let mut record = Self {
            model: model.into().trim().to_string(),
            unit_price,
            monthly_quantity,
            annual_total: Decimal::ZERO,
        };
        record.annual_total = record.compute_annual_total();
        record
    }

    /// Display name (first-seen spelling, trimmed).
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Normalized key used for matching across sheets.
    pub fn key(&self) -> String {
        normalize_model_key(&self.model)
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// PC count per month, calendar order.
    pub fn monthly_quantity(&self) -> &[u64; MONTHS] {
        &self.monthly_quantity
    }

    pub fn quantity(&self, month: Month) -> u64 {
        self.monthly_quantity[month.index()]
    }

    /// `quantity × unit_price` per month, calendar order.
    pub fn monthly_cost(&self) -> [Decimal; MONTHS] {
        self.monthly_quantity
            .map(|qty| Decimal::from(qty) * self.unit_price)
    }

    pub fn annual_quantity(&self) -> u64 {
        self.monthly_quantity
            .iter()
            .fold(0u64, |acc, qty| acc.saturating_add(*qty))
    }

    /// Sum of the twelve monthly costs.
    pub fn annual_total(&self) -> Decimal {
        self.annual_total
    }

    /// Fold another row for the same model into this one.
    ///
    /// Quantities are summed element-wise; this record's name and unit price
    /// are kept.
    pub fn merge(&mut self, other: &PcRecord) {
        for (mine, theirs) in self.monthly_quantity.iter_mut().zip(other.monthly_quantity) {
            *mine = mine.saturating_add(theirs);
        }
        self.annual_total = self.compute_annual_total();
    }

    fn compute_annual_total(&self) -> Decimal {
        self.monthly_cost().iter().copied().sum()
    }
}

// ── SheetTable ────────────────────────────────────────────────────────────────

/// All records of one input sheet, keyed by normalized model name.
///
/// Iteration is in key order, which keeps every report deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SheetTable {
    name: String,
    records: BTreeMap<String, PcRecord>,
    warnings: Vec<RowWarning>,
}

impl SheetTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Name of the sheet this table was read from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a record, merging it into an existing one with the same key.
    ///
    /// Returns `true` when a merge happened.
    pub fn insert(&mut self, record: PcRecord) -> bool {
        let key = record.key();
        match self.records.get_mut(&key) {
            Some(existing) => {
                if existing.unit_price() != record.unit_price() {
                    tracing::debug!(
                        "{}: duplicate row for '{}' has price {}, keeping first-seen {}",
                        self.name,
                        existing.model(),
                        record.unit_price(),
                        existing.unit_price()
                    );
                }
                existing.merge(&record);
                true
            }
            None => {
                self.records.insert(key, record);
                false
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&PcRecord> {
        self.records.get(key)
    }

    /// `(key, record)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PcRecord)> {
        self.records.iter()
    }

    pub fn records(&self) -> impl Iterator<Item = &PcRecord> {
        self.records.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.records.keys()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push_warning(&mut self, warning: RowWarning) {
        self.warnings.push(warning);
    }

    /// Recoverable problems found while loading the sheet.
    pub fn warnings(&self) -> &[RowWarning] {
        &self.warnings
    }

    /// Cost per month across all records, at this sheet's own prices.
    pub fn monthly_cost_totals(&self) -> [Decimal; MONTHS] {
        let mut totals = [Decimal::ZERO; MONTHS];
        for record in self.records.values() {
            for (total, cost) in totals.iter_mut().zip(record.monthly_cost()) {
                *total += cost;
            }
        }
        totals
    }

    /// Sum of every record's annual total.
    pub fn annual_cost_total(&self) -> Decimal {
        self.records.values().map(PcRecord::annual_total).sum()
    }
}

// ── NetRecord ─────────────────────────────────────────────────────────────────

/// Which input sheets a model was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Both,
    RentalOnly,
    ReturningOnly,
}

/// Rental minus returning figures for one model.
///
/// Net values are signed: a negative month means more PCs were returned than
/// rented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetRecord {
    pub model: String,
    pub source: ModelSource,
    /// Resolved price: the rental sheet's when present, else the returning sheet's.
    pub unit_price: Decimal,
    pub rental_quantity: [u64; MONTHS],
    pub returning_quantity: [u64; MONTHS],
    pub net_quantity: [i64; MONTHS],
    pub rental_cost: [Decimal; MONTHS],
    pub returning_cost: [Decimal; MONTHS],
    pub net_cost: [Decimal; MONTHS],
}

impl NetRecord {
    pub fn annual_net_quantity(&self) -> i64 {
        self.net_quantity.iter().sum()
    }

    pub fn annual_net_cost(&self) -> Decimal {
        self.net_cost.iter().copied().sum()
    }
}

// ── MonthlySummary ────────────────────────────────────────────────────────────

/// Totals across all models for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySummary {
    pub month: Month,
    pub rental_cost: Decimal,
    pub returning_cost: Decimal,
    pub net_cost: Decimal,
    pub rental_quantity: u64,
    pub returning_quantity: u64,
    pub net_quantity: i64,
}

impl MonthlySummary {
    pub fn empty(month: Month) -> Self {
        Self {
            month,
            rental_cost: Decimal::ZERO,
            returning_cost: Decimal::ZERO,
            net_cost: Decimal::ZERO,
            rental_quantity: 0,
            returning_quantity: 0,
            net_quantity: 0,
        }
    }

    /// Add one model's figures for this month.
    pub fn add_record(&mut self, record: &NetRecord) {
        let i = self.month.index();
        self.rental_cost += record.rental_cost[i];
        self.returning_cost += record.returning_cost[i];
        self.net_cost += record.net_cost[i];
        self.rental_quantity = self.rental_quantity.saturating_add(record.rental_quantity[i]);
        self.returning_quantity = self
            .returning_quantity
            .saturating_add(record.returning_quantity[i]);
        self.net_quantity = self.net_quantity.saturating_add(record.net_quantity[i]);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
