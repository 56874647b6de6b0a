//! Rental-minus-returning aggregation per model and per month.

use std::collections::{BTreeMap, BTreeSet};

use budget_core::models::{ModelSource, MonthlySummary, NetRecord, PcRecord, SheetTable};
use budget_core::months::{Month, MONTHS};
use rust_decimal::Decimal;
use tracing::warn;

/// Net records keyed by normalized model name, in key order.
pub type NetRecords = BTreeMap<String, NetRecord>;

// ── BudgetAggregator ──────────────────────────────────────────────────────────

/// Stateless helper that aligns the rental and returning tables by model and
/// month.
pub struct BudgetAggregator;

impl BudgetAggregator {
    /// Compute per-model net records and the twelve monthly summaries.
    pub fn aggregate(
        rental: &SheetTable,
        returning: &SheetTable,
    ) -> (NetRecords, [MonthlySummary; MONTHS]) {
        let records = Self::net_records(rental, returning);
        let monthly = Self::monthly_summaries(&records);
        (records, monthly)
    }

    /// One [`NetRecord`] per model in the union of both tables.
    ///
    /// A model missing from one table contributes zero quantities from that
    /// side. Net values are never clamped.
    pub fn net_records(rental: &SheetTable, returning: &SheetTable) -> NetRecords {
        let keys: BTreeSet<&String> = rental.keys().chain(returning.keys()).collect();

        keys.into_iter()
            .filter_map(|key| {
                let record = Self::net_record(rental.get(key), returning.get(key))?;
                Some((key.clone(), record))
            })
            .collect()
    }

    /// Sum every model's figures month by month.
    pub fn monthly_summaries(records: &NetRecords) -> [MonthlySummary; MONTHS] {
        let mut monthly = Month::ALL.map(MonthlySummary::empty);
        for record in records.values() {
            for summary in monthly.iter_mut() {
                summary.add_record(record);
            }
        }
        monthly
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Build the net record for one model. `None` only when both sides are absent.
    fn net_record(rental: Option<&PcRecord>, returning: Option<&PcRecord>) -> Option<NetRecord> {
        let (model, unit_price, source) = match (rental, returning) {
            (Some(r), Some(ret)) => {
                if r.unit_price() != ret.unit_price() {
                    warn!(
                        "Unit price for '{}' differs between sheets (rental {}, returning {}); using rental price",
                        r.model(),
                        r.unit_price(),
                        ret.unit_price()
                    );
                }
                (r.model(), r.unit_price(), ModelSource::Both)
            }
            (Some(r), None) => (r.model(), r.unit_price(), ModelSource::RentalOnly),
            (None, Some(ret)) => (ret.model(), ret.unit_price(), ModelSource::ReturningOnly),
            (None, None) => return None,
        };

        let rental_quantity = rental.map_or([0; MONTHS], |r| *r.monthly_quantity());
        let returning_quantity = returning.map_or([0; MONTHS], |r| *r.monthly_quantity());

        let mut net_quantity = [0i64; MONTHS];
        for i in 0..MONTHS {
            net_quantity[i] = to_signed(rental_quantity[i]) - to_signed(returning_quantity[i]);
        }

        let cost = |qty: [u64; MONTHS]| qty.map(|q| Decimal::from(q) * unit_price);
        let rental_cost = cost(rental_quantity);
        let returning_cost = cost(returning_quantity);
        let net_cost = std::array::from_fn(|i| rental_cost[i] - returning_cost[i]);

        Some(NetRecord {
            model: model.to_string(),
            source,
            unit_price,
            rental_quantity,
            returning_quantity,
            net_quantity,
            rental_cost,
            returning_cost,
            net_cost,
        })
    }
}

fn to_signed(qty: u64) -> i64 {
    i64::try_from(qty).unwrap_or(i64::MAX)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
