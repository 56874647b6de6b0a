//! Annual figures, month-to-month trend and the full budget analysis.
//!
//! Combines the loader output with [`BudgetAggregator`] and returns a
//! [`BudgetReport`] ready for the report layer.

use budget_core::error::RowWarning;
use budget_core::models::{MonthlySummary, NetRecord, SheetTable};
use budget_core::months::{Month, MONTHS};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::aggregator::{BudgetAggregator, NetRecords};
use crate::reader::LoadedWorkbook;

// ── Public types ──────────────────────────────────────────────────────────────

/// Year totals across all models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnualSummary {
    pub rental_cost: Decimal,
    pub returning_cost: Decimal,
    pub net_cost: Decimal,
    pub rental_quantity: u64,
    pub returning_quantity: u64,
    pub net_quantity: i64,
    /// `net_cost / 12`, exact.
    pub average_monthly_cost: Decimal,
    /// `net_quantity / 12`, exact.
    pub average_monthly_quantity: Decimal,
}

/// Direction of the net-cost change between two consecutive months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increase,
    Decrease,
    Flat,
}

impl Trend {
    pub fn classify(delta: Decimal) -> Self {
        if delta > Decimal::ZERO {
            Trend::Increase
        } else if delta < Decimal::ZERO {
            Trend::Decrease
        } else {
            Trend::Flat
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Trend::Increase => "increase",
            Trend::Decrease => "decrease",
            Trend::Flat => "flat",
        }
    }

    /// Single-character marker for compact tables.
    pub fn arrow(self) -> &'static str {
        match self {
            Trend::Increase => "▲",
            Trend::Decrease => "▼",
            Trend::Flat => "=",
        }
    }
}

/// Net-cost change from one month to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthTrend {
    pub from: Month,
    pub to: Month,
    pub delta: Decimal,
    pub direction: Trend,
}

/// First month versus last month net cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostChange {
    pub first: Decimal,
    pub last: Decimal,
    pub change: Decimal,
    /// Percentage change, only defined when the first month is positive.
    pub change_pct: Option<Decimal>,
}

/// Everything the report layer needs, computed once per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetReport {
    pub rental: SheetTable,
    pub returning: SheetTable,
    pub net_records: NetRecords,
    pub monthly: [MonthlySummary; MONTHS],
    pub annual: AnnualSummary,
    pub trend: Vec<MonthTrend>,
    pub cost_change: CostChange,
    pub warning_count: usize,
}

impl BudgetReport {
    /// Net records in model-key order.
    pub fn records(&self) -> impl Iterator<Item = &NetRecord> {
        self.net_records.values()
    }

    /// Row warnings from both sheets, rental sheet first.
    pub fn warnings(&self) -> impl Iterator<Item = &RowWarning> {
        self.rental.warnings().iter().chain(self.returning.warnings())
    }
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the aggregation and analysis stages over a loaded workbook.
pub fn analyze_budget(loaded: LoadedWorkbook) -> BudgetReport {
    let warning_count = loaded.warning_count();
    let LoadedWorkbook { rental, returning } = loaded;

    let (net_records, monthly) = BudgetAggregator::aggregate(&rental, &returning);
    let annual = calculate_annual(&monthly);
    let trend = monthly_trend(&monthly);
    let cost_change = cost_change(&monthly);

    debug!(
        "Analysis: {} models, annual net {}, {} warnings",
        net_records.len(),
        annual.net_cost,
        warning_count
    );

    BudgetReport {
        rental,
        returning,
        net_records,
        monthly,
        annual,
        trend,
        cost_change,
        warning_count,
    }
}

/// Sum the twelve monthly summaries into year figures.
pub fn calculate_annual(monthly: &[MonthlySummary; MONTHS]) -> AnnualSummary {
    let rental_cost: Decimal = monthly.iter().map(|m| m.rental_cost).sum();
    let returning_cost: Decimal = monthly.iter().map(|m| m.returning_cost).sum();
    let net_cost: Decimal = monthly.iter().map(|m| m.net_cost).sum();
    let net_quantity: i64 = monthly.iter().map(|m| m.net_quantity).sum();
    let months = Decimal::from(MONTHS as u64);

    AnnualSummary {
        rental_cost,
        returning_cost,
        net_cost,
        rental_quantity: monthly.iter().map(|m| m.rental_quantity).sum(),
        returning_quantity: monthly.iter().map(|m| m.returning_quantity).sum(),
        net_quantity,
        average_monthly_cost: net_cost / months,
        average_monthly_quantity: Decimal::from(net_quantity) / months,
    }
}

/// Classify the net-cost change for each consecutive month pair (11 entries).
pub fn monthly_trend(monthly: &[MonthlySummary; MONTHS]) -> Vec<MonthTrend> {
    monthly
        .windows(2)
        .map(|pair| {
            let delta = pair[1].net_cost - pair[0].net_cost;
            MonthTrend {
                from: pair[0].month,
                to: pair[1].month,
                delta,
                direction: Trend::classify(delta),
            }
        })
        .collect()
}

/// Compare the first and last month's net cost.
pub fn cost_change(monthly: &[MonthlySummary; MONTHS]) -> CostChange {
    let first = monthly[0].net_cost;
    let last = monthly[MONTHS - 1].net_cost;
    let change = last - first;
    let change_pct =
        (first > Decimal::ZERO).then(|| (change / first * Decimal::ONE_HUNDRED).round_dp(4));

    CostChange {
        first,
        last,
        change,
        change_pct,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use budget_core::models::PcRecord;

    fn summary(month: Month, rental: i64, returning: i64, net_qty: i64) -> MonthlySummary {
        MonthlySummary {
            month,
            rental_cost: Decimal::from(rental),
            returning_cost: Decimal::from(returning),
            net_cost: Decimal::from(rental - returning),
            rental_quantity: 0,
            returning_quantity: 0,
            net_quantity: net_qty,
        }
    }

    fn year(net: [i64; MONTHS]) -> [MonthlySummary; MONTHS] {
        std::array::from_fn(|i| summary(Month::ALL[i], net[i], 0, 1))
    }

    fn loaded(rental: &[(&str, i64, [u64; MONTHS])], returning: &[(&str, i64, [u64; MONTHS])]) -> LoadedWorkbook {
        let build = |name: &str, rows: &[(&str, i64, [u64; MONTHS])]| {
            let mut t = SheetTable::new(name);
            for (model, price, qty) in rows {
                t.insert(PcRecord::new(*model, Decimal::from(*price), *qty));
            }
            t
        };
        LoadedWorkbook {
            rental: build("Rental", rental),
            returning: build("Returning", returning),
        }
    }

    // ── calculate_annual ──────────────────────────────────────────────────────

    #[test]
    fn test_annual_sums_and_exact_average() {
        let monthly = year([1000, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let annual = calculate_annual(&monthly);

        assert_eq!(annual.net_cost, Decimal::from(1000));
        assert_eq!(annual.net_quantity, 12);
        assert_eq!(annual.average_monthly_quantity, Decimal::ONE);
        // Exact division: 1000 / 12 is not truncated to 83.
        assert_eq!(annual.average_monthly_cost * Decimal::from(12), Decimal::from(1000));
        assert!(annual.average_monthly_cost > Decimal::from(83));
    }

    #[test]
    fn test_annual_is_sum_of_monthly_values() {
        let monthly = std::array::from_fn(|i| summary(Month::ALL[i], 100 * (i as i64 + 1), 10, -1));
        let annual = calculate_annual(&monthly);

        assert_eq!(annual.rental_cost, Decimal::from(7800));
        assert_eq!(annual.returning_cost, Decimal::from(120));
        assert_eq!(annual.net_cost, Decimal::from(7680));
        assert_eq!(annual.net_quantity, -12);
    }

    // ── monthly_trend ─────────────────────────────────────────────────────────

    #[test]
    fn test_trend_classification() {
        let monthly = year([10, 20, 20, 5, 5, 5, 6, 6, 6, 6, 6, 0]);
        let trend = monthly_trend(&monthly);

        assert_eq!(trend.len(), 11);
        assert_eq!(trend[0].from, Month::Jan);
        assert_eq!(trend[0].to, Month::Feb);
        assert_eq!(trend[0].direction, Trend::Increase);
        assert_eq!(trend[0].delta, Decimal::from(10));
        assert_eq!(trend[1].direction, Trend::Flat);
        assert_eq!(trend[2].direction, Trend::Decrease);
        assert_eq!(trend[10].to, Month::Dec);
        assert_eq!(trend[10].direction, Trend::Decrease);
    }

    #[test]
    fn test_trend_handles_negative_values() {
        let monthly = year([-10, -5, -20, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let trend = monthly_trend(&monthly);
        assert_eq!(trend[0].direction, Trend::Increase);
        assert_eq!(trend[1].direction, Trend::Decrease);
    }

    // ── cost_change ───────────────────────────────────────────────────────────

    #[test]
    fn test_cost_change_with_percentage() {
        let monthly = year([200, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 250]);
        let change = cost_change(&monthly);

        assert_eq!(change.change, Decimal::from(50));
        assert_eq!(change.change_pct, Some(Decimal::from(25)));
    }

    #[test]
    fn test_cost_change_without_percentage_when_first_not_positive() {
        let change = cost_change(&year([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 250]));
        assert_eq!(change.change_pct, None);

        let change = cost_change(&year([-5, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5]));
        assert_eq!(change.change_pct, None);
        assert_eq!(change.change, Decimal::from(10));
    }

    // ── analyze_budget ────────────────────────────────────────────────────────

    #[test]
    fn test_analyze_budget_end_to_end() {
        let report = analyze_budget(loaded(
            &[("Dell Latitude", 2500, [50, 50, 45, 45, 45, 45, 45, 45, 45, 45, 45, 45])],
            &[("Old PC", 1000, [0, 0, 0, 0, 0, 5, 0, 0, 0, 0, 0, 0])],
        ));

        assert_eq!(report.net_records.len(), 2);
        assert_eq!(report.monthly[Month::Jun.index()].net_quantity, 40);
        assert_eq!(
            report.monthly[Month::Jun.index()].net_cost,
            Decimal::from(45 * 2500 - 5000)
        );
        assert_eq!(report.trend.len(), 11);
        assert_eq!(report.warning_count, 0);

        let from_records: Decimal = report.records().map(NetRecord::annual_net_cost).sum();
        assert_eq!(report.annual.net_cost, from_records);
    }

    #[test]
    fn test_report_warnings_rental_first() {
        use budget_core::error::WarningKind;

        let mut input = loaded(&[("A", 10, [1; MONTHS])], &[]);
        let warning = |sheet: &str, row| RowWarning {
            sheet: sheet.to_string(),
            row,
            kind: WarningKind::MissingModel,
        };
        input.returning.push_warning(warning("Returning", 2));
        input.rental.push_warning(warning("Rental", 7));

        let report = analyze_budget(input);
        assert_eq!(report.warning_count, 2);
        let sheets: Vec<&str> = report.warnings().map(|w| w.sheet.as_str()).collect();
        assert_eq!(sheets, vec!["Rental", "Returning"]);
    }

    #[test]
    fn test_analyze_budget_is_idempotent() {
        let input = || {
            loaded(
                &[("A", 10, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12])],
                &[("A", 10, [0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1])],
            )
        };
        let first = analyze_budget(input());
        let second = analyze_budget(input());
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
