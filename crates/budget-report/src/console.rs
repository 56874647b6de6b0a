//! Console rendering of the budget report.
//!
//! Each table is laid out with a [`ratatui::widgets::Table`] into an
//! off-screen [`Buffer`] sized to its content, then printed line by line.
//! Colour is emitted through [`crossterm`] only when enabled.

use std::io::{self, IsTerminal, Write};
use std::path::Path;

use chrono::NaiveDate;
use crossterm::queue;
use crossterm::style::{Attribute, Print, SetAttribute, SetForegroundColor};
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Row, Table, Widget};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use budget_core::formatting::{
    format_count, format_currency, format_number, format_percent_change, format_signed_currency,
};
use budget_core::models::SheetTable;
use budget_core::months::Month;
use budget_core::Result;
use budget_data::analysis::BudgetReport;
use rust_decimal::Decimal;

use crate::themes::Theme;
use crate::workbook::month_headers;

/// Widest a model name may be before it is truncated with `…`.
pub const MODEL_COLUMN_MAX: usize = 40;

/// Width of the `=` rules around section titles.
const RULE_WIDTH: usize = 80;

const COLUMN_SPACING: u16 = 2;

// ── ReportTable ───────────────────────────────────────────────────────────────

/// A titled text table: a header, data rows and an optional totals row.
///
/// The first column is a left-aligned label; every other column is a
/// right-aligned figure.
#[derive(Debug, Clone, Default)]
pub struct ReportTable {
    title: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    total: Option<Vec<String>>,
}

impl ReportTable {
    pub fn new(title: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            title: title.into(),
            headers,
            ..Self::default()
        }
    }

    pub fn push_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn with_total(mut self, cells: Vec<String>) -> Self {
        self.total = Some(cells);
        self
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn total(&self) -> Option<&[String]> {
        self.total.as_deref()
    }

    /// Display width of each column, the label column capped at
    /// [`MODEL_COLUMN_MAX`].
    pub fn column_widths(&self) -> Vec<u16> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.width()).collect();
        let body = self.rows.iter().chain(self.total.iter());
        for cells in body {
            for (i, cell) in cells.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.width());
                }
            }
        }
        if self.rows.is_empty() {
            if let Some(w) = widths.first_mut() {
                *w = (*w).max(NO_DATA.width());
            }
        }
        if let Some(w) = widths.first_mut() {
            *w = (*w).min(MODEL_COLUMN_MAX);
        }
        widths
            .into_iter()
            .map(|w| u16::try_from(w).unwrap_or(u16::MAX))
            .collect()
    }

    /// Lay the table out into a buffer exactly as large as it needs to be.
    pub fn render(&self, theme: &Theme) -> Buffer {
        let widths = self.column_widths();
        let gaps = COLUMN_SPACING * widths.len().saturating_sub(1) as u16;
        let inner = widths.iter().sum::<u16>() + gaps;
        let title_width = self.title.width() as u16 + 2;
        let width = inner.max(title_width) + 2;

        let body_rows = self.rows.len().max(1) + if self.total.is_some() { 2 } else { 0 };
        let height = body_rows as u16 + 3;
        let area = Rect::new(0, 0, width, height);

        let header = Row::new(
            self.headers
                .iter()
                .enumerate()
                .map(|(i, h)| aligned_cell(h, i).style(theme.table_header)),
        );

        let mut rows: Vec<Row> = if self.rows.is_empty() {
            vec![Row::new(vec![Cell::from(NO_DATA).style(theme.dim)])]
        } else {
            self.rows
                .iter()
                .enumerate()
                .map(|(n, cells)| {
                    let style = if n % 2 == 0 {
                        theme.table_row
                    } else {
                        theme.table_row_alt
                    };
                    Row::new(self.styled_cells(cells, theme)).style(style)
                })
                .collect()
        };

        if let Some(total) = &self.total {
            rows.push(
                Row::new(widths.iter().map(|w| Cell::from("─".repeat(*w as usize))))
                    .style(theme.table_border),
            );
            rows.push(Row::new(self.styled_cells(total, theme)).style(theme.table_total));
        }

        let table = Table::new(rows, widths.iter().map(|w| Constraint::Length(*w)))
            .header(header)
            .column_spacing(COLUMN_SPACING)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme.table_border)
                    .title(format!(" {} ", self.title))
                    .title_style(theme.header),
            )
            .style(theme.text);

        let mut buf = Buffer::empty(area);
        table.render(area, &mut buf);
        buf
    }

    fn styled_cells<'a>(&self, cells: &'a [String], theme: &Theme) -> Vec<Cell<'a>> {
        cells
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let cell = if i == 0 {
                    Cell::from(truncate_to_width(text, MODEL_COLUMN_MAX))
                } else {
                    aligned_cell(text, i)
                };
                if i > 0 && text.starts_with('-') {
                    cell.style(theme.negative)
                } else {
                    cell
                }
            })
            .collect()
    }
}

const NO_DATA: &str = "(No data)";

fn aligned_cell(text: &str, column: usize) -> Cell<'_> {
    let line = Line::from(text);
    if column == 0 {
        Cell::from(line)
    } else {
        Cell::from(line.alignment(Alignment::Right))
    }
}

/// Cut `text` to at most `max` display columns, marking the cut with `…`.
pub fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

// ── Buffer → lines ────────────────────────────────────────────────────────────

/// Convert a rendered buffer into styled lines, merging runs of equal style
/// and dropping trailing blanks.
///
/// Cells covered by a preceding wide grapheme are skipped so that CJK model
/// names print at their real width.
pub fn buffer_lines(buf: &Buffer) -> Vec<Line<'static>> {
    let area = buf.area;
    (area.top()..area.bottom())
        .map(|y| {
            let mut spans: Vec<Span<'static>> = Vec::new();
            let mut skip = 0usize;
            for x in area.left()..area.right() {
                if skip > 0 {
                    skip -= 1;
                    continue;
                }
                let Some(cell) = buf.cell((x, y)) else {
                    continue;
                };
                let symbol = cell.symbol();
                skip = symbol.width().saturating_sub(1);
                let style = cell.style();
                match spans.last_mut() {
                    Some(last) if last.style == style => last.content.to_mut().push_str(symbol),
                    _ => spans.push(Span::styled(symbol.to_string(), style)),
                }
            }
            trim_line_end(&mut spans);
            Line::from(spans)
        })
        .collect()
}

/// Plain text of a line, without styling.
pub fn plain_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}

fn trim_line_end(spans: &mut Vec<Span<'static>>) {
    while let Some(last) = spans.last_mut() {
        let kept = last.content.trim_end().len();
        if kept == 0 {
            spans.pop();
        } else {
            last.content.to_mut().truncate(kept);
            break;
        }
    }
}

fn to_crossterm(color: Color) -> Option<crossterm::style::Color> {
    use crossterm::style::Color as C;
    Some(match color {
        Color::Reset => return None,
        Color::Black => C::Black,
        Color::Red => C::DarkRed,
        Color::Green => C::DarkGreen,
        Color::Yellow => C::DarkYellow,
        Color::Blue => C::DarkBlue,
        Color::Magenta => C::DarkMagenta,
        Color::Cyan => C::DarkCyan,
        Color::Gray => C::Grey,
        Color::DarkGray => C::DarkGrey,
        Color::LightRed => C::Red,
        Color::LightGreen => C::Green,
        Color::LightYellow => C::Yellow,
        Color::LightBlue => C::Blue,
        Color::LightMagenta => C::Magenta,
        Color::LightCyan => C::Cyan,
        Color::White => C::White,
        Color::Rgb(r, g, b) => C::Rgb { r, g, b },
        Color::Indexed(i) => C::AnsiValue(i),
    })
}

// ── Table builders ────────────────────────────────────────────────────────────

/// Net cost per model and month (rental minus returning) with a TOTAL row.
pub fn overall_summary_table(report: &BudgetReport) -> ReportTable {
    let mut table = ReportTable::new(
        "Overall Summary: Net Monthly Costs (Rental - Returning)",
        month_headers("PC Model", &["Annual Net Cost", "Net Qty"]),
    );

    for record in report.records() {
        let mut cells = vec![record.model.clone(), format_currency(record.unit_price)];
        cells.extend(record.net_cost.iter().map(|c| format_currency(*c)));
        cells.push(format_currency(record.annual_net_cost()));
        cells.push(format_count(record.annual_net_quantity()));
        table.push_row(cells);
    }

    let mut total = vec!["TOTAL".to_string(), String::new()];
    total.extend(report.monthly.iter().map(|m| format_currency(m.net_cost)));
    total.push(format_currency(report.annual.net_cost));
    total.push(format_count(report.annual.net_quantity));
    table.with_total(total)
}

/// Monthly cost per model for one input sheet, at that sheet's own prices.
pub fn sheet_cost_table(title: &str, sheet: &SheetTable) -> ReportTable {
    let mut table = ReportTable::new(title, month_headers("PC Model", &["Annual Total"]));

    for record in sheet.records() {
        let mut cells = vec![record.model().to_string(), format_currency(record.unit_price())];
        cells.extend(record.monthly_cost().iter().map(|c| format_currency(*c)));
        cells.push(format_currency(record.annual_total()));
        table.push_row(cells);
    }

    if sheet.is_empty() {
        return table;
    }
    let mut total = vec!["TOTAL".to_string(), String::new()];
    total.extend(sheet.monthly_cost_totals().iter().map(|c| format_currency(*c)));
    total.push(format_currency(sheet.annual_cost_total()));
    table.with_total(total)
}

/// Rental, returning and net figures per month with the direction of change.
pub fn monthly_breakdown_table(report: &BudgetReport) -> ReportTable {
    let headers = ["Month", "Rental", "Returning", "Net Cost", "Net Qty", "Trend"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let mut table = ReportTable::new("Monthly Breakdown", headers);

    for (i, summary) in report.monthly.iter().enumerate() {
        let trend = match i {
            0 => String::new(),
            _ => report.trend[i - 1].direction.arrow().to_string(),
        };
        table.push_row(vec![
            summary.month.full_name().to_string(),
            format_currency(summary.rental_cost),
            format_currency(summary.returning_cost),
            format_currency(summary.net_cost),
            format_count(summary.net_quantity),
            trend,
        ]);
    }

    let annual = &report.annual;
    table.with_total(vec![
        "Annual".to_string(),
        format_currency(annual.rental_cost),
        format_currency(annual.returning_cost),
        format_currency(annual.net_cost),
        format_count(annual.net_quantity),
        String::new(),
    ])
}

// ── ConsoleReporter ───────────────────────────────────────────────────────────

/// Prints the report to a writer, with or without ANSI styling.
pub struct ConsoleReporter<W: Write> {
    out: W,
    theme: Theme,
    color: bool,
}

impl ConsoleReporter<io::Stdout> {
    /// Reporter on stdout; colour only when stdout is a terminal.
    pub fn stdout(theme: Theme, no_color: bool) -> Self {
        let out = io::stdout();
        let color = !no_color && out.is_terminal();
        Self::new(out, theme, color)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, theme: Theme, color: bool) -> Self {
        Self { out, theme, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print every section up to and including the warning count.
    pub fn print_report(
        &mut self,
        report: &BudgetReport,
        input: &Path,
        run_date: NaiveDate,
    ) -> Result<()> {
        let theme = self.theme.clone();

        self.section(&format!(
            "PC MONTHLY BUDGET CALCULATOR - {}",
            run_date.format("%Y-%m-%d")
        ))?;
        self.write_line(&Line::from(vec![
            Span::styled("Input: ", theme.label),
            Span::styled(input.display().to_string(), theme.text),
        ]))?;
        self.blank()?;

        self.section("SHEET SUMMARY")?;
        self.key_value(
            &format!("{}:", report.rental.name()),
            &format!("{} PC models", report.rental.len()),
        )?;
        self.key_value(
            &format!("{}:", report.returning.name()),
            &format!("{} PC models", report.returning.len()),
        )?;
        self.blank()?;

        self.write_table(&overall_summary_table(report))?;
        self.write_table(&sheet_cost_table(
            &format!("Rental PC: Monthly Costs ({})", report.rental.name()),
            &report.rental,
        ))?;
        self.write_table(&sheet_cost_table(
            &format!("Returning PC: Monthly Costs ({})", report.returning.name()),
            &report.returning,
        ))?;
        self.write_table(&monthly_breakdown_table(report))?;

        self.print_annual(report)?;
        self.print_cost_trend(report)?;
        self.print_warnings(report)?;
        self.flush()
    }

    /// List the sheets of the written workbook.
    pub fn print_sheets_written(&mut self, output: &Path, sheets: &[&str]) -> Result<()> {
        let theme = self.theme.clone();
        self.write_line(&Line::from(vec![
            Span::styled("✓ ", theme.success),
            Span::styled("Excel file created: ", theme.text),
            Span::styled(output.display().to_string(), theme.value),
        ]))?;
        for (i, sheet) in sheets.iter().enumerate() {
            self.write_line(&Line::styled(
                format!("  - Sheet {}: {}", i + 1, sheet),
                theme.dim,
            ))?;
        }
        self.flush()
    }

    /// Print the whole report as pretty JSON.
    pub fn print_json(&mut self, report: &BudgetReport) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.out, report)?;
        writeln!(self.out)?;
        self.flush()
    }

    // ── Sections ──────────────────────────────────────────────────────────────

    fn print_annual(&mut self, report: &BudgetReport) -> Result<()> {
        let annual = &report.annual;
        self.section("ANNUAL SUMMARY")?;
        self.key_value("Total Rental PC Costs:", &format_currency(annual.rental_cost))?;
        self.key_value(
            "Total Returning PC Savings:",
            &format_currency(annual.returning_cost),
        )?;
        let rule = Line::styled("-".repeat(RULE_WIDTH), self.theme.separator);
        self.write_line(&rule)?;
        let total_style = self.theme.table_total;
        self.write_line(&Line::from(vec![
            Span::styled(format!("{:<28}", "TOTAL ANNUAL COST:"), total_style),
            Span::styled(format_currency(annual.net_cost), total_style),
        ]))?;
        self.key_value(
            "Average Monthly Cost:",
            &format_currency(annual.average_monthly_cost),
        )?;
        self.key_value(
            "Average Monthly PCs:",
            &format_number(annual.average_monthly_quantity, 1),
        )?;
        self.rule()?;
        self.blank()
    }

    fn print_cost_trend(&mut self, report: &BudgetReport) -> Result<()> {
        let change = &report.cost_change;
        let theme = self.theme.clone();

        self.write_line(&Line::styled(
            "Cost Trend (First vs Last Month):",
            theme.header,
        ))?;
        self.key_value(
            &format!("  First month ({}):", Month::Jan.abbreviation()),
            &format_currency(change.first),
        )?;
        self.key_value(
            &format!("  Last month ({}):", Month::Dec.abbreviation()),
            &format_currency(change.last),
        )?;

        let style = if change.change > Decimal::ZERO {
            theme.trend_up
        } else if change.change < Decimal::ZERO {
            theme.trend_down
        } else {
            theme.value
        };
        let mut figure = format_signed_currency(change.change);
        if let Some(pct) = change.change_pct {
            figure.push_str(&format!(" ({})", format_percent_change(pct)));
        }
        self.write_line(&Line::from(vec![
            Span::styled(format!("{:<28}", "  Change:"), theme.label),
            Span::styled(figure, style),
        ]))?;
        self.blank()
    }

    fn print_warnings(&mut self, report: &BudgetReport) -> Result<()> {
        if report.warning_count == 0 {
            return Ok(());
        }
        let theme = self.theme.clone();
        self.write_line(&Line::styled(
            format!(
                "⚠ {} row value(s) could not be read and were treated as 0 or skipped:",
                report.warning_count
            ),
            theme.warning,
        ))?;
        for warning in report.warnings() {
            self.write_line(&Line::styled(format!("  - {warning}"), theme.dim))?;
        }
        self.blank()
    }

    // ── Primitives ────────────────────────────────────────────────────────────

    fn section(&mut self, title: &str) -> Result<()> {
        let header = self.theme.header;
        self.rule()?;
        self.write_line(&Line::styled(title.to_string(), header))?;
        self.rule()
    }

    fn rule(&mut self) -> Result<()> {
        let line = Line::styled("=".repeat(RULE_WIDTH), self.theme.separator);
        self.write_line(&line)
    }

    fn blank(&mut self) -> Result<()> {
        self.write_line(&Line::default())
    }

    fn key_value(&mut self, key: &str, value: &str) -> Result<()> {
        let line = Line::from(vec![
            Span::styled(format!("{key:<28}"), self.theme.label),
            Span::styled(value.to_string(), self.theme.value),
        ]);
        self.write_line(&line)
    }

    fn write_table(&mut self, table: &ReportTable) -> Result<()> {
        let buf = table.render(&self.theme);
        for line in buffer_lines(&buf) {
            self.write_line(&line)?;
        }
        self.blank()
    }

    fn write_line(&mut self, line: &Line<'_>) -> Result<()> {
        if !self.color {
            writeln!(self.out, "{}", plain_text(line))?;
            return Ok(());
        }
        for span in &line.spans {
            let style: Style = line.style.patch(span.style);
            if let Some(fg) = style.fg.and_then(to_crossterm) {
                queue!(self.out, SetForegroundColor(fg))?;
            }
            if style.add_modifier.contains(Modifier::BOLD) {
                queue!(self.out, SetAttribute(Attribute::Bold))?;
            }
            queue!(
                self.out,
                Print(span.content.as_ref()),
                SetAttribute(Attribute::Reset)
            )?;
        }
        queue!(self.out, Print("\n"))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
