use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::months::Month;

/// All fatal errors produced by the PC budget calculator.
#[derive(Error, Debug)]
pub enum BudgetError {
    /// The input workbook does not exist.
    #[error("Input file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The input workbook exists but could not be opened or parsed.
    #[error("Failed to read workbook {}: {message}", path.display())]
    WorkbookRead { path: PathBuf, message: String },

    /// A sheet is missing required columns, or the workbook is missing sheets.
    #[error("Schema error in sheet '{sheet}': {reason}")]
    Schema { sheet: String, reason: String },

    /// The output workbook could not be serialized.
    #[error("Failed to write workbook: {0}")]
    WorkbookWrite(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BudgetError {
    /// Shorthand for [`BudgetError::Schema`].
    pub fn schema(sheet: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            sheet: sheet.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code for this error.
    ///
    /// * `2` – input missing or unreadable
    /// * `3` – schema error
    /// * `1` – anything else
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::FileNotFound(_) | Self::WorkbookRead { .. } => 2,
            Self::Schema { .. } => 3,
            _ => 1,
        }
    }
}

/// Convenience alias used throughout the budget crates.
pub type Result<T> = std::result::Result<T, BudgetError>;

// ── Row warnings ──────────────────────────────────────────────────────────────

/// What was wrong with a row or cell that the loader recovered from.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// The row has data but no model name; the whole row was skipped.
    MissingModel,
    /// A month cell held something other than a non-negative whole number.
    InvalidQuantity { month: Month, raw: String },
    /// The unit price cell held something other than a non-negative number.
    InvalidPrice { raw: String },
}

/// A recoverable problem found while loading one sheet.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RowWarning {
    /// Name of the sheet the row belongs to.
    pub sheet: String,
    /// 1-based spreadsheet row number.
    pub row: u32,
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl fmt::Display for RowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} row {}: ", self.sheet, self.row)?;
        match &self.kind {
            WarningKind::MissingModel => write!(f, "missing PC model, row skipped"),
            WarningKind::InvalidQuantity { month, raw } => {
                write!(f, "invalid {} quantity '{}', treated as 0", month, raw)
            }
            WarningKind::InvalidPrice { raw } => {
                write!(f, "invalid unit price '{}', treated as 0", raw)
            }
        }
    }
}
