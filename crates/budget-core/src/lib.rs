//! Core domain types for the PC budget calculator.
//!
//! Holds the month calendar, per-sheet and net records, the header-alias
//! table used by the loader, money formatting, the error taxonomy and the
//! command-line settings shared by both binaries.

pub mod columns;
pub mod error;
pub mod formatting;
pub mod models;
pub mod months;
pub mod settings;

pub use error::{BudgetError, Result};
