//! Report layer for the PC budget calculator.
//!
//! Console tables (laid out with [`ratatui`], printed through [`crossterm`]),
//! the four-sheet results workbook and the blank input template.

pub mod console;
pub mod template;
pub mod themes;
pub mod workbook;

pub use budget_core as core;
