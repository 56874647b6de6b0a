//! Data layer for the PC budget calculator.
//!
//! Loads the rental and returning sheets from the input workbook, aligns them
//! by model and month, and produces the annual and trend figures consumed by
//! the report layer.

pub mod aggregator;
pub mod analysis;
pub mod reader;

pub use budget_core as core;
