//! PC budget calculator: command-line entry points and the run pipeline.

pub mod bootstrap;
pub mod pipeline;
