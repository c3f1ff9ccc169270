//! Core logic: parsing, extraction, resolution, planning, lifecycle, state.

pub mod error;
pub mod executor;
pub mod extractor;
pub mod parser;
pub mod planner;
pub mod resolver;
pub mod settings;
pub mod state;
pub mod symbols;
pub mod types;
pub mod wait;
