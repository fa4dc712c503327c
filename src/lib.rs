//! athena-lens - read-only Athena queries for agents, plus chart extraction
//! from their answers.
//!
//! This library exposes the core modules for the binary and integration tests.

pub mod answer;
pub mod athena;
pub mod chart;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod query;
pub mod safety;
pub mod tools;
