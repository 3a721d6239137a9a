//! Adapter implementations
//!
//! - DuckDB for the Repository port
//! - Demo data for demo mode

pub mod demo;
pub mod duckdb;
