//! Classroom attendance tracking: roster expansion, per-session aggregation,
//! and the percentages, marks and cohorts derived from them.
//!
//! The core (`roster`, `aggregate`, `metrics`) is pure. `db` is the Postgres
//! glue used by the `roll-call` binary.

pub mod aggregate;
pub mod class_code;
pub mod combined;
pub mod db;
pub mod error;
pub mod metrics;
pub mod models;
pub mod report;
pub mod roster;
pub mod sheet;

/// Session columns shown on a printable roll sheet.
pub const SHEET_MAX_SESSIONS: usize = 24;

/// Sessions shown in trend views.
pub const TREND_WINDOW: usize = 30;

/// Rows per page of the combined attendance sheet.
pub const COMBINED_ROWS_PER_PAGE: usize = 30;
