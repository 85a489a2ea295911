//! Dryness and wind alert service.
//!
//! Reads the JMA daily and rolling-window precipitation tables for one
//! station plus the prefecture warning feed, and derives a three-level alert
//! (none / caution / alert) for the configured area.
//!
//! - `model`    — shared domain types and errors
//! - `config`   — `monitor.toml` loading and validation
//! - `logging`  — tracing setup and failure classification
//! - `ingest`   — fetching, table extraction, feed classification
//! - `alert`    — the decision table
//! - `pipeline` — one end-to-end run
//! - `report`   — published record and history files
//! - `replay`   — recorded-document development mode
//! - `verify`   — source verification against the live pages

pub mod alert;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod replay;
pub mod report;
pub mod verify;
