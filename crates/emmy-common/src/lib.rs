//! Common types and utilities for the emmy type engine.
//!
//! This crate provides foundational types used across all emmy crates:
//! - Identifiers for files and syntax nodes (`FileId`, `NodeId`)
//! - Shared names (`Name`) and well-known words of the language
//! - Recursion limits and thresholds
//! - The read-only inference `Settings` surface

// File / node identifiers and shared names
pub mod ids;
pub use ids::{FileId, Name, NodeId};

// Well-known words (`self`, `_G`, ...)
pub mod words;

// Centralized limits and thresholds
pub mod limits;

// Inference settings (import-like calls, constructor names, ...)
pub mod settings;
pub use settings::Settings;
