//! PatternLab Core: series model, pivot geometry, chart-pattern strategies
//! and signal aggregation.
//!
//! This crate is pure computation:
//! - Domain types (bars, validated series, fundamentals, signals)
//! - Indicators and statistics helpers
//! - Pivot scans, the pivot arena and tolerance clustering
//! - Eight pattern strategies behind the `Strategy` contract
//! - Renderer-agnostic chart overlays
//! - Signal aggregation
//! - Data ports implemented by adapters outside the core

pub mod aggregate;
pub mod chart;
pub mod data;
pub mod domain;
pub mod fingerprint;
pub mod geometry;
pub mod indicators;
pub mod strategy;
