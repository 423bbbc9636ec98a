//! Domain model for tracked pages and their features.
//!
//! # Responsibility
//! - Define the canonical page/feature records used across core modules.
//!
//! # Invariants
//! - Pages own their features; there is no separate feature registry.
//! - Page and feature ids are drawn from one UUID space.

pub mod page;
