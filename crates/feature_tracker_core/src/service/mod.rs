//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and reconciliation into use-case APIs.
//! - Keep front ends decoupled from storage details.

pub mod statistics;
pub mod tracker_service;
