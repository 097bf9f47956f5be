//! Domain layer for the ChurchDonate backend.
//!
//! This crate contains:
//! - Domain models (Church, Operator)
//! - Request/response payloads with validation
//! - Public projections of tenant data

pub mod models;
