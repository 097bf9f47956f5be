//! Shared utilities for the ChurchDonate backend.
//!
//! This crate contains:
//! - JWT token minting and verification
//! - Password hashing (Argon2id)
//! - Secret-token hashing helpers
//! - Public ID and slug generation
//! - Common validation helpers

pub mod crypto;
pub mod ids;
pub mod jwt;
pub mod password;
pub mod validation;
