//! Shared domain models and validation for the billing settings service.

pub mod models;
pub mod validation;
