//! Domain models for the billing settings service

mod billing;

pub use billing::*;
