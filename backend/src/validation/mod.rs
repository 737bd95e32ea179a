//! Reusable validation rules shared across request payloads.

pub mod rules;

pub use validator::Validate;
