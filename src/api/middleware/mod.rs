//! Intake API middleware.

pub mod audit;
