//! Actuation control algorithms.

pub mod sweep;
