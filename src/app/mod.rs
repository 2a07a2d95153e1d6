//! Application layer: hexagonal core plus its port boundary.

pub mod events;
pub mod ports;
pub mod service;
