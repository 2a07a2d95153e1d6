//! Sensor front ends.
//!
//! Each sensor follows the dual-target pattern: on ESP-IDF it talks to the
//! real bus through `hw_init` helpers; on host targets it reads injected
//! values so the logic above it is testable without hardware.

pub mod oximeter;
pub mod temperature;

pub use oximeter::BeatDetector;
pub use temperature::Dht22Sensor;
