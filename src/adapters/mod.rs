//! Driven adapters binding the port traits to real peripherals and logs.

pub mod hardware;
pub mod log_sink;

pub use hardware::HardwareAdapter;
pub use log_sink::LogEventSink;
