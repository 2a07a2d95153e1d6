//! Hardware drivers: peripheral bring-up and the two actuators.

pub mod alert;
pub mod hw_init;
pub mod servo;

pub use alert::AlertBuzzer;
pub use hw_init::HwInitError;
pub use servo::ServoDriver;
