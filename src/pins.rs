//! GPIO / peripheral pin assignments for the VitalVent main board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Fan servo (SG90-class, LEDC PWM at 50 Hz)
// ---------------------------------------------------------------------------

/// LEDC PWM output for the servo signal line.
pub const SERVO_PWM_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// Alert buzzer
// ---------------------------------------------------------------------------

/// Digital output: HIGH = buzzer sounding (active-high piezo driver).
pub const BUZZER_GPIO: i32 = 19;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// DHT22 ambient temperature sensor — single-wire data line.
pub const DHT_DATA_GPIO: i32 = 5;

/// MAX30100 pulse oximeter — I²C bus.
pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits) for the servo channel.  14-bit gives
/// 0.06 % duty granularity at 50 Hz — comfortably sub-degree.
pub const SERVO_PWM_RESOLUTION_BITS: u32 = 14;
/// Standard hobby-servo frame rate.
pub const SERVO_PWM_FREQ_HZ: u32 = 50;
/// Servo pulse width at 0 degrees (microseconds).
pub const SERVO_MIN_PULSE_US: u32 = 500;
/// Servo pulse width at 180 degrees (microseconds).
pub const SERVO_MAX_PULSE_US: u32 = 2500;
