//! One-shot peripheral bring-up plus the raw register-level helpers the
//! drivers and sensors build on.
//!
//! All ESP-IDF calls live here so the rest of the crate can stay free of
//! `unsafe`.  On host targets `init_peripherals` is a no-op and the raw
//! helpers are absent — host code paths never reach them.

use core::fmt;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys;

#[cfg(target_os = "espidf")]
use crate::pins;

/// Errors surfaced by peripheral bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    LedcTimer,
    LedcChannel,
    Gpio,
    I2cBus,
}

impl fmt::Display for HwInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LedcTimer => write!(f, "LEDC timer configuration failed"),
            Self::LedcChannel => write!(f, "LEDC channel configuration failed"),
            Self::Gpio => write!(f, "GPIO configuration failed"),
            Self::I2cBus => write!(f, "I2C bus installation failed"),
        }
    }
}

impl std::error::Error for HwInitError {}

/// Configure every peripheral the device uses: the servo PWM channel, the
/// alert buzzer line, and the oximeter I²C bus.  Call once at startup,
/// before constructing any driver.
#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    init_servo_pwm()?;
    init_buzzer_gpio()?;
    init_i2c_bus()?;
    Ok(())
}

/// Host build: nothing to bring up.
#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    Ok(())
}

// ── ESP-IDF implementation ────────────────────────────────────

#[cfg(target_os = "espidf")]
const I2C_PORT: i32 = 0;
#[cfg(target_os = "espidf")]
const I2C_TIMEOUT_TICKS: u32 = 100;

#[cfg(target_os = "espidf")]
fn init_servo_pwm() -> Result<(), HwInitError> {
    let timer_cfg = sys::ledc_timer_config_t {
        speed_mode: sys::ledc_mode_t_LEDC_LOW_SPEED_MODE,
        duty_resolution: pins::SERVO_PWM_RESOLUTION_BITS as sys::ledc_timer_bit_t,
        timer_num: sys::ledc_timer_t_LEDC_TIMER_0,
        freq_hz: pins::SERVO_PWM_FREQ_HZ,
        clk_cfg: sys::ledc_clk_cfg_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: valid config struct, called once before any channel use.
    if unsafe { sys::ledc_timer_config(&timer_cfg) } != sys::ESP_OK {
        return Err(HwInitError::LedcTimer);
    }

    let channel_cfg = sys::ledc_channel_config_t {
        gpio_num: pins::SERVO_PWM_GPIO,
        speed_mode: sys::ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel: sys::ledc_channel_t_LEDC_CHANNEL_0,
        intr_type: sys::ledc_intr_type_t_LEDC_INTR_DISABLE,
        timer_sel: sys::ledc_timer_t_LEDC_TIMER_0,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    };
    // SAFETY: timer 0 configured above.
    if unsafe { sys::ledc_channel_config(&channel_cfg) } != sys::ESP_OK {
        return Err(HwInitError::LedcChannel);
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
fn init_buzzer_gpio() -> Result<(), HwInitError> {
    let cfg = sys::gpio_config_t {
        pin_bit_mask: 1u64 << pins::BUZZER_GPIO,
        mode: sys::gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: sys::gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: sys::gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: mask names a single valid output-capable pin.
    if unsafe { sys::gpio_config(&cfg) } != sys::ESP_OK {
        return Err(HwInitError::Gpio);
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
const I2C_CLOCK_HZ: u32 = 100_000;

#[cfg(target_os = "espidf")]
fn init_i2c_bus() -> Result<(), HwInitError> {
    let mut cfg = sys::i2c_config_t::default();
    cfg.mode = sys::i2c_mode_t_I2C_MODE_MASTER;
    cfg.sda_io_num = pins::I2C_SDA_GPIO;
    cfg.scl_io_num = pins::I2C_SCL_GPIO;
    cfg.sda_pullup_en = true;
    cfg.scl_pullup_en = true;
    cfg.__bindgen_anon_1.master.clk_speed = I2C_CLOCK_HZ;
    // SAFETY: config points at valid pins; port 0 is otherwise unused.
    unsafe {
        if sys::i2c_param_config(I2C_PORT, &cfg) != sys::ESP_OK {
            return Err(HwInitError::I2cBus);
        }
        if sys::i2c_driver_install(I2C_PORT, sys::i2c_mode_t_I2C_MODE_MASTER, 0, 0, 0)
            != sys::ESP_OK
        {
            return Err(HwInitError::I2cBus);
        }
    }
    Ok(())
}

// ── Raw helpers (ESP-IDF only) ────────────────────────────────

/// Set the servo channel's duty in timer counts and latch it.
#[cfg(target_os = "espidf")]
pub fn ledc_set_duty(duty: u32) -> bool {
    // SAFETY: channel 0 was configured by init_peripherals.
    unsafe {
        sys::ledc_set_duty(
            sys::ledc_mode_t_LEDC_LOW_SPEED_MODE,
            sys::ledc_channel_t_LEDC_CHANNEL_0,
            duty,
        ) == sys::ESP_OK
            && sys::ledc_update_duty(
                sys::ledc_mode_t_LEDC_LOW_SPEED_MODE,
                sys::ledc_channel_t_LEDC_CHANNEL_0,
            ) == sys::ESP_OK
    }
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) -> bool {
    // SAFETY: pin is one of the constants in `pins`.
    unsafe { sys::gpio_set_level(pin, u32::from(high)) == sys::ESP_OK }
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: reading a level has no preconditions.
    unsafe { sys::gpio_get_level(pin) != 0 }
}

#[cfg(target_os = "espidf")]
pub fn gpio_set_output(pin: i32) {
    // SAFETY: open-drain so the DHT can pull the shared line.
    unsafe {
        sys::gpio_set_direction(pin, sys::gpio_mode_t_GPIO_MODE_OUTPUT_OD);
    }
}

#[cfg(target_os = "espidf")]
pub fn gpio_set_input(pin: i32) {
    // SAFETY: direction change only.
    unsafe {
        sys::gpio_set_direction(pin, sys::gpio_mode_t_GPIO_MODE_INPUT);
    }
}

/// Busy-wait; only safe for the few-hundred-µs windows the DHT needs.
#[cfg(target_os = "espidf")]
pub fn delay_us(us: u32) {
    // SAFETY: pure spin delay.
    unsafe { sys::esp_rom_delay_us(us) }
}

/// Monotonic microseconds since boot.
#[cfg(target_os = "espidf")]
pub fn now_us() -> i64 {
    // SAFETY: esp_timer is started by the IDF runtime before main.
    unsafe { sys::esp_timer_get_time() }
}

#[cfg(target_os = "espidf")]
pub fn i2c_write_reg(addr: u8, reg: u8, value: u8) -> Result<(), ()> {
    let payload = [reg, value];
    // SAFETY: buffer outlives the call; driver installed at init.
    let rc = unsafe {
        sys::i2c_master_write_to_device(
            I2C_PORT,
            addr,
            payload.as_ptr(),
            payload.len(),
            I2C_TIMEOUT_TICKS,
        )
    };
    if rc == sys::ESP_OK {
        Ok(())
    } else {
        Err(())
    }
}

#[cfg(target_os = "espidf")]
pub fn i2c_read_regs(addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), ()> {
    // SAFETY: buffers outlive the call; driver installed at init.
    let rc = unsafe {
        sys::i2c_master_write_read_device(
            I2C_PORT,
            addr,
            &reg,
            1,
            buf.as_mut_ptr(),
            buf.len(),
            I2C_TIMEOUT_TICKS,
        )
    };
    if rc == sys::ESP_OK {
        Ok(())
    } else {
        Err(())
    }
}
