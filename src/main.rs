//! VitalVent firmware — main entry point.
//!
//! Hexagonal architecture with a tick-driven control loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                  │
//! │                                                          │
//! │  HardwareAdapter      LogEventSink      EspHttpServer    │
//! │  (Sensor+Actuator)    (EventSink)       (api::dispatch)  │
//! │                                                          │
//! │  ─────────────── Port Trait Boundary ────────────────    │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────┐      │
//! │  │            AppService (pure logic)             │      │
//! │  │  FSM · Sweep · Vitals supervisor · Thresholds  │      │
//! │  └────────────────────────────────────────────────┘      │
//! │                                                          │
//! │  OximeterFrontEnd ──▶ SampleRing ──▶ control tick        │
//! └──────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::http::server::{Configuration as HttpConfig, EspHttpServer};
use esp_idf_svc::http::Method as HttpMethod;
use esp_idf_svc::io::{Read as _, Write as _};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use vitalvent::adapters::{HardwareAdapter, LogEventSink};
use vitalvent::api::{self, FormParams, Request};
use vitalvent::app::events::AppEvent;
use vitalvent::app::service::AppService;
use vitalvent::config::SystemConfig;
use vitalvent::drivers::hw_init;
use vitalvent::sensors::oximeter::OximeterFrontEnd;
use vitalvent::vitals;

/// Attempts before peripheral bring-up is declared fatal.
const INIT_ATTEMPTS: u32 = 3;
/// Backoff between bring-up attempts (ms).
const INIT_RETRY_DELAY_MS: u32 = 500;

/// Station credentials are baked in at build time; without them the
/// device runs headless (control loop only, no API).
const WIFI_SSID: Option<&str> = option_env!("VITALVENT_WIFI_SSID");
const WIFI_PASSWORD: Option<&str> = option_env!("VITALVENT_WIFI_PASSWORD");

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("VitalVent v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 2. Supervised peripheral bring-up ─────────────────────
    // A transient bus glitch at power-on should not brick the device;
    // retry with backoff, then fail loudly so the supervisor (or the
    // IDF panic handler) can reset us.
    init_peripherals_supervised()?;

    // ── 3. Oximeter front end (non-fatal if absent) ───────────
    let mut oximeter = match OximeterFrontEnd::init() {
        Ok(fe) => Some(fe),
        Err(e) => {
            error!("oximeter init failed ({e}); running without vitals intake");
            None
        }
    };

    // ── 4. Application service ────────────────────────────────
    let config = SystemConfig::default();
    let tick_ms = config.control_loop_interval_ms;
    let ticks_per_telemetry =
        u64::from(config.telemetry_interval_secs) * 1000 / u64::from(tick_ms.max(1));

    let app = Arc::new(Mutex::new(AppService::new(config)));
    let mut hw = HardwareAdapter::new();
    let mut log_sink = LogEventSink;

    match app.lock() {
        Ok(mut a) => a.start(&mut log_sink),
        Err(_) => return Err(anyhow!("app mutex poisoned before start")),
    }

    // ── 5. Network + config API ───────────────────────────────
    // Transport failures leave the device running headless; the control
    // loop and safety paths do not depend on the network.
    let peripherals = Peripherals::take().context("peripherals already taken")?;
    let _net = match bring_up_network(peripherals.modem) {
        Ok(wifi) => {
            let server = start_http_server(Arc::clone(&app))?;
            Some((wifi, server))
        }
        Err(e) => {
            warn!("network unavailable ({e}); config API disabled");
            None
        }
    };

    info!("system ready, entering control loop ({tick_ms} ms tick)");

    // ── 6. Control loop ───────────────────────────────────────
    let mut telemetry_counter: u64 = 0;
    loop {
        FreeRtos::delay_ms(tick_ms);

        // Pump the oximeter FIFO; beats land in the intake ring.
        if let Some(fe) = oximeter.as_mut() {
            fe.service();
        }

        let Ok(mut app) = app.lock() else {
            return Err(anyhow!("app mutex poisoned in control loop"));
        };
        app.tick(vitals::intake(), &mut hw, &mut log_sink);

        telemetry_counter += 1;
        if telemetry_counter >= ticks_per_telemetry {
            telemetry_counter = 0;
            let t = app.build_telemetry(vitals::dropped_count());
            log_sink.emit(&AppEvent::Telemetry(t));
        }
    }
}

/// Retry peripheral bring-up with backoff before giving up.
fn init_peripherals_supervised() -> Result<()> {
    let mut last_err = None;
    for attempt in 1..=INIT_ATTEMPTS {
        match hw_init::init_peripherals() {
            Ok(()) => {
                info!("peripherals initialised (attempt {attempt})");
                return Ok(());
            }
            Err(e) => {
                warn!("peripheral init attempt {attempt}/{INIT_ATTEMPTS} failed: {e}");
                last_err = Some(e);
                FreeRtos::delay_ms(INIT_RETRY_DELAY_MS);
            }
        }
    }
    Err(anyhow!(
        "peripheral bring-up failed after {INIT_ATTEMPTS} attempts: {}",
        last_err.map_or_else(|| "unknown".into(), |e| e.to_string())
    ))
}

/// Connect the WiFi station with build-time credentials.
fn bring_up_network(
    modem: esp_idf_hal::modem::Modem,
) -> Result<BlockingWifi<EspWifi<'static>>> {
    let (Some(ssid), Some(password)) = (WIFI_SSID, WIFI_PASSWORD) else {
        return Err(anyhow!("no WiFi credentials baked into this build"));
    };

    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(modem, sysloop.clone(), Some(nvs))?,
        sysloop,
    )?;

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid.try_into().map_err(|_| anyhow!("SSID too long"))?,
        password: password.try_into().map_err(|_| anyhow!("password too long"))?,
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;

    info!("WiFi connected, station up");
    Ok(wifi)
}

/// Register the config-API routes onto an embedded HTTP server.  Each
/// handler parses the transport request into an [`api::Request`] and runs
/// it through the shared router.
fn start_http_server(app: Arc<Mutex<AppService>>) -> Result<EspHttpServer<'static>> {
    let mut server = EspHttpServer::new(&HttpConfig::default())?;

    for path in ["/toggle/motor", "/get/warning", "/get_rpm", "/get/status"] {
        let app = Arc::clone(&app);
        server.fn_handler::<anyhow::Error, _>(path, HttpMethod::Get, move |http_req| {
            let out = {
                let mut app = app.lock().map_err(|_| anyhow!("app mutex poisoned"))?;
                api::dispatch(&Request::get(path), &mut app)
            };
            let mut resp = http_req.into_status_response(out.status)?;
            resp.write_all(out.body.as_bytes())?;
            Ok(())
        })?;
    }

    for path in ["/set/values", "/set/warning"] {
        let app = Arc::clone(&app);
        server.fn_handler::<anyhow::Error, _>(path, HttpMethod::Post, move |mut http_req| {
            let mut buf = [0u8; 512];
            let mut read = 0;
            while read < buf.len() {
                let n = http_req.read(&mut buf[read..])?;
                if n == 0 {
                    break;
                }
                read += n;
            }
            let body = core::str::from_utf8(&buf[..read]).unwrap_or("");
            let form = FormParams::parse(body);
            let pairs = form.pairs();

            let out = {
                let mut app = app.lock().map_err(|_| anyhow!("app mutex poisoned"))?;
                api::dispatch(&Request::post(path, &pairs), &mut app)
            };
            let mut resp = http_req.into_status_response(out.status)?;
            resp.write_all(out.body.as_bytes())?;
            Ok(())
        })?;
    }

    info!("config API listening on port 80");
    Ok(server)
}
