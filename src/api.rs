//! Configuration API router.
//!
//! **Transport-decoupled**: the router does not own a listener.  The HTTP
//! adapter (ESP-IDF server threads) parses each request into a
//! [`Request`] — method, path, decoded form/query params — and feeds it to
//! [`dispatch`], which translates it into [`AppService`] calls and returns a
//! plain [`Response`].  Host tests drive the router the same way, with no
//! network stack in the loop.
//!
//! Response bodies mirror the text the operator dashboard expects; the
//! status endpoint adds a JSON snapshot for richer polling clients.

use core::fmt::Write as _;

use heapless::String;

use crate::app::service::AppService;
use crate::error::Error;
use crate::vitals;

/// Maximum response body length.
pub const BODY_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One decoded request: the transport adapter has already split the
/// urlencoded parameters into key/value pairs.
pub struct Request<'a> {
    pub method: Method,
    pub path: &'a str,
    pub params: &'a [(&'a str, &'a str)],
}

impl<'a> Request<'a> {
    pub fn get(path: &'a str) -> Self {
        Self {
            method: Method::Get,
            path,
            params: &[],
        }
    }

    pub fn post(path: &'a str, params: &'a [(&'a str, &'a str)]) -> Self {
        Self {
            method: Method::Post,
            path,
            params,
        }
    }

    fn param(&self, name: &str) -> Option<&'a str> {
        self.params
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
    }
}

/// Status + body, ready for the transport adapter to serialise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String<BODY_CAPACITY>,
}

impl Response {
    fn with(status: u16, body: &str) -> Self {
        let mut s: String<BODY_CAPACITY> = String::new();
        let take = body.len().min(BODY_CAPACITY);
        // Body texts are ASCII except operator warnings, which the mailbox
        // already bounds below this capacity.
        let _ = s.push_str(&body[..take]);
        Self { status, body: s }
    }

    fn ok(body: &str) -> Self {
        Self::with(200, body)
    }

    fn bad_request(body: &str) -> Self {
        Self::with(400, body)
    }

    fn not_found() -> Self {
        Self::with(404, "Not found")
    }
}

/// Route one request into the application service.
pub fn dispatch(req: &Request<'_>, app: &mut AppService) -> Response {
    match (req.method, req.path) {
        (Method::Get, "/toggle/motor") => toggle_motor(app),
        (Method::Post, "/set/values") => set_values(req, app),
        (Method::Post, "/set/warning") => set_warning(req, app),
        (Method::Get, "/get/warning") => Response::ok(app.take_warning().as_str()),
        (Method::Get, "/get_rpm") => {
            let mut body: String<BODY_CAPACITY> = String::new();
            let _ = write!(body, "{:.2}", app.display_rpm());
            Response { status: 200, body }
        }
        (Method::Get, "/get/status") => status(app),
        _ => Response::not_found(),
    }
}

// ── Handlers ──────────────────────────────────────────────────

fn toggle_motor(app: &mut AppService) -> Response {
    match app.toggle_motor() {
        Ok(true) => Response::ok("Motor is ON"),
        Ok(false) => Response::ok("Motor is OFF"),
        Err(_) => Response::bad_request(
            "Input values not set. Please enter valid values for oxygen and pulse rate.",
        ),
    }
}

fn set_values(req: &Request<'_>, app: &mut AppService) -> Response {
    let (Some(min_o), Some(max_o), Some(min_p), Some(max_p)) = (
        req.param("minOxygen"),
        req.param("maxOxygen"),
        req.param("minPulseRate"),
        req.param("maxPulseRate"),
    ) else {
        return Response::bad_request("Missing parameters");
    };

    // Unparseable or type-overflowing values fail the same way as
    // out-of-range ones: the operator sees one consistent message.
    let parsed = (
        min_o.trim().parse::<u8>(),
        max_o.trim().parse::<u8>(),
        min_p.trim().parse::<u16>(),
        max_p.trim().parse::<u16>(),
    );
    let (Ok(min_o), Ok(max_o), Ok(min_p), Ok(max_p)) = parsed else {
        return Response::bad_request(
            "Invalid input values. Please check the ranges and ensure min and max values are not equal.",
        );
    };

    match app.set_thresholds(min_o, max_o, min_p, max_p) {
        Ok(()) => Response::ok("Values updated"),
        Err(Error::Validation(reason)) => {
            let mut body: String<BODY_CAPACITY> = String::new();
            let _ = write!(body, "Invalid input values: {reason}");
            Response { status: 400, body }
        }
        Err(e) => {
            let mut body: String<BODY_CAPACITY> = String::new();
            let _ = write!(body, "{e}");
            Response { status: 400, body }
        }
    }
}

fn set_warning(req: &Request<'_>, app: &mut AppService) -> Response {
    match req.param("message") {
        Some(message) => {
            app.post_warning(message);
            Response::ok("Warning message received")
        }
        None => Response::bad_request("Missing message parameter"),
    }
}

fn status(app: &mut AppService) -> Response {
    let t = app.build_telemetry(vitals::dropped_count());
    let json = serde_json::json!({
        "state": t.state.name(),
        "temperature_c": t.temperature_c,
        "display_rpm": t.display_rpm,
        "motor_enabled": t.motor_enabled,
        "fault_flags": t.fault_flags,
        "warning_pending": t.warning_pending,
        "samples_dropped": t.samples_dropped,
    });
    match serde_json::to_string(&json) {
        Ok(s) => Response::ok(&s),
        Err(_) => Response::with(500, "status serialisation failed"),
    }
}

// ── Urlencoded parameter decoding ─────────────────────────────

/// Maximum number of parameters per request.
pub const MAX_PARAMS: usize = 8;
/// Capacity of a decoded parameter name.
pub const PARAM_KEY_CAPACITY: usize = 32;
/// Capacity of a decoded parameter value (bounded by the warning mailbox).
pub const PARAM_VALUE_CAPACITY: usize = crate::mailbox::WARNING_CAPACITY;

/// Decoded `application/x-www-form-urlencoded` parameters.
///
/// Owns its strings so the transport's receive buffer can be released
/// before dispatch.  Oversized or non-UTF-8 pairs are silently dropped —
/// the handlers then report them as missing.
#[derive(Default)]
pub struct FormParams {
    pairs: heapless::Vec<
        (String<PARAM_KEY_CAPACITY>, String<PARAM_VALUE_CAPACITY>),
        MAX_PARAMS,
    >,
}

impl FormParams {
    /// Parse a raw urlencoded string (`a=1&b=hi+there&c=%21`).
    pub fn parse(raw: &str) -> Self {
        let mut pairs = heapless::Vec::new();
        for piece in raw.split('&') {
            let Some((key, value)) = piece.split_once('=') else {
                continue;
            };
            let (Some(key), Some(value)) = (decode(key), decode(value)) else {
                continue;
            };
            if pairs.push((key, value)).is_err() {
                break;
            }
        }
        Self { pairs }
    }

    /// Borrow the decoded pairs for [`Request::post`].
    pub fn pairs(&self) -> heapless::Vec<(&str, &str), MAX_PARAMS> {
        self.pairs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Percent-decode one urlencoded token (`+` is a space).  `None` on
/// overflow or invalid UTF-8.
fn decode<const N: usize>(raw: &str) -> Option<String<N>> {
    let mut buf: heapless::Vec<u8, N> = heapless::Vec::new();
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let byte = match bytes[i] {
            b'+' => b' ',
            b'%' if i + 2 < bytes.len() => {
                match (hex_nibble(bytes[i + 1]), hex_nibble(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        i += 2;
                        hi << 4 | lo
                    }
                    _ => b'%',
                }
            }
            other => other,
        };
        buf.push(byte).ok()?;
        i += 1;
    }
    let mut out: String<N> = String::new();
    out.push_str(core::str::from_utf8(&buf).ok()?).ok()?;
    Some(out)
}

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SystemConfig;

    fn make_app() -> AppService {
        AppService::new(SystemConfig::default())
    }

    const VALID: &[(&str, &str)] = &[
        ("minOxygen", "90"),
        ("maxOxygen", "100"),
        ("minPulseRate", "60"),
        ("maxPulseRate", "120"),
    ];

    #[test]
    fn toggle_before_configuration_is_rejected() {
        let mut app = make_app();
        let resp = dispatch(&Request::get("/toggle/motor"), &mut app);
        assert_eq!(resp.status, 400);
        assert!(resp.body.contains("Input values not set"));
    }

    #[test]
    fn set_values_then_toggle_round_trip() {
        let mut app = make_app();
        let resp = dispatch(&Request::post("/set/values", VALID), &mut app);
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body.as_str(), "Values updated");

        let resp = dispatch(&Request::get("/toggle/motor"), &mut app);
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body.as_str(), "Motor is ON");

        let resp = dispatch(&Request::get("/toggle/motor"), &mut app);
        assert_eq!(resp.body.as_str(), "Motor is OFF");
    }

    #[test]
    fn set_values_missing_parameter() {
        let mut app = make_app();
        let params = &[("minOxygen", "90"), ("maxOxygen", "100")];
        let resp = dispatch(&Request::post("/set/values", params), &mut app);
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body.as_str(), "Missing parameters");
    }

    #[test]
    fn set_values_non_numeric_parameter() {
        let mut app = make_app();
        let params = &[
            ("minOxygen", "ninety"),
            ("maxOxygen", "100"),
            ("minPulseRate", "60"),
            ("maxPulseRate", "120"),
        ];
        let resp = dispatch(&Request::post("/set/values", params), &mut app);
        assert_eq!(resp.status, 400);
        assert!(resp.body.contains("Invalid input values"));
    }

    #[test]
    fn set_values_equal_min_max_reports_reason() {
        let mut app = make_app();
        let params = &[
            ("minOxygen", "95"),
            ("maxOxygen", "95"),
            ("minPulseRate", "60"),
            ("maxPulseRate", "120"),
        ];
        let resp = dispatch(&Request::post("/set/values", params), &mut app);
        assert_eq!(resp.status, 400);
        assert!(resp.body.contains("oxygen min and max must differ"));
    }

    #[test]
    fn warning_post_and_read_clears() {
        let mut app = make_app();
        let params = &[("message", "check the probe")];
        let resp = dispatch(&Request::post("/set/warning", params), &mut app);
        assert_eq!(resp.status, 200);

        let resp = dispatch(&Request::get("/get/warning"), &mut app);
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body.as_str(), "check the probe");

        let resp = dispatch(&Request::get("/get/warning"), &mut app);
        assert_eq!(resp.body.as_str(), "", "second read must be empty");
    }

    #[test]
    fn warning_missing_message() {
        let mut app = make_app();
        let resp = dispatch(&Request::post("/set/warning", &[]), &mut app);
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body.as_str(), "Missing message parameter");
    }

    #[test]
    fn rpm_endpoint_formats_current_speed() {
        let mut app = make_app();
        let resp = dispatch(&Request::get("/get_rpm"), &mut app);
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body.as_str(), "0.00");
    }

    #[test]
    fn status_endpoint_returns_json() {
        let mut app = make_app();
        let resp = dispatch(&Request::get("/get/status"), &mut app);
        assert_eq!(resp.status, 200);
        let v: serde_json::Value = serde_json::from_str(resp.body.as_str()).unwrap();
        assert_eq!(v["state"], "Disabled");
        assert_eq!(v["motor_enabled"], false);
    }

    #[test]
    fn unknown_path_is_404() {
        let mut app = make_app();
        let resp = dispatch(&Request::get("/nope"), &mut app);
        assert_eq!(resp.status, 404);
    }

    #[test]
    fn wrong_method_is_404() {
        let mut app = make_app();
        let resp = dispatch(&Request::post("/toggle/motor", &[]), &mut app);
        assert_eq!(resp.status, 404);
    }

    #[test]
    fn form_parse_decodes_plus_and_percent() {
        let form = FormParams::parse("message=probe+loose%21&minOxygen=90");
        let pairs = form.pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], ("message", "probe loose!"));
        assert_eq!(pairs[1], ("minOxygen", "90"));
    }

    #[test]
    fn form_parse_skips_malformed_pieces() {
        let form = FormParams::parse("noequals&ok=1&=empty");
        let pairs = form.pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], ("ok", "1"));
        assert_eq!(pairs[1], ("", "empty"));
    }

    #[test]
    fn form_parse_end_to_end_with_dispatch() {
        let mut app = make_app();
        let form =
            FormParams::parse("minOxygen=90&maxOxygen=100&minPulseRate=60&maxPulseRate=120");
        let pairs = form.pairs();
        let resp = dispatch(&Request::post("/set/values", &pairs), &mut app);
        assert_eq!(resp.body.as_str(), "Values updated");
    }
}
