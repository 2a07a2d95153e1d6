//! Operator warning mailbox.
//!
//! A single-slot, read-and-clear message channel between the control core and
//! polling network clients.  There is deliberately no history: a second
//! message posted before the first is read simply overwrites it, matching the
//! one-line warning banner on the operator dashboard.

use heapless::String;

/// Maximum warning length; longer messages are truncated on post.
pub const WARNING_CAPACITY: usize = 128;

/// Fixed message posted when a safety condition halts the fan.
pub const OUT_OF_RANGE_WARNING: &str =
    "Pulse Rate / Oxygen Level of user is not NORMAL. STOPPING MOTOR!!!";

/// Single-slot read-and-clear warning store.
#[derive(Debug, Default)]
pub struct WarningMailbox {
    slot: Option<String<WARNING_CAPACITY>>,
}

impl WarningMailbox {
    pub fn new() -> Self {
        Self { slot: None }
    }

    /// Replace any unread message with `message` (truncated to capacity).
    pub fn post(&mut self, message: &str) {
        let mut s: String<WARNING_CAPACITY> = String::new();
        let take = message
            .char_indices()
            .take_while(|(i, c)| i + c.len_utf8() <= WARNING_CAPACITY)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        // Infallible: `take` never exceeds capacity.
        let _ = s.push_str(&message[..take]);
        self.slot = Some(s);
    }

    /// Return the current message (empty if none) and clear the slot.
    pub fn take(&mut self) -> String<WARNING_CAPACITY> {
        self.slot.take().unwrap_or_default()
    }

    /// True if an unread message is waiting.
    pub fn has_message(&self) -> bool {
        self.slot.is_some()
    }
}
