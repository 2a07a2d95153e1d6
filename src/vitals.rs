//! Asynchronous pulse-oximeter intake channel.
//!
//! Beat detections arrive from the oximeter driver outside the control
//! loop's timing — on ESP-IDF from the I²C polling task's beat callback, in
//! tests from the injection helpers.  Samples cross into the control loop
//! through a bounded lock-free SPSC ring:
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌──────────────┐
//! │ Beat callback│────▶│  Sample ring  │────▶│ Control loop │
//! │ (producer)   │     │  (lock-free)  │     │  (consumer)  │
//! └──────────────┘     └───────────────┘     └──────────────┘
//! ```
//!
//! The producer never blocks: a full ring drops the sample and bumps a
//! counter.  The consumer drains the ring once per control tick and feeds
//! each sample to the vitals supervisor.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// Maximum number of pending samples.
/// Power of 2 for efficient ring-buffer modulo.
const SAMPLE_QUEUE_CAP: usize = 16;

/// One heartbeat-derived reading from the oximeter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VitalsSample {
    /// Beats per minute.
    pub heart_rate: f32,
    /// Blood oxygen saturation (percent).
    pub spo2: f32,
}

/// Lock-free SPSC ring of [`VitalsSample`]s.
///
/// One producer (the beat callback) and one consumer (the control loop).
/// Each slot is written before the head index is published and read before
/// the tail index is advanced, so no slot is ever touched concurrently.
pub struct SampleRing {
    head: AtomicU8,
    tail: AtomicU8,
    dropped: AtomicU32,
    buffer: UnsafeCell<[VitalsSample; SAMPLE_QUEUE_CAP]>,
}

// SAFETY: concurrent access is confined to the atomics; the buffer is
// accessed under the SPSC publish/consume protocol described above.
unsafe impl Sync for SampleRing {}

impl SampleRing {
    pub const fn new() -> Self {
        Self {
            head: AtomicU8::new(0),
            tail: AtomicU8::new(0),
            dropped: AtomicU32::new(0),
            buffer: UnsafeCell::new(
                [VitalsSample {
                    heart_rate: 0.0,
                    spo2: 0.0,
                }; SAMPLE_QUEUE_CAP],
            ),
        }
    }

    /// Push a sample.  Safe to call from the beat-callback context
    /// (lock-free, never blocks).  Returns `false` if the ring is full
    /// (sample dropped).
    pub fn push(&self, sample: VitalsSample) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let next_head = (head + 1) % SAMPLE_QUEUE_CAP as u8;

        if next_head == tail {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false; // Ring full — drop sample.
        }

        // SAFETY: single producer; this slot is not visible to the
        // consumer until the Release store below.
        unsafe {
            (*self.buffer.get())[head as usize] = sample;
        }

        self.head.store(next_head, Ordering::Release);
        true
    }

    /// Pop the oldest sample.  Called from the control loop (single
    /// consumer).
    pub fn pop(&self) -> Option<VitalsSample> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if tail == head {
            return None; // Empty.
        }

        // SAFETY: single consumer; the producer published this slot
        // before moving the head past it.
        let sample = unsafe { (*self.buffer.get())[tail as usize] };
        self.tail
            .store((tail + 1) % SAMPLE_QUEUE_CAP as u8, Ordering::Release);
        Some(sample)
    }

    /// Drain all pending samples into a callback, oldest first.
    pub fn drain(&self, mut handler: impl FnMut(VitalsSample)) {
        while let Some(sample) = self.pop() {
            handler(sample);
        }
    }

    /// Number of pending samples.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed) as usize;
        let tail = self.tail.load(Ordering::Relaxed) as usize;
        (head + SAMPLE_QUEUE_CAP - tail) % SAMPLE_QUEUE_CAP
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples dropped because the ring was full.
    pub fn dropped_count(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for SampleRing {
    fn default() -> Self {
        Self::new()
    }
}

// ── Process-wide ring for the ISR-adjacent beat callback ──────
//
// The oximeter beat callback has no way to carry a handle, so the
// production intake point is a static.  The control loop drains it
// through [`drain_samples`].

static INTAKE: SampleRing = SampleRing::new();

/// The firmware-wide intake ring (for wiring the control loop).
pub fn intake() -> &'static SampleRing {
    &INTAKE
}

/// Push a sample into the firmware-wide intake ring.
pub fn push_sample(sample: VitalsSample) -> bool {
    INTAKE.push(sample)
}

/// Drain the firmware-wide intake ring, oldest first.
pub fn drain_samples(handler: impl FnMut(VitalsSample)) {
    INTAKE.drain(handler);
}

/// Pending samples in the firmware-wide intake ring.
pub fn queue_len() -> usize {
    INTAKE.len()
}

/// Samples dropped from the firmware-wide intake ring since boot.
pub fn dropped_count() -> u32 {
    INTAKE.dropped_count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_fifo_order() {
        let ring = SampleRing::new();
        for i in 0..4 {
            assert!(ring.push(VitalsSample {
                heart_rate: 60.0 + i as f32,
                spo2: 95.0,
            }));
        }
        for i in 0..4 {
            let s = ring.pop().expect("sample present");
            assert!((s.heart_rate - (60.0 + i as f32)).abs() < f32::EPSILON);
        }
        assert!(ring.pop().is_none());
    }

    #[test]
    fn full_ring_drops_without_blocking() {
        let ring = SampleRing::new();
        // CAP-1 usable slots in this head/tail scheme.
        for _ in 0..SAMPLE_QUEUE_CAP - 1 {
            assert!(ring.push(VitalsSample::default()));
        }
        assert!(!ring.push(VitalsSample::default()), "push on full must fail");
        assert_eq!(ring.dropped_count(), 1);
    }

    #[test]
    fn drain_invokes_handler_per_sample() {
        let ring = SampleRing::new();
        for _ in 0..3 {
            ring.push(VitalsSample {
                heart_rate: 70.0,
                spo2: 97.0,
            });
        }
        let mut n = 0;
        ring.drain(|_| n += 1);
        assert_eq!(n, 3);
        assert!(ring.is_empty());
    }

    #[test]
    fn wraps_around_the_buffer_edge() {
        let ring = SampleRing::new();
        for round in 0..3 * SAMPLE_QUEUE_CAP {
            assert!(ring.push(VitalsSample {
                heart_rate: round as f32,
                spo2: 0.0,
            }));
            let s = ring.pop().unwrap();
            assert!((s.heart_rate - round as f32).abs() < f32::EPSILON);
        }
        assert!(ring.is_empty());
    }
}
