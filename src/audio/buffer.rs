//! Bounded sample buffer for a single recording.
//!
//! Unlike a ring buffer, a [`RecordingBuffer`] keeps the *head* of the
//! recording: once `capacity` samples are stored further input is dropped
//! and [`is_full`](RecordingBuffer::is_full) turns `true`.  The capture
//! callback uses it to skip work once the cap is reached; stopping the
//! session at the deadline is the orchestrator's job.
//!
//! # Example
//!
//! ```rust
//! use voice_intake::audio::RecordingBuffer;
//!
//! let mut buf = RecordingBuffer::new(4);
//! assert_eq!(buf.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]), 4);
//! assert!(buf.is_full());
//! assert_eq!(buf.take(), vec![1.0, 2.0, 3.0, 4.0]);
//! ```

#[derive(Debug, Clone)]
pub struct RecordingBuffer {
    samples: Vec<f32>,
    capacity: usize,
}

impl RecordingBuffer {
    /// Create a buffer that holds at most `capacity` samples.  A zero
    /// capacity yields a buffer that is always full.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity.min(16_000 * 60 * 2)),
            capacity,
        }
    }

    /// Buffer sized for `max_secs` of interleaved audio.
    pub fn for_duration(max_secs: f32, sample_rate: u32, channels: u16) -> Self {
        let capacity = (max_secs.max(0.0) * sample_rate as f32 * channels as f32) as usize;
        Self::new(capacity)
    }

    /// Append as much of `data` as fits; returns the number of samples kept.
    pub fn push_slice(&mut self, data: &[f32]) -> usize {
        let room = self.capacity.saturating_sub(self.samples.len());
        let kept = room.min(data.len());
        self.samples.extend_from_slice(&data[..kept]);
        kept
    }

    /// Move all samples out, leaving the buffer empty and reusable.
    pub fn take(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `true` once the recording has reached its maximum length.
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_within_capacity_keeps_everything() {
        let mut buf = RecordingBuffer::new(8);
        assert_eq!(buf.push_slice(&[1.0, 2.0, 3.0]), 3);
        assert_eq!(buf.len(), 3);
        assert!(!buf.is_full());
    }

    #[test]
    fn overflow_drops_the_tail_not_the_head() {
        let mut buf = RecordingBuffer::new(3);
        buf.push_slice(&[1.0, 2.0]);
        assert_eq!(buf.push_slice(&[3.0, 4.0, 5.0]), 1);
        assert_eq!(buf.take(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn take_empties_and_allows_reuse() {
        let mut buf = RecordingBuffer::new(2);
        buf.push_slice(&[1.0, 2.0]);
        let _ = buf.take();
        assert!(buf.is_empty());
        buf.push_slice(&[9.0]);
        assert_eq!(buf.take(), vec![9.0]);
    }

    #[test]
    fn for_duration_sizes_interleaved_capacity() {
        let buf = RecordingBuffer::for_duration(60.0, 48_000, 2);
        assert_eq!(buf.capacity(), 5_760_000);
    }

    #[test]
    fn zero_capacity_is_always_full() {
        let mut buf = RecordingBuffer::new(0);
        assert!(buf.is_full());
        assert_eq!(buf.push_slice(&[1.0]), 0);
    }
}
