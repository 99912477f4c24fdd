// src/jitter_buffer.rs

//! Queue of delivered PCM chunks with fill/drain hysteresis.
//!
//! Playback starts once `fill_threshold` chunks are queued and stops when the
//! queue runs dry. The gap between the two thresholds keeps small buffers
//! from flapping between states on every delivery.
//!
//! The queue never grows past its preallocated capacity. Chunks that do not
//! fit, and chunks that have been played out, are handed back to the caller
//! so the render thread never frees them itself.

use std::collections::VecDeque;

pub const DEFAULT_FILL_THRESHOLD: usize = 3;
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
pub const CHANNELS: usize = 2;

/// Planar stereo samples: `[left..., right...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    samples: Box<[f32]>,
}

impl AudioChunk {
    pub fn from_planar(samples: Vec<f32>) -> Self {
        Self {
            samples: samples.into_boxed_slice(),
        }
    }

    pub fn from_channels(left: &[f32], right: &[f32]) -> Self {
        let frames = left.len().min(right.len());
        let mut samples = Vec::with_capacity(frames * CHANNELS);
        samples.extend_from_slice(&left[..frames]);
        samples.extend_from_slice(&right[..frames]);
        Self::from_planar(samples)
    }

    /// Frames per channel. An odd trailing sample is ignored.
    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / CHANNELS
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Out-of-range reads return silence.
    #[inline]
    pub fn sample(&self, channel: usize, frame: usize) -> f32 {
        let half = self.frames();
        if frame >= half || channel >= CHANNELS {
            return 0.0;
        }
        self.samples.get(frame + channel * half).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Waiting for enough chunks to start; dequeues produce silence.
    Buffering,
    Playing,
}

#[derive(Debug)]
pub struct JitterBuffer {
    queue: VecDeque<AudioChunk>,
    read_index: usize,
    state: BufferState,
    fill_threshold: usize,
    capacity: usize,
}

impl Default for JitterBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl JitterBuffer {
    pub fn new() -> Self {
        Self::with_fill_threshold(DEFAULT_FILL_THRESHOLD)
    }

    pub fn with_fill_threshold(fill_threshold: usize) -> Self {
        Self::with_limits(fill_threshold, DEFAULT_QUEUE_CAPACITY)
    }

    /// `fill_threshold` is clamped to `1..=capacity` so playback can always start.
    pub fn with_limits(fill_threshold: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: VecDeque::with_capacity(capacity),
            read_index: 0,
            state: BufferState::Buffering,
            fill_threshold: fill_threshold.clamp(1, capacity),
            capacity,
        }
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == BufferState::Playing
    }

    pub fn queued_chunks(&self) -> usize {
        self.queue.len()
    }

    pub fn read_index(&self) -> usize {
        self.read_index
    }

    pub fn fill_threshold(&self) -> usize {
        self.fill_threshold
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.capacity
    }

    /// Frames still waiting to be played, including the unread part of the head chunk.
    pub fn buffered_frames(&self) -> usize {
        let total: usize = self.queue.iter().map(AudioChunk::frames).sum();
        total - self.read_index.min(total)
    }

    /// Queues `chunk`, or hands it back when the queue is at capacity.
    pub fn enqueue(&mut self, chunk: AudioChunk) -> Result<(), AudioChunk> {
        // zero-frame chunks would never advance the read index
        if chunk.is_empty() {
            return Ok(());
        }
        if self.is_full() {
            return Err(chunk);
        }
        self.queue.push_back(chunk);
        if self.queue.len() >= self.fill_threshold {
            self.state = BufferState::Playing;
        }
        Ok(())
    }

    /// Fills both channels completely. Frames the buffer cannot supply are silence.
    pub fn dequeue_frames(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.dequeue_frames_with(left, right, drop);
    }

    /// Same as `dequeue_frames`, passing every fully played chunk to `retire`.
    pub fn dequeue_frames_with<F>(&mut self, left: &mut [f32], right: &mut [f32], mut retire: F)
    where
        F: FnMut(AudioChunk),
    {
        let frames = left.len().min(right.len());
        let mut written = 0;

        while written < frames && self.state == BufferState::Playing {
            let Some(head) = self.queue.front() else {
                self.state = BufferState::Buffering;
                break;
            };

            let half = head.frames();
            let available = half.saturating_sub(self.read_index);
            let n = available.min(frames - written);
            for i in 0..n {
                left[written + i] = head.sample(0, self.read_index + i);
                right[written + i] = head.sample(1, self.read_index + i);
            }
            written += n;
            self.read_index += n;

            if self.read_index >= half {
                if let Some(done) = self.queue.pop_front() {
                    retire(done);
                }
                self.read_index = 0;
                if self.queue.is_empty() {
                    self.state = BufferState::Buffering;
                }
            }
        }

        left[written..].fill(0.0);
        right[written..].fill(0.0);
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.read_index = 0;
        self.state = BufferState::Buffering;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(frames: usize, offset: f32) -> AudioChunk {
        let left: Vec<f32> = (0..frames).map(|i| offset + i as f32).collect();
        let right: Vec<f32> = (0..frames).map(|i| -(offset + i as f32)).collect();
        AudioChunk::from_channels(&left, &right)
    }

    fn dequeue(buf: &mut JitterBuffer, frames: usize) -> (Vec<f32>, Vec<f32>) {
        let mut l = vec![f32::NAN; frames];
        let mut r = vec![f32::NAN; frames];
        buf.dequeue_frames(&mut l, &mut r);
        (l, r)
    }

    #[test]
    fn chunk_addresses_planar_layout() {
        let c = AudioChunk::from_planar(vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0]);
        assert_eq!(c.frames(), 3);
        assert_eq!(c.sample(0, 2), 3.0);
        assert_eq!(c.sample(1, 0), 10.0);
        assert_eq!(c.sample(1, 3), 0.0);
        assert_eq!(c.sample(2, 0), 0.0);
    }

    #[test]
    fn odd_length_chunk_is_clamped() {
        let c = AudioChunk::from_planar(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(c.frames(), 2);
        assert_eq!(c.sample(0, 1), 2.0);
        assert_eq!(c.sample(1, 1), 4.0);
        assert_eq!(c.sample(1, 2), 0.0);
    }

    #[test]
    fn hysteresis_between_buffering_and_playing() {
        let mut buf = JitterBuffer::new();
        buf.enqueue(chunk(128, 1.0)).unwrap();
        buf.enqueue(chunk(128, 1.0)).unwrap();
        assert_eq!(buf.state(), BufferState::Buffering);
        let (l, r) = dequeue(&mut buf, 128);
        assert!(l.iter().chain(r.iter()).all(|&s| s == 0.0));
        assert_eq!(buf.queued_chunks(), 2);

        buf.enqueue(chunk(128, 1.0)).unwrap();
        assert!(buf.is_ready());

        dequeue(&mut buf, 128);
        assert!(buf.is_ready(), "still has chunks, must keep playing");
        dequeue(&mut buf, 128);
        assert!(buf.is_ready());
        let (l, _) = dequeue(&mut buf, 128);
        assert_eq!(l[0], 1.0);
        assert_eq!(buf.queued_chunks(), 0);
        assert_eq!(buf.state(), BufferState::Buffering);

        buf.enqueue(chunk(128, 5.0)).unwrap();
        buf.enqueue(chunk(128, 5.0)).unwrap();
        let (l, _) = dequeue(&mut buf, 128);
        assert!(l.iter().all(|&s| s == 0.0));
        buf.enqueue(chunk(128, 5.0)).unwrap();
        let (l, _) = dequeue(&mut buf, 128);
        assert_eq!(l[0], 5.0);
    }

    #[test]
    fn partial_chunk_reads_preserve_order() {
        let mut buf = JitterBuffer::with_fill_threshold(1);
        buf.enqueue(chunk(300, 0.0)).unwrap();
        let mut left = Vec::new();
        let mut right = Vec::new();
        for _ in 0..4 {
            let (l, r) = dequeue(&mut buf, 128);
            left.extend(l);
            right.extend(r);
        }
        assert_eq!(left.len(), 512);
        for i in 0..300 {
            assert_eq!(left[i], i as f32, "left frame {i}");
            assert_eq!(right[i], -(i as f32), "right frame {i}");
        }
        assert!(left[300..].iter().all(|&s| s == 0.0));
        assert!(right[300..].iter().all(|&s| s == 0.0));
        assert_eq!(buf.state(), BufferState::Buffering);
    }

    #[test]
    fn blocks_span_chunk_boundaries() {
        let mut buf = JitterBuffer::new();
        buf.enqueue(chunk(300, 0.0)).unwrap();
        buf.enqueue(chunk(300, 300.0)).unwrap();
        buf.enqueue(chunk(300, 600.0)).unwrap();
        let mut left = Vec::new();
        for _ in 0..8 {
            let (l, _) = dequeue(&mut buf, 128);
            left.extend(l);
        }
        for i in 0..900 {
            assert_eq!(left[i], i as f32, "frame {i}");
        }
        assert!(left[900..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn read_index_survives_between_calls() {
        let mut buf = JitterBuffer::with_fill_threshold(1);
        buf.enqueue(chunk(300, 0.0)).unwrap();
        dequeue(&mut buf, 128);
        assert_eq!(buf.read_index(), 128);
        dequeue(&mut buf, 128);
        assert_eq!(buf.read_index(), 256);
        assert_eq!(buf.buffered_frames(), 44);
        dequeue(&mut buf, 128);
        assert_eq!(buf.read_index(), 0);
        assert_eq!(buf.queued_chunks(), 0);
    }

    #[test]
    fn empty_chunks_are_ignored() {
        let mut buf = JitterBuffer::with_fill_threshold(1);
        buf.enqueue(AudioChunk::from_planar(Vec::new())).unwrap();
        buf.enqueue(AudioChunk::from_planar(vec![0.5])).unwrap();
        assert_eq!(buf.queued_chunks(), 0);
        assert_eq!(buf.state(), BufferState::Buffering);
    }

    #[test]
    fn clear_returns_to_buffering() {
        let mut buf = JitterBuffer::with_fill_threshold(1);
        buf.enqueue(chunk(64, 0.0)).unwrap();
        dequeue(&mut buf, 16);
        buf.clear();
        assert_eq!(buf.state(), BufferState::Buffering);
        assert_eq!(buf.read_index(), 0);
        assert_eq!(buf.queued_chunks(), 0);
    }

    #[test]
    fn queue_never_grows_past_capacity() {
        let mut buf = JitterBuffer::new();
        let mut rejected = 0;
        for i in 0..1000 {
            if let Err(back) = buf.enqueue(chunk(2048, i as f32)) {
                assert_eq!(back.sample(0, 0), i as f32);
                rejected += 1;
            }
        }
        assert_eq!(buf.queued_chunks(), DEFAULT_QUEUE_CAPACITY);
        assert_eq!(rejected, 1000 - DEFAULT_QUEUE_CAPACITY);
        assert!(buf.is_full());

        // the oldest chunks are the ones kept
        let (l, _) = dequeue(&mut buf, 2048);
        assert_eq!(l[0], 0.0);
        assert!(buf.enqueue(chunk(16, 0.0)).is_ok());
        assert!(buf.enqueue(chunk(16, 0.0)).is_err());
    }

    #[test]
    fn fill_threshold_is_clamped_to_capacity() {
        let buf = JitterBuffer::with_limits(10, 4);
        assert_eq!(buf.capacity(), 4);
        assert_eq!(buf.fill_threshold(), 4);
    }

    #[test]
    fn played_chunks_are_handed_to_retire() {
        let mut buf = JitterBuffer::with_fill_threshold(1);
        buf.enqueue(chunk(100, 0.0)).unwrap();
        buf.enqueue(chunk(100, 100.0)).unwrap();
        let mut retired = Vec::new();
        let mut l = [0.0f32; 150];
        let mut r = [0.0f32; 150];
        buf.dequeue_frames_with(&mut l, &mut r, |c| retired.push(c));
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].sample(0, 99), 99.0);
        assert_eq!(l[149], 149.0);

        buf.dequeue_frames_with(&mut l, &mut r, |c| retired.push(c));
        assert_eq!(retired.len(), 2);
        assert_eq!(buf.queued_chunks(), 0);
    }
}
