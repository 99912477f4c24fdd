// src/playback_engine.rs

//! Renders externally delivered PCM through the jitter buffer.

use crate::audio_engine::BlockRenderer;
use crate::jitter_buffer::{AudioChunk, BufferState, JitterBuffer, DEFAULT_QUEUE_CAPACITY};
use ringbuf::HeapProducer;

#[derive(Default)]
pub struct PlaybackRenderer {
    buffer: JitterBuffer,
    underruns: u64,
    dropped_chunks: u64,
    /// Played and rejected chunks go back to the control thread for freeing.
    retired: Option<HeapProducer<AudioChunk>>,
}

impl PlaybackRenderer {
    pub fn new(fill_threshold: usize) -> Self {
        Self::with_capacity(fill_threshold, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(fill_threshold: usize, capacity: usize) -> Self {
        Self {
            buffer: JitterBuffer::with_limits(fill_threshold, capacity),
            ..Default::default()
        }
    }

    pub fn set_retire_queue(&mut self, producer: HeapProducer<AudioChunk>) {
        self.retired = Some(producer);
    }

    /// Returns false when the queue was full and the chunk was dropped.
    pub fn enqueue(&mut self, chunk: AudioChunk) -> bool {
        match self.buffer.enqueue(chunk) {
            Ok(()) => true,
            Err(chunk) => {
                self.dropped_chunks += 1;
                retire(&mut self.retired, chunk);
                false
            }
        }
    }

    pub fn buffer(&self) -> &JitterBuffer {
        &self.buffer
    }

    /// Number of transitions from playing back to buffering.
    pub fn underruns(&self) -> u64 {
        self.underruns
    }

    pub fn dropped_chunks(&self) -> u64 {
        self.dropped_chunks
    }
}

/// Without a return queue, or with a full one, the chunk is dropped in place.
fn retire(queue: &mut Option<HeapProducer<AudioChunk>>, chunk: AudioChunk) {
    if let Some(producer) = queue {
        let _ = producer.push(chunk);
    }
}

impl BlockRenderer for PlaybackRenderer {
    fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let was_playing = self.buffer.state() == BufferState::Playing;
        self.buffer
            .dequeue_frames_with(left, right, |chunk| retire(&mut self.retired, chunk));
        if was_playing && self.buffer.state() == BufferState::Buffering {
            self.underruns += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::HeapRb;

    #[test]
    fn silent_until_filled() {
        let mut p = PlaybackRenderer::new(3);
        let mut l = [1.0f32; 128];
        let mut r = [1.0f32; 128];
        p.render(&mut l, &mut r);
        assert!(l.iter().chain(r.iter()).all(|&s| s == 0.0));

        for _ in 0..3 {
            assert!(p.enqueue(AudioChunk::from_channels(&[0.25; 128], &[0.75; 128])));
        }
        p.render(&mut l, &mut r);
        assert!(l.iter().all(|&s| s == 0.25));
        assert!(r.iter().all(|&s| s == 0.75));
    }

    #[test]
    fn counts_underruns() {
        let mut p = PlaybackRenderer::new(1);
        p.enqueue(AudioChunk::from_channels(&[0.5; 100], &[0.5; 100]));
        let mut l = [0.0f32; 128];
        let mut r = [0.0f32; 128];
        p.render(&mut l, &mut r);
        assert_eq!(l[99], 0.5);
        assert_eq!(l[100], 0.0);
        assert_eq!(p.underruns(), 1);
        p.render(&mut l, &mut r);
        assert_eq!(p.underruns(), 1);
    }

    #[test]
    fn overflow_is_dropped_and_counted() {
        let mut p = PlaybackRenderer::with_capacity(1, 2);
        let (tx, rx) = HeapRb::<AudioChunk>::new(8).split();
        p.set_retire_queue(tx);
        for _ in 0..5 {
            p.enqueue(AudioChunk::from_channels(&[0.5; 32], &[0.5; 32]));
        }
        assert_eq!(p.buffer().queued_chunks(), 2);
        assert_eq!(p.dropped_chunks(), 3);
        assert_eq!(rx.len(), 3);
    }

    #[test]
    fn played_chunks_return_through_the_retire_queue() {
        let mut p = PlaybackRenderer::new(1);
        let (tx, mut rx) = HeapRb::<AudioChunk>::new(4).split();
        p.set_retire_queue(tx);
        p.enqueue(AudioChunk::from_channels(&[0.5; 64], &[0.5; 64]));
        let mut l = [0.0f32; 64];
        let mut r = [0.0f32; 64];
        p.render(&mut l, &mut r);
        let back = rx.pop().unwrap();
        assert_eq!(back.frames(), 64);
        assert!(rx.pop().is_none());
    }
}
