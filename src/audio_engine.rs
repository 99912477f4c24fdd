// src/audio_engine.rs

//! The render-thread side of the engine.
//!
//! `AudioEngine` owns the consumer end of the command queue and the active
//! block renderer. Once per host callback it drains every pending command
//! without blocking, then asks the renderer for exactly one block.

use crate::command::AudioCommand;
use crate::playback_engine::PlaybackRenderer;
use crate::synth_engine::SynthRenderer;
use ringbuf::HeapConsumer;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Default scratch size. Larger host buffers are rendered in pieces of this size.
const INITIAL_BLOCK_FRAMES: usize = 1024;

/// Shared contract of the two render paths: fill every frame of both
/// channels, never block, never fail.
pub trait BlockRenderer: Send {
    fn render(&mut self, left: &mut [f32], right: &mut [f32]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    #[default]
    Synthesis,
    Playback,
}

pub enum Renderer {
    Synthesis(SynthRenderer),
    Playback(PlaybackRenderer),
}

impl Renderer {
    pub fn kind(&self) -> RendererKind {
        match self {
            Renderer::Synthesis(_) => RendererKind::Synthesis,
            Renderer::Playback(_) => RendererKind::Playback,
        }
    }
}

impl BlockRenderer for Renderer {
    #[inline]
    fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        match self {
            Renderer::Synthesis(r) => r.render(left, right),
            Renderer::Playback(r) => r.render(left, right),
        }
    }
}

/// Counters and flags shared with the control side.
#[derive(Debug, Clone, Default)]
pub struct EngineStatus {
    pub stop_requested: Arc<AtomicBool>,
    /// Commands that did not apply to the active renderer.
    pub ignored_commands: Arc<AtomicUsize>,
    /// Chunks refused because the jitter queue was full.
    pub dropped_chunks: Arc<AtomicUsize>,
    /// Jitter queue length after the last rendered block.
    pub queued_chunks: Arc<AtomicUsize>,
}

pub struct AudioEngine {
    command_consumer: HeapConsumer<AudioCommand>,
    renderer: Renderer,
    status: EngineStatus,
    left_buffer: Vec<f32>,
    right_buffer: Vec<f32>,
}

impl AudioEngine {
    pub fn new(
        command_consumer: HeapConsumer<AudioCommand>,
        renderer: Renderer,
        status: EngineStatus,
    ) -> Self {
        Self {
            command_consumer,
            renderer,
            status,
            left_buffer: vec![0.0; INITIAL_BLOCK_FRAMES],
            right_buffer: vec![0.0; INITIAL_BLOCK_FRAMES],
        }
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn status(&self) -> &EngineStatus {
        &self.status
    }

    /// Largest block rendered in one piece.
    pub fn block_capacity(&self) -> usize {
        self.left_buffer.len()
    }

    /// Grows the scratch buffers. Call before the engine moves into the
    /// host callback, which never allocates.
    pub fn reserve_frames(&mut self, frames: usize) {
        if self.left_buffer.len() < frames {
            self.left_buffer.resize(frames, 0.0);
            self.right_buffer.resize(frames, 0.0);
        }
    }

    /// Applies every queued command in arrival order.
    pub fn handle_commands(&mut self) {
        while let Some(command) = self.command_consumer.pop() {
            match (command, &mut self.renderer) {
                (AudioCommand::UpdateParams(update), Renderer::Synthesis(synth)) => {
                    synth.receive(&update);
                }
                (AudioCommand::PushChunk(chunk), Renderer::Playback(playback)) => {
                    if !playback.enqueue(chunk) {
                        self.status.dropped_chunks.fetch_add(1, Ordering::Relaxed);
                    }
                }
                (AudioCommand::Stop, _) => {
                    self.status.stop_requested.store(true, Ordering::Relaxed);
                }
                _ => {
                    self.status.ignored_commands.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// One full callback on planar buffers.
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.handle_commands();
        self.renderer.render(left, right);
        self.publish_queue_length();
    }

    fn publish_queue_length(&self) {
        if let Renderer::Playback(playback) = &self.renderer {
            let queued = playback.buffer().queued_chunks();
            self.status.queued_chunks.store(queued, Ordering::Relaxed);
        }
    }

    /// One full callback on an interleaved host buffer with `channels`
    /// channels. Left goes to channel 0, right to channel 1, any further
    /// channels are silent; a mono device gets the average of both.
    ///
    /// Buffers longer than `block_capacity()` frames are rendered as several
    /// consecutive blocks.
    pub fn process_interleaved(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let piece_len = self.left_buffer.len().max(1) * channels;

        self.handle_commands();
        for piece in data.chunks_mut(piece_len) {
            let frames = piece.len() / channels;
            let left = &mut self.left_buffer[..frames];
            let right = &mut self.right_buffer[..frames];
            self.renderer.render(left, right);
            interleave(piece, channels, left, right);
        }
        self.publish_queue_length();
    }
}

fn interleave(data: &mut [f32], channels: usize, left: &[f32], right: &[f32]) {
    let frames = left.len().min(right.len());
    for (i, frame) in data.chunks_mut(channels).enumerate() {
        if i >= frames {
            frame.fill(0.0);
            continue;
        }
        if channels == 1 {
            frame[0] = 0.5 * (left[i] + right[i]);
            continue;
        }
        frame[0] = left[i];
        frame[1] = right[i];
        frame[2..].fill(0.0);
    }
}
