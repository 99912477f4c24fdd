// src/controller.rs

//! The control-thread handle: the single producer of the command queue.

use crate::audio_engine::{AudioEngine, EngineStatus, Renderer};
use crate::command::{AudioCommand, ControlError, ControlMessage};
use crate::jitter_buffer::AudioChunk;
use crate::params::ParameterUpdate;
use crate::pcm;
use ringbuf::{HeapConsumer, HeapProducer, HeapRb};
use std::sync::atomic::Ordering;

pub const DEFAULT_COMMAND_CAPACITY: usize = 256;

pub struct EngineController {
    producer: HeapProducer<AudioCommand>,
    status: EngineStatus,
    /// Chunks the engine is done with, freed here instead of on the render thread.
    retired: Option<HeapConsumer<AudioChunk>>,
    chunk_capacity: Option<usize>,
}

/// Builds a connected controller/engine pair around `renderer`.
pub fn create_engine(mut renderer: Renderer, capacity: usize) -> (EngineController, AudioEngine) {
    let capacity = capacity.max(1);
    let (producer, consumer) = HeapRb::<AudioCommand>::new(capacity).split();

    // Every chunk in flight is either queued as a command, held by the jitter
    // buffer or retired, so this size never fills between two sends.
    let (retired, chunk_capacity) = match &mut renderer {
        Renderer::Playback(playback) => {
            let chunk_capacity = playback.buffer().capacity();
            let (tx, rx) = HeapRb::<AudioChunk>::new(capacity + chunk_capacity).split();
            playback.set_retire_queue(tx);
            (Some(rx), Some(chunk_capacity))
        }
        Renderer::Synthesis(_) => (None, None),
    };

    let status = EngineStatus::default();
    let engine = AudioEngine::new(consumer, renderer, status.clone());
    let controller = EngineController {
        producer,
        status,
        retired,
        chunk_capacity,
    };
    (controller, engine)
}

impl EngineController {
    /// Never blocks. A full queue hands the command back.
    pub fn send(&mut self, command: AudioCommand) -> Result<(), ControlError> {
        self.collect_retired();
        self.producer.push(command).map_err(ControlError::QueueFull)
    }

    /// Frees chunks the engine has finished with. Returns how many.
    pub fn collect_retired(&mut self) -> usize {
        let Some(retired) = self.retired.as_mut() else {
            return 0;
        };
        let mut freed = 0;
        while retired.pop().is_some() {
            freed += 1;
        }
        freed
    }

    pub fn update(&mut self, update: ParameterUpdate) -> Result<(), ControlError> {
        self.send(AudioCommand::UpdateParams(update))
    }

    /// Parses one JSON control message and forwards its commands. Either all
    /// of them are queued or none are.
    pub fn send_json(&mut self, text: &str) -> Result<(), ControlError> {
        let commands = ControlMessage::from_json(text)?.into_commands();
        let free = self.producer.free_len();
        if free < commands.len() {
            return Err(ControlError::NoRoom {
                needed: commands.len(),
                free,
            });
        }
        for command in commands {
            self.send(command)?;
        }
        Ok(())
    }

    /// Decodes a raw delivery packet and queues it for playback.
    pub fn push_pcm(&mut self, bytes: &[u8]) -> Result<(), ControlError> {
        let (chunk, dropped) = pcm::decode_planar(bytes);
        if dropped > 0 {
            log::warn!("PCM packet has {} trailing bytes, ignoring them", dropped);
        }
        if chunk.is_empty() {
            return Err(ControlError::EmptyPacket);
        }
        if chunk.samples().len() % 2 != 0 {
            log::warn!(
                "PCM packet has an odd sample count ({}), last sample ignored",
                chunk.samples().len()
            );
        }
        self.send(AudioCommand::PushChunk(chunk))
    }

    pub fn stop(&mut self) -> Result<(), ControlError> {
        self.send(AudioCommand::Stop)
    }

    pub fn stop_requested(&self) -> bool {
        self.status.stop_requested.load(Ordering::Relaxed)
    }

    pub fn ignored_commands(&self) -> usize {
        self.status.ignored_commands.load(Ordering::Relaxed)
    }

    pub fn pending_commands(&self) -> usize {
        self.producer.len()
    }

    pub fn dropped_chunks(&self) -> usize {
        self.status.dropped_chunks.load(Ordering::Relaxed)
    }

    /// Chunks held by the jitter buffer plus commands not yet drained.
    pub fn chunk_backlog(&self) -> usize {
        self.status.queued_chunks.load(Ordering::Relaxed) + self.pending_commands()
    }

    /// False while another chunk would overflow the jitter buffer. Producers
    /// of PCM back off until this turns true again.
    pub fn has_room_for_chunk(&self) -> bool {
        match self.chunk_capacity {
            Some(capacity) => self.chunk_backlog() < capacity,
            None => true,
        }
    }
}
