// src/pcm.rs

//! Wire format for delivered audio: little-endian f32, planar stereo
//! `[left..., right...]`. Also hosts the packet source that renders
//! synthesized blocks into that format.

use crate::audio_engine::BlockRenderer;
use crate::jitter_buffer::AudioChunk;
use crate::params::ParameterUpdate;
use crate::synth_engine::SynthRenderer;
use std::io::{self, Read};
use std::time::Duration;

pub const PACKET_FRAMES: usize = 2048;
const SAMPLE_BYTES: usize = std::mem::size_of::<f32>();
pub const PACKET_BYTES: usize = PACKET_FRAMES * 2 * SAMPLE_BYTES;

/// Decodes a delivery packet. Trailing bytes that do not make up a whole
/// sample are dropped; the count is returned alongside the chunk.
pub fn decode_planar(bytes: &[u8]) -> (AudioChunk, usize) {
    let whole = bytes.chunks_exact(SAMPLE_BYTES);
    let dropped = whole.remainder().len();
    let samples = whole
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    (AudioChunk::from_planar(samples), dropped)
}

pub fn encode_planar(left: &[f32], right: &[f32]) -> Vec<u8> {
    let frames = left.len().min(right.len());
    let mut out = Vec::with_capacity(frames * 2 * SAMPLE_BYTES);
    for &s in left[..frames].iter().chain(&right[..frames]) {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

/// Fills `packet` from `reader`, stopping short only at end of input.
/// Returns the number of bytes read; anything below `packet.len()` means
/// the input is exhausted.
pub fn read_packet<R: Read>(reader: &mut R, packet: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < packet.len() {
        match reader.read(&mut packet[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Renders fixed-size synthesized blocks as delivery packets.
pub struct Packetizer {
    synth: SynthRenderer,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl Packetizer {
    pub fn new(synth: SynthRenderer, frames: usize) -> Self {
        let frames = frames.max(1);
        Self {
            synth,
            left: vec![0.0; frames],
            right: vec![0.0; frames],
        }
    }

    pub fn frames(&self) -> usize {
        self.left.len()
    }

    /// Wall-clock length of one packet, used to pace delivery.
    pub fn packet_duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.synth.sample_rate())
    }

    pub fn receive(&mut self, update: &ParameterUpdate) {
        self.synth.receive(update);
    }

    pub fn next_packet(&mut self) -> Vec<u8> {
        self.synth.render(&mut self.left, &mut self.right);
        encode_planar(&self.left, &self.right)
    }
}
