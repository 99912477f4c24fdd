// src/audio_io.rs

use crate::audio_engine::AudioEngine;
use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, FromSample, Sample, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Scratch size when the host picks its own buffer size.
const DEFAULT_BLOCK_FRAMES: usize = 4096;

/// The output device and the configuration the stream will be opened with.
pub struct OutputTarget {
    pub device: Device,
    pub config: StreamConfig,
    pub sample_format: SampleFormat,
}

impl OutputTarget {
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn buffer_size(&self) -> Option<u32> {
        match self.config.buffer_size {
            BufferSize::Fixed(size) => Some(size),
            BufferSize::Default => None,
        }
    }

    /// Frames to preallocate for one callback.
    pub fn block_frames(&self) -> usize {
        block_frames_for(&self.config.buffer_size)
    }
}

fn block_frames_for(buffer_size: &BufferSize) -> usize {
    match buffer_size {
        BufferSize::Fixed(frames) => (*frames as usize).max(1),
        BufferSize::Default => DEFAULT_BLOCK_FRAMES,
    }
}

pub fn resolve_output(
    output_device_name: Option<&str>,
    requested_sample_rate: Option<u32>,
    requested_buffer_size: Option<u32>,
) -> Result<OutputTarget> {
    let host = cpal::default_host();
    let device = if let Some(name) = output_device_name {
        host.output_devices()?
            .find(|d| d.name().ok().as_deref() == Some(name))
            .ok_or_else(|| anyhow::anyhow!("Output device not found: {}", name))?
    } else {
        host.default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No default output device"))?
    };
    log::info!("Using output device: {}", device.name()?);

    let default_config = device.default_output_config()?;
    let sample_format = default_config.sample_format();

    let mut config: StreamConfig = default_config.into();
    if let Some(sr) = requested_sample_rate {
        config.sample_rate = cpal::SampleRate(sr);
    }
    if let Some(bs) = requested_buffer_size {
        config.buffer_size = BufferSize::Fixed(bs);
    }

    Ok(OutputTarget {
        device,
        config,
        sample_format,
    })
}

/// Opens the output stream, moves `engine` into its callback and starts playback.
/// The returned `Stream` must be kept alive; dropping it disconnects the engine.
pub fn run_output_stream(
    target: &OutputTarget,
    engine: AudioEngine,
    xrun_count: Arc<AtomicUsize>,
) -> Result<Stream> {
    let stream = match target.sample_format {
        SampleFormat::F32 => build_output_stream::<f32>(target, engine, xrun_count)?,
        SampleFormat::I16 => build_output_stream::<i16>(target, engine, xrun_count)?,
        SampleFormat::U16 => build_output_stream::<u16>(target, engine, xrun_count)?,
        format => return Err(anyhow::anyhow!("Unsupported sample format {}", format)),
    };
    stream.play()?;

    log::info!(
        "Started output stream: {} Hz, {} channels, buffer {}",
        target.sample_rate(),
        target.config.channels,
        target
            .buffer_size()
            .map_or_else(|| "default".to_string(), |bs| format!("{} frames", bs)),
    );
    Ok(stream)
}

fn build_output_stream<T>(
    target: &OutputTarget,
    mut engine: AudioEngine,
    xrun_count: Arc<AtomicUsize>,
) -> Result<Stream>
where
    T: Sample + cpal::SizedSample + FromSample<f32>,
{
    let channels = target.config.channels as usize;
    let err_fn = move |err| {
        log::error!("an error occurred on output stream: {}", err);
        xrun_count.fetch_add(1, Ordering::Relaxed);
    };
    let block_frames = target.block_frames();
    engine.reserve_frames(block_frames);
    // Callbacks larger than the scratch are converted in pieces.
    let mut scratch: Vec<f32> = vec![0.0; block_frames * channels.max(1)];

    let stream = target.device.build_output_stream(
        &target.config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            for out in data.chunks_mut(scratch.len()) {
                let block = &mut scratch[..out.len()];
                engine.process_interleaved(block, channels);
                for (o, &sample) in out.iter_mut().zip(block.iter()) {
                    *o = T::from_sample(sample);
                }
            }
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_follows_the_requested_buffer_size() {
        assert_eq!(block_frames_for(&BufferSize::Fixed(8192)), 8192);
        assert_eq!(block_frames_for(&BufferSize::Fixed(0)), 1);
        assert_eq!(block_frames_for(&BufferSize::Default), DEFAULT_BLOCK_FRAMES);
    }
}
