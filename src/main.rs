use anyhow::Result;
use beatwave::audio_engine::{Renderer, RendererKind};
use beatwave::command::{AudioCommand, ControlError, ControlMessage};
use beatwave::controller::{create_engine, EngineController};
use beatwave::pcm::{self, Packetizer, PACKET_BYTES, PACKET_FRAMES};
use beatwave::playback_engine::PlaybackRenderer;
use beatwave::settings::{self, EngineSettings};
use beatwave::synth_engine::SynthRenderer;
use beatwave::{audio_io, ParameterUpdate};
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// How long the PCM pipe waits for the jitter buffer to make room.
const BACKOFF_INTERVAL: Duration = Duration::from_millis(5);
/// Packets read ahead of the engine. The reader blocks beyond this.
const READ_AHEAD_PACKETS: usize = 4;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = settings::load_settings();
    let target = audio_io::resolve_output(
        settings.output_device.as_deref(),
        settings.sample_rate,
        settings.buffer_size,
    )?;
    let sample_rate = target.sample_rate() as f32;

    let renderer = match settings.renderer {
        RendererKind::Synthesis => Renderer::Synthesis(new_synth(&settings, sample_rate)),
        RendererKind::Playback => {
            Renderer::Playback(PlaybackRenderer::new(settings.jitter_fill_threshold))
        }
    };
    let (mut controller, engine) = create_engine(renderer, settings.command_queue_capacity);

    let initial = match &settings.initial {
        Some(value) => Some(serde_json::from_value::<ControlMessage>(value.clone())?),
        None => None,
    };

    let xrun_count = Arc::new(AtomicUsize::new(0));
    let result = match (settings.renderer, settings.loopback_source) {
        (RendererKind::Synthesis, _) => {
            if let Some(message) = initial {
                forward(&mut controller, message);
            }
            let _stream = audio_io::run_output_stream(&target, engine, xrun_count.clone())?;
            run_control_loop(&mut controller, spawn_line_reader())
        }
        (RendererKind::Playback, true) => {
            let mut source =
                Packetizer::new(new_synth(&settings, sample_rate), PACKET_FRAMES);
            if let Some(message) = initial {
                source.receive(&message.parameter_update());
            }
            let _stream = audio_io::run_output_stream(&target, engine, xrun_count.clone())?;
            run_loopback_source(&mut controller, &mut source, spawn_line_reader())
        }
        (RendererKind::Playback, false) => {
            let _stream = audio_io::run_output_stream(&target, engine, xrun_count.clone())?;
            run_pcm_pipe(&mut controller, spawn_packet_reader())
        }
    };

    log::info!(
        "Audio engine stopped. Stream errors: {}, ignored commands: {}, dropped chunks: {}",
        xrun_count.load(Ordering::Relaxed),
        controller.ignored_commands(),
        controller.dropped_chunks()
    );
    result
}

fn new_synth(settings: &EngineSettings, sample_rate: f32) -> SynthRenderer {
    let mut synth = match settings.rng_seed {
        Some(seed) => SynthRenderer::with_seed(sample_rate, seed),
        None => SynthRenderer::new(sample_rate),
    };
    synth.set_monaural_combine(settings.monaural_combine);
    synth
}

fn forward(controller: &mut EngineController, message: ControlMessage) {
    for command in message.into_commands() {
        if let Err(e) = controller.send(command) {
            log::warn!("{}", e);
        }
    }
}

/// JSON control messages, one per line.
fn spawn_line_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Raw planar f32 packets of `PACKET_FRAMES` frames. A shorter final
/// packet is forwarded as is.
fn spawn_packet_reader() -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::sync_channel(READ_AHEAD_PACKETS);
    thread::spawn(move || {
        let mut stdin = io::stdin().lock();
        loop {
            let mut packet = vec![0u8; PACKET_BYTES];
            let filled = match pcm::read_packet(&mut stdin, &mut packet) {
                Ok(filled) => filled,
                Err(e) => {
                    log::warn!("PCM input failed: {}", e);
                    break;
                }
            };
            let complete = filled == packet.len();
            if filled > 0 {
                packet.truncate(filled);
                if tx.send(packet).is_err() {
                    break;
                }
            }
            if !complete {
                log::info!("PCM input closed");
                break;
            }
        }
    });
    rx
}

fn run_control_loop(controller: &mut EngineController, lines: Receiver<String>) -> Result<()> {
    while !controller.stop_requested() {
        match lines.recv_timeout(POLL_INTERVAL) {
            Ok(line) => match controller.send_json(&line) {
                Ok(()) => log::debug!("Forwarded control message: {}", line),
                Err(e) => log::warn!("{}", e),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log::info!("Control input closed, stopping.");
                break;
            }
        }
    }
    Ok(())
}

/// Renders synthesized packets and delivers them to the playback path at
/// real-time pace, while stdin control messages retune the source.
fn run_loopback_source(
    controller: &mut EngineController,
    source: &mut Packetizer,
    lines: Receiver<String>,
) -> Result<()> {
    let period = source.packet_duration();
    let mut next_deadline = Instant::now();
    let mut input_open = true;

    while !controller.stop_requested() {
        while input_open {
            match lines.try_recv() {
                Ok(line) => match ControlMessage::from_json(&line) {
                    Ok(message) => {
                        let update: ParameterUpdate = message.parameter_update();
                        if !update.is_empty() {
                            source.receive(&update);
                        }
                        if message.command.as_deref() == Some("stop") {
                            send_logged(controller, AudioCommand::Stop);
                        }
                    }
                    Err(e) => log::warn!("{}", e),
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::info!("Control input closed, stopping.");
                    input_open = false;
                    send_logged(controller, AudioCommand::Stop);
                }
            }
        }

        if let Err(e) = controller.push_pcm(&source.next_packet()) {
            log::warn!("{}", e);
        }
        next_deadline += period;
        if let Some(wait) = next_deadline.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }
    }
    Ok(())
}

fn run_pcm_pipe(controller: &mut EngineController, packets: Receiver<Vec<u8>>) -> Result<()> {
    while !controller.stop_requested() {
        match packets.recv_timeout(POLL_INTERVAL) {
            Ok(packet) => {
                while !controller.has_room_for_chunk() && !controller.stop_requested() {
                    controller.collect_retired();
                    thread::sleep(BACKOFF_INTERVAL);
                }
                match controller.push_pcm(&packet) {
                    Ok(()) => {}
                    Err(ControlError::QueueFull(_)) => {
                        log::warn!("Command queue full, packet dropped")
                    }
                    Err(e) => log::warn!("{}", e),
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                // let the jitter buffer drain before disconnecting
                thread::sleep(POLL_INTERVAL * 5);
                break;
            }
        }
    }
    Ok(())
}

fn send_logged(controller: &mut EngineController, command: AudioCommand) {
    if let Err(e) = controller.send(command) {
        log::warn!("{}", e);
    }
}
