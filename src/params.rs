// src/params.rs

//! Control parameters for the synthesis path.
//! `ParameterUpdate` is the sparse write side, `ParameterSnapshot` the dense read side.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CARRIER_HZ: f64 = 400.0;
pub const DEFAULT_BEAT_HZ: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Waveform {
    /// Unknown names fall back to sine.
    pub fn from_name(name: &str) -> Self {
        match name {
            "square" => Waveform::Square,
            "triangle" => Waveform::Triangle,
            "sawtooth" => Waveform::Sawtooth,
            _ => Waveform::Sine,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeatMode {
    #[default]
    Binaural,
    Monaural,
}

impl BeatMode {
    /// Unknown names fall back to binaural.
    pub fn from_name(name: &str) -> Self {
        match name {
            "monaural" => BeatMode::Monaural,
            _ => BeatMode::Binaural,
        }
    }
}

/// Focus-level presets driving the per-block modulation mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FocusLevel {
    #[default]
    None,
    Focus10,
    Focus12,
    Focus15,
    Focus21,
}

impl FocusLevel {
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "10" => FocusLevel::Focus10,
            "12" => FocusLevel::Focus12,
            "15" => FocusLevel::Focus15,
            "21" => FocusLevel::Focus21,
            _ => FocusLevel::None,
        }
    }
}

/// The full parameter set read by the renderer at the start of every block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSnapshot {
    pub carrier_hz: f64,
    pub beat_hz: f64,
    pub phase_shift_deg: f64,
    pub amplitude: f64,
    pub waveform: Waveform,
    pub mode: BeatMode,
    /// `None` or a non-positive value bypasses the lowpass stage.
    pub filter_cutoff_hz: Option<f64>,
    pub focus_level: FocusLevel,
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self {
            carrier_hz: DEFAULT_CARRIER_HZ,
            beat_hz: DEFAULT_BEAT_HZ,
            phase_shift_deg: 0.0,
            amplitude: 1.0,
            waveform: Waveform::Sine,
            mode: BeatMode::Binaural,
            filter_cutoff_hz: None,
            focus_level: FocusLevel::None,
        }
    }
}

/// A sparse parameter update. Absent fields leave the snapshot untouched.
///
/// `filter_cutoff_hz` is doubly optional: `Some(None)` explicitly disables
/// the filter, while `None` keeps whatever cutoff was set before.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParameterUpdate {
    pub carrier_hz: Option<f64>,
    pub beat_hz: Option<f64>,
    pub phase_shift_deg: Option<f64>,
    pub amplitude: Option<f64>,
    pub waveform: Option<Waveform>,
    pub mode: Option<BeatMode>,
    pub filter_cutoff_hz: Option<Option<f64>>,
    pub focus_level: Option<FocusLevel>,
}

impl ParameterUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ParameterUpdate::default()
    }
}

/// Holds the latest merged snapshot. Owned by the render thread; updates
/// reach it through the command queue in arrival order.
#[derive(Debug, Clone, Default)]
pub struct ParameterMailbox {
    current: ParameterSnapshot,
}

impl ParameterMailbox {
    pub fn new(initial: ParameterSnapshot) -> Self {
        Self { current: initial }
    }

    /// Field-wise override. No validation or clamping.
    pub fn receive(&mut self, update: &ParameterUpdate) {
        let p = &mut self.current;
        if let Some(v) = update.carrier_hz {
            p.carrier_hz = v;
        }
        if let Some(v) = update.beat_hz {
            p.beat_hz = v;
        }
        if let Some(v) = update.phase_shift_deg {
            p.phase_shift_deg = v;
        }
        if let Some(v) = update.amplitude {
            p.amplitude = v;
        }
        if let Some(v) = update.waveform {
            p.waveform = v;
        }
        if let Some(v) = update.mode {
            p.mode = v;
        }
        if let Some(v) = update.filter_cutoff_hz {
            p.filter_cutoff_hz = v;
        }
        if let Some(v) = update.focus_level {
            p.focus_level = v;
        }
    }

    #[inline]
    pub fn snapshot(&self) -> ParameterSnapshot {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_startup_state() {
        let p = ParameterSnapshot::default();
        assert_eq!(p.carrier_hz, 400.0);
        assert_eq!(p.beat_hz, 10.0);
        assert_eq!(p.amplitude, 1.0);
        assert_eq!(p.waveform, Waveform::Sine);
        assert_eq!(p.mode, BeatMode::Binaural);
        assert_eq!(p.filter_cutoff_hz, None);
        assert_eq!(p.focus_level, FocusLevel::None);
    }

    #[test]
    fn receive_merges_only_present_fields() {
        let mut mailbox = ParameterMailbox::default();
        mailbox.receive(&ParameterUpdate {
            beat_hz: Some(6.0),
            waveform: Some(Waveform::Triangle),
            ..Default::default()
        });
        let p = mailbox.snapshot();
        assert_eq!(p.beat_hz, 6.0);
        assert_eq!(p.waveform, Waveform::Triangle);
        assert_eq!(p.carrier_hz, 400.0);
        assert_eq!(p.mode, BeatMode::Binaural);
    }

    #[test]
    fn later_updates_overwrite_earlier_ones() {
        let mut mailbox = ParameterMailbox::default();
        mailbox.receive(&ParameterUpdate {
            carrier_hz: Some(200.0),
            ..Default::default()
        });
        mailbox.receive(&ParameterUpdate {
            carrier_hz: Some(300.0),
            ..Default::default()
        });
        assert_eq!(mailbox.snapshot().carrier_hz, 300.0);
    }

    #[test]
    fn filter_cutoff_can_be_cleared_explicitly() {
        let mut mailbox = ParameterMailbox::default();
        mailbox.receive(&ParameterUpdate {
            filter_cutoff_hz: Some(Some(800.0)),
            ..Default::default()
        });
        mailbox.receive(&ParameterUpdate::default());
        assert_eq!(mailbox.snapshot().filter_cutoff_hz, Some(800.0));

        mailbox.receive(&ParameterUpdate {
            filter_cutoff_hz: Some(None),
            ..Default::default()
        });
        assert_eq!(mailbox.snapshot().filter_cutoff_hz, None);
    }

    #[test]
    fn out_of_range_values_are_kept_verbatim() {
        let mut mailbox = ParameterMailbox::default();
        mailbox.receive(&ParameterUpdate {
            carrier_hz: Some(5.0),
            beat_hz: Some(120.0),
            amplitude: Some(-3.0),
            ..Default::default()
        });
        let p = mailbox.snapshot();
        assert_eq!(p.carrier_hz, 5.0);
        assert_eq!(p.beat_hz, 120.0);
        assert_eq!(p.amplitude, -3.0);
    }

    #[test]
    fn name_parsing_falls_back() {
        assert_eq!(Waveform::from_name("noise"), Waveform::Sine);
        assert_eq!(Waveform::from_name("sawtooth"), Waveform::Sawtooth);
        assert_eq!(BeatMode::from_name("isochronic"), BeatMode::Binaural);
        assert_eq!(FocusLevel::from_name(""), FocusLevel::None);
        assert_eq!(FocusLevel::from_name("21"), FocusLevel::Focus21);
        assert_eq!(FocusLevel::from_name("42"), FocusLevel::None);
    }
}
