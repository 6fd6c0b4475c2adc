//! Conversions between musical beats, MIDI ticks, transport positions, and
//! wall-clock seconds.
//!
//! Two representations live side by side and must never be mixed up:
//! ticks feed the file encoder, transport positions feed the live playback
//! scheduler. All functions are pure.

use super::{DEFAULT_TEMPO, TICKS_PER_BEAT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Beats per bar. The transport clock always assumes 4/4.
pub const BEATS_PER_BAR: u32 = 4;

/// Sixteenth notes per beat.
pub const SIXTEENTHS_PER_BEAT: u32 = 4;

/// Largest tempo value the 24-bit Set Tempo field can hold.
const MAX_MICROS_PER_BEAT: u32 = 0x00FF_FFFF;

/// Replaces negative and non-finite beat values with zero.
#[inline]
pub fn clamp_beats(beats: f64) -> f64 {
    if beats.is_finite() && beats > 0.0 {
        beats
    } else {
        0.0
    }
}

/// Converts a beat position to ticks at the default 480 ticks per beat.
///
/// # Examples
///
/// ```
/// use promptmidi::midi::beats_to_ticks;
///
/// assert_eq!(beats_to_ticks(1.5), 720);
/// assert_eq!(beats_to_ticks(-2.0), 0);
/// ```
pub fn beats_to_ticks(beats: f64) -> u32 {
    beats_to_ticks_with(beats, TICKS_PER_BEAT)
}

/// Converts a beat position to ticks at an arbitrary resolution.
///
/// Computes `round(max(0, beats) * ticks_per_beat)`. This rounding is the only
/// source of quantization error in the codec. Results beyond `u32::MAX`
/// saturate.
pub fn beats_to_ticks_with(beats: f64, ticks_per_beat: u32) -> u32 {
    (clamp_beats(beats) * ticks_per_beat as f64).round() as u32
}

/// Converts ticks back to beats using the resolution the ticks were written at.
pub fn ticks_to_beats(ticks: u64, ticks_per_beat: u32) -> f64 {
    if ticks_per_beat == 0 {
        return 0.0;
    }
    ticks as f64 / ticks_per_beat as f64
}

/// A bars:beats:sixteenths position on the playback transport clock.
///
/// All three fields are zero-based. `beat` is always below 4 and
/// `sixteenth` always below 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransportPosition {
    pub bar: u32,
    pub beat: u32,
    pub sixteenth: u32,
}

impl TransportPosition {
    /// Creates a position, normalizing overflowing sixteenths and beats upward.
    pub fn new(bar: u32, beat: u32, sixteenth: u32) -> Self {
        let beat = beat + sixteenth / SIXTEENTHS_PER_BEAT;
        Self {
            bar: bar + beat / BEATS_PER_BAR,
            beat: beat % BEATS_PER_BAR,
            sixteenth: sixteenth % SIXTEENTHS_PER_BEAT,
        }
    }
}

impl fmt::Display for TransportPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.bar, self.beat, self.sixteenth)
    }
}

/// Decomposes a beat position into whole bars, whole beats, and a remainder
/// rounded to the nearest sixteenth.
///
/// A rounded sixteenth count of 4 rolls into the next beat, and a beat count
/// of 4 rolls into the next bar.
///
/// # Examples
///
/// ```
/// use promptmidi::midi::{beats_to_transport_position, TransportPosition};
///
/// assert_eq!(
///     beats_to_transport_position(5.5),
///     TransportPosition { bar: 1, beat: 1, sixteenth: 2 }
/// );
/// // 3.9 beats rounds up to the downbeat of bar 1.
/// assert_eq!(
///     beats_to_transport_position(3.9),
///     TransportPosition { bar: 1, beat: 0, sixteenth: 0 }
/// );
/// ```
pub fn beats_to_transport_position(beats: f64) -> TransportPosition {
    let beats = clamp_beats(beats);
    let whole_beats = beats.floor();
    let sixteenth = ((beats - whole_beats) * SIXTEENTHS_PER_BEAT as f64).round() as u32;
    // Saturating cast; absurd inputs pin to the far end of the clock.
    let whole_beats = whole_beats as u64;
    let bar = (whole_beats / BEATS_PER_BAR as u64).min(u32::MAX as u64 - 1) as u32;
    let beat = (whole_beats % BEATS_PER_BAR as u64) as u32;
    TransportPosition::new(bar, beat, sixteenth)
}

/// Converts a transport position back into beats.
pub fn transport_position_to_beats(position: TransportPosition) -> f64 {
    position.bar as f64 * BEATS_PER_BAR as f64
        + position.beat as f64
        + position.sixteenth as f64 / SIXTEENTHS_PER_BEAT as f64
}

/// Converts beats to seconds at the given tempo.
pub fn beats_to_seconds(beats: f64, bpm: f64) -> f64 {
    clamp_beats(beats) * 60.0 / effective_bpm(bpm)
}

/// Converts seconds to beats at the given tempo.
pub fn seconds_to_beats(seconds: f64, bpm: f64) -> f64 {
    clamp_beats(seconds) * effective_bpm(bpm) / 60.0
}

/// Converts BPM to the microseconds-per-beat value stored in a Set Tempo event.
///
/// Computes `round(60_000_000 / bpm)`, clamped to the 24-bit field. Non-finite
/// or non-positive tempos fall back to the default tempo.
pub fn bpm_to_micros_per_beat(bpm: f64) -> u32 {
    let micros = (60_000_000.0 / effective_bpm(bpm)).round();
    (micros as u32).clamp(1, MAX_MICROS_PER_BEAT)
}

/// Converts a Set Tempo value back to BPM.
pub fn micros_per_beat_to_bpm(micros_per_beat: u32) -> f64 {
    if micros_per_beat == 0 {
        return DEFAULT_TEMPO as f64;
    }
    60_000_000.0 / micros_per_beat as f64
}

fn effective_bpm(bpm: f64) -> f64 {
    if bpm.is_finite() && bpm > 0.0 {
        bpm
    } else {
        DEFAULT_TEMPO as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beats_to_ticks() {
        assert_eq!(beats_to_ticks(0.0), 0);
        assert_eq!(beats_to_ticks(1.0), 480);
        assert_eq!(beats_to_ticks(0.25), 120);
        assert_eq!(beats_to_ticks(1.0 / 3.0), 160);
        assert_eq!(beats_to_ticks_with(1.0, 96), 96);
    }

    #[test]
    fn test_invalid_beats_clamp_to_zero() {
        assert_eq!(beats_to_ticks(-1.0), 0);
        assert_eq!(beats_to_ticks(f64::NAN), 0);
        assert_eq!(beats_to_ticks(f64::NEG_INFINITY), 0);
        assert_eq!(beats_to_ticks(f64::INFINITY), 0);
        assert_eq!(
            beats_to_transport_position(f64::NAN),
            TransportPosition::new(0, 0, 0)
        );
    }

    #[test]
    fn test_ticks_to_beats() {
        assert_eq!(ticks_to_beats(720, 480), 1.5);
        assert_eq!(ticks_to_beats(96, 96), 1.0);
        assert_eq!(ticks_to_beats(10, 0), 0.0);
    }

    #[test]
    fn test_transport_position() {
        assert_eq!(
            beats_to_transport_position(0.0),
            TransportPosition::new(0, 0, 0)
        );
        assert_eq!(
            beats_to_transport_position(2.25),
            TransportPosition::new(0, 2, 1)
        );
        assert_eq!(
            beats_to_transport_position(4.0),
            TransportPosition::new(1, 0, 0)
        );
        assert_eq!(
            beats_to_transport_position(13.75),
            TransportPosition::new(3, 1, 3)
        );
    }

    #[test]
    fn test_transport_carry() {
        // 1.9 rounds to 4 sixteenths, which carries into beat 2.
        assert_eq!(
            beats_to_transport_position(1.9),
            TransportPosition { bar: 0, beat: 2, sixteenth: 0 }
        );
        // Carry through both beat and bar.
        assert_eq!(
            beats_to_transport_position(7.95),
            TransportPosition { bar: 2, beat: 0, sixteenth: 0 }
        );
    }

    #[test]
    fn test_transport_display_and_inverse() {
        let position = beats_to_transport_position(9.5);
        assert_eq!(position.to_string(), "2:1:2");
        assert_eq!(transport_position_to_beats(position), 9.5);
    }

    #[test]
    fn test_conversions_are_monotonic() {
        let mut previous_ticks = 0;
        let mut previous_position = TransportPosition::new(0, 0, 0);
        for i in 0..2000 {
            let beats = i as f64 * 0.037;
            let ticks = beats_to_ticks(beats);
            let position = beats_to_transport_position(beats);
            assert!(ticks >= previous_ticks);
            assert!(position >= previous_position);
            previous_ticks = ticks;
            previous_position = position;
        }
    }

    #[test]
    fn test_tempo_conversions() {
        assert_eq!(bpm_to_micros_per_beat(120.0), 500_000);
        assert_eq!(bpm_to_micros_per_beat(137.0), 437_956);
        assert_eq!(bpm_to_micros_per_beat(0.0), 500_000);
        assert_eq!(bpm_to_micros_per_beat(f64::NAN), 500_000);
        assert_eq!(bpm_to_micros_per_beat(1.0), 0x00FF_FFFF);
        assert!((micros_per_beat_to_bpm(437_956) - 137.0).abs() < 0.01);
        assert_eq!(micros_per_beat_to_bpm(0), 120.0);
    }

    #[test]
    fn test_seconds() {
        assert!((beats_to_seconds(1.0, 120.0) - 0.5).abs() < 1e-9);
        assert!((seconds_to_beats(0.5, 120.0) - 1.0).abs() < 1e-9);
    }
}
