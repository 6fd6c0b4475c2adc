//! Playback schedules for the live transport.
//!
//! The scheduler that drives synthesis lives outside this crate. It receives
//! each event's transport position (bars:beats:sixteenths) and wall-clock
//! offsets, plus the loop length. Ticks play no part here.
//!
//! Loop policy: events starting at or after the loop end are dropped, and
//! notes sounding past it are cut at the loop end.

use super::drum::{DrumHit, DrumPiece, DRUM_HIT_LENGTH_BEATS};
use super::note::NoteEvent;
use super::timing::{beats_to_seconds, beats_to_transport_position, clamp_beats, TransportPosition};
use super::BEATS_PER_BAR;
use serde::Serialize;

/// A melodic note ready for the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledNote {
    pub id: String,
    pub pitch: u8,
    pub velocity: u8,
    pub position: TransportPosition,
    pub start_seconds: f64,
    pub duration_seconds: f64,
}

/// A drum trigger ready for the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledHit {
    pub id: String,
    pub drum_piece: DrumPiece,
    pub velocity: u8,
    pub position: TransportPosition,
    pub start_seconds: f64,
}

/// Events sorted by onset, with the loop they repeat in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSchedule<T> {
    pub bpm: f64,
    /// Loop length in 4/4 bars (at least 1).
    pub loop_bars: u32,
    pub loop_end: TransportPosition,
    pub loop_seconds: f64,
    pub events: Vec<T>,
}

/// Smallest whole number of bars covering `end_beats`, at least one.
fn bars_covering(end_beats: f64) -> u32 {
    let bars = (clamp_beats(end_beats) / BEATS_PER_BAR as f64).ceil();
    (bars as u32).max(1)
}

fn schedule_with<T>(
    bpm: f64,
    loop_bars: u32,
    mut events: Vec<(f64, T)>,
) -> PlaybackSchedule<T> {
    events.sort_by(|a, b| a.0.total_cmp(&b.0));
    let loop_beats = loop_bars as f64 * BEATS_PER_BAR as f64;
    PlaybackSchedule {
        bpm,
        loop_bars,
        loop_end: TransportPosition::new(loop_bars, 0, 0),
        loop_seconds: beats_to_seconds(loop_beats, bpm),
        events: events.into_iter().map(|(_, event)| event).collect(),
    }
}

/// Builds the transport schedule for melodic notes.
///
/// With `loop_bars` of `None` the loop is the shortest whole number of bars
/// that holds every note.
pub fn schedule_notes(
    notes: &[NoteEvent],
    bpm: f64,
    loop_bars: Option<u32>,
) -> PlaybackSchedule<ScheduledNote> {
    let loop_bars = loop_bars
        .map(|bars| bars.max(1))
        .unwrap_or_else(|| bars_covering(notes.iter().map(NoteEvent::end_time).fold(0.0, f64::max)));
    let loop_end_beats = loop_bars as f64 * BEATS_PER_BAR as f64;

    let events = notes
        .iter()
        .filter_map(|note| {
            let start = clamp_beats(note.start_time);
            if start >= loop_end_beats {
                return None;
            }
            let end = note.end_time().min(loop_end_beats);
            Some((
                start,
                ScheduledNote {
                    id: note.id.clone(),
                    pitch: note.pitch,
                    velocity: note.velocity,
                    position: beats_to_transport_position(start),
                    start_seconds: beats_to_seconds(start, bpm),
                    duration_seconds: beats_to_seconds(end - start, bpm),
                },
            ))
        })
        .collect();

    schedule_with(bpm, loop_bars, events)
}

/// Builds the transport schedule for drum hits.
pub fn schedule_drum_hits(
    hits: &[DrumHit],
    bpm: f64,
    loop_bars: Option<u32>,
) -> PlaybackSchedule<ScheduledHit> {
    let loop_bars = loop_bars.map(|bars| bars.max(1)).unwrap_or_else(|| {
        let last = hits
            .iter()
            .map(|h| clamp_beats(h.time) + DRUM_HIT_LENGTH_BEATS)
            .fold(0.0, f64::max);
        bars_covering(last)
    });
    let loop_end_beats = loop_bars as f64 * BEATS_PER_BAR as f64;

    let events = hits
        .iter()
        .filter_map(|hit| {
            let start = clamp_beats(hit.time);
            if start >= loop_end_beats {
                return None;
            }
            Some((
                start,
                ScheduledHit {
                    id: hit.id.clone(),
                    drum_piece: hit.drum_piece,
                    velocity: hit.velocity,
                    position: beats_to_transport_position(start),
                    start_seconds: beats_to_seconds(start, bpm),
                },
            ))
        })
        .collect();

    schedule_with(bpm, loop_bars, events)
}
