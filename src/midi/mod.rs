//! Musical data model and the Standard MIDI File codec.
//!
//! This module provides the note and drum-hit types, the beat/tick/transport
//! timing model, and a single-track (Type 0) SMF encoder and decoder.

mod composition;
mod drum;
mod error;
mod midi_export;
mod midi_import;
mod note;
mod schedule;
mod timing;
mod vlq;

pub use composition::{export_file_name, Composition, DrumPattern, Piece};
pub use drum::{
    drum_piece_for_gm_note, gm_note_for_drum_piece, DrumHit, DrumPiece, DRUM_HIT_LENGTH_BEATS,
    GM_PERCUSSION_RANGE, MAX_NEAREST_DRUM_DISTANCE,
};
pub use error::MidiError;
pub use midi_export::{
    encode_drum_hits, encode_drum_hits_with_resolution, encode_notes,
    encode_notes_with_resolution, export_to_midi, MidiFile, MIDI_MIME_TYPE,
};
pub use midi_import::{
    decode_drum_hits, decode_midi, decode_notes, import_from_midi, title_from_file_name,
};
pub use note::{IdGenerator, NoteEvent, PartRole, SequentialIdGenerator, UuidIdGenerator};
pub use schedule::{
    schedule_drum_hits, schedule_notes, PlaybackSchedule, ScheduledHit, ScheduledNote,
};
pub use timing::{
    beats_to_seconds, beats_to_ticks, beats_to_ticks_with, beats_to_transport_position,
    bpm_to_micros_per_beat, clamp_beats, micros_per_beat_to_bpm, seconds_to_beats,
    ticks_to_beats, transport_position_to_beats, TransportPosition, BEATS_PER_BAR,
    SIXTEENTHS_PER_BEAT,
};
pub use vlq::{decode_vlq, encode_vlq, write_vlq};

/// Standard MIDI note names for display purposes.
/// Maps MIDI note number (0-127) to note name within an octave.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Ticks per beat (quarter note) written into exported files.
pub const TICKS_PER_BEAT: u32 = 480;

/// Default tempo in beats per minute.
pub const DEFAULT_TEMPO: u32 = 120;

/// Slowest tempo a composition may carry.
pub const MIN_BPM: f64 = 1.0;

/// Fastest tempo a composition may carry.
pub const MAX_BPM: f64 = 300.0;

/// Lowest melodic pitch kept on generation and import (A0).
pub const MIN_PIANO_PITCH: u8 = 21;

/// Highest melodic pitch kept on generation and import (C8).
pub const MAX_PIANO_PITCH: u8 = 108;

/// Shortest note duration accepted on import, in beats.
pub const MIN_NOTE_DURATION_BEATS: f64 = 1.0 / 16.0;

/// Channel used for melodic notes.
pub const MELODIC_CHANNEL: u8 = 0;

/// General MIDI percussion channel (channel 10, zero-indexed).
pub const DRUM_CHANNEL: u8 = 9;
