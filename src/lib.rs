//! promptmidi - MIDI codec and beat timing core for prompt-driven music sketches.
//!
//! This library provides the Standard MIDI File encoder/decoder, the beat to
//! tick/transport timing model, General MIDI drum mapping, and key detection.

pub mod midi;
pub mod theory;

// Re-export commonly used types
pub use midi::{
    decode_midi, encode_drum_hits, encode_notes, Composition, DrumHit, DrumPattern, DrumPiece,
    MidiError, NoteEvent, Piece, TICKS_PER_BEAT,
};
pub use theory::{detect_key, snap_to_key, DetectedKey, Mode};
