//! Music-theory helpers that work on decoded or generated notes.
//!
//! Independent of the MIDI codec: key detection and pitch snapping only look
//! at pitches and durations.

mod key;

pub use key::{
    detect_key, key_scores, pitch_class_histogram, score_key, snap_notes_to_key, snap_to_key,
    DetectedKey, Mode,
};
