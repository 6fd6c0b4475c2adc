//! Error types for MIDI encoding, decoding, and range validation.

use thiserror::Error;

/// Errors surfaced by the MIDI codec and composition validation.
#[derive(Debug, Error)]
pub enum MidiError {
    /// The byte stream ended early or contained an invalid chunk/event.
    /// Fatal for the whole decode call.
    #[error("malformed MIDI stream: {0}")]
    MalformedStream(String),

    /// The file parsed cleanly but contained no usable notes or hits.
    #[error("no notes found in MIDI file")]
    EmptyResult,

    /// SMPTE time division or Format 2 (sequential) files, which have no
    /// single shared beat grid.
    #[error("unsupported MIDI format: {0}")]
    UnsupportedFormat(String),

    /// A field is outside the range the encoder expects.
    /// Reported by validation, never by the encoder itself.
    #[error("{field} out of range: {value}")]
    OutOfRangeValue { field: &'static str, value: f64 },

    /// File could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MidiError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        MidiError::MalformedStream(msg.into())
    }
}
