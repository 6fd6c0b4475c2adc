//! Drum hits and the General MIDI percussion mapping.
//!
//! The forward direction (drum piece -> GM note) is exact and used by the
//! encoder. The reverse direction also accepts common alias notes written by
//! other software, and falls back to the nearest known note within an octave.

use super::note::IdGenerator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Gate length written for every drum hit, in beats (a sixteenth note).
pub const DRUM_HIT_LENGTH_BEATS: f64 = 0.25;

/// GM percussion key range (Acoustic Bass Drum to Open Triangle).
pub const GM_PERCUSSION_RANGE: RangeInclusive<u8> = 35..=81;

/// Farthest a non-listed percussion note may be from a listed one and still map.
pub const MAX_NEAREST_DRUM_DISTANCE: u8 = 12;

/// The drum pieces the pattern editor can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DrumPiece {
    Kick,
    Snare,
    Clap,
    ClosedHiHat,
    OpenHiHat,
    Crash,
    Ride,
    HighTom,
    LowTom,
}

impl DrumPiece {
    /// All pieces, in editor row order.
    pub const ALL: [DrumPiece; 9] = [
        DrumPiece::Kick,
        DrumPiece::Snare,
        DrumPiece::Clap,
        DrumPiece::ClosedHiHat,
        DrumPiece::OpenHiHat,
        DrumPiece::Crash,
        DrumPiece::Ride,
        DrumPiece::HighTom,
        DrumPiece::LowTom,
    ];

    /// Canonical GM note for this piece.
    pub fn gm_note(self) -> u8 {
        gm_note_for_drum_piece(self)
    }
}

impl fmt::Display for DrumPiece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DrumPiece::Kick => "kick",
            DrumPiece::Snare => "snare",
            DrumPiece::Clap => "clap",
            DrumPiece::ClosedHiHat => "closedHiHat",
            DrumPiece::OpenHiHat => "openHiHat",
            DrumPiece::Crash => "crash",
            DrumPiece::Ride => "ride",
            DrumPiece::HighTom => "highTom",
            DrumPiece::LowTom => "lowTom",
        };
        f.write_str(name)
    }
}

/// Returns the canonical GM percussion note for a drum piece.
pub fn gm_note_for_drum_piece(piece: DrumPiece) -> u8 {
    match piece {
        DrumPiece::Kick => 36,        // Bass Drum 1
        DrumPiece::Snare => 38,       // Acoustic Snare
        DrumPiece::Clap => 39,        // Hand Clap
        DrumPiece::ClosedHiHat => 42, // Closed Hi-Hat
        DrumPiece::OpenHiHat => 46,   // Open Hi-Hat
        DrumPiece::Crash => 49,       // Crash Cymbal 1
        DrumPiece::Ride => 51,        // Ride Cymbal 1
        DrumPiece::HighTom => 50,     // High Tom
        DrumPiece::LowTom => 45,      // Low Tom
    }
}

/// GM notes accepted on import, sorted by note number.
/// Canonical notes plus the aliases other sequencers commonly write.
const REVERSE_TABLE: [(u8, DrumPiece); 22] = [
    (35, DrumPiece::Kick),        // Acoustic Bass Drum
    (36, DrumPiece::Kick),        // Bass Drum 1
    (37, DrumPiece::Snare),       // Side Stick
    (38, DrumPiece::Snare),       // Acoustic Snare
    (39, DrumPiece::Clap),        // Hand Clap
    (40, DrumPiece::Snare),       // Electric Snare
    (41, DrumPiece::LowTom),      // Low Floor Tom
    (42, DrumPiece::ClosedHiHat), // Closed Hi-Hat
    (43, DrumPiece::LowTom),      // High Floor Tom
    (44, DrumPiece::ClosedHiHat), // Pedal Hi-Hat
    (45, DrumPiece::LowTom),      // Low Tom
    (46, DrumPiece::OpenHiHat),   // Open Hi-Hat
    (47, DrumPiece::LowTom),      // Low-Mid Tom
    (48, DrumPiece::HighTom),     // Hi-Mid Tom
    (49, DrumPiece::Crash),       // Crash Cymbal 1
    (50, DrumPiece::HighTom),     // High Tom
    (51, DrumPiece::Ride),        // Ride Cymbal 1
    (52, DrumPiece::Crash),       // Chinese Cymbal
    (53, DrumPiece::Ride),        // Ride Bell
    (55, DrumPiece::Crash),       // Splash Cymbal
    (57, DrumPiece::Crash),       // Crash Cymbal 2
    (59, DrumPiece::Ride),        // Ride Cymbal 2
];

/// Maps a GM note number to a drum piece.
///
/// Listed notes map directly. Other notes inside [`GM_PERCUSSION_RANGE`] take
/// the piece of the closest listed note, if it is at most an octave away; on
/// equal distance the lower listed note wins. Everything else is unmappable.
///
/// # Examples
///
/// ```
/// use promptmidi::midi::{drum_piece_for_gm_note, DrumPiece};
///
/// assert_eq!(drum_piece_for_gm_note(36), Some(DrumPiece::Kick));
/// assert_eq!(drum_piece_for_gm_note(40), Some(DrumPiece::Snare));
/// assert_eq!(drum_piece_for_gm_note(80), None); // Mute Triangle
/// ```
pub fn drum_piece_for_gm_note(note: u8) -> Option<DrumPiece> {
    if let Some(&(_, piece)) = REVERSE_TABLE.iter().find(|(n, _)| *n == note) {
        return Some(piece);
    }
    if !GM_PERCUSSION_RANGE.contains(&note) {
        return None;
    }

    // Table is sorted ascending, so min_by_key keeps the lower note on ties.
    let (nearest, piece) = REVERSE_TABLE
        .iter()
        .copied()
        .min_by_key(|(n, _)| n.abs_diff(note))?;
    if nearest.abs_diff(note) <= MAX_NEAREST_DRUM_DISTANCE {
        Some(piece)
    } else {
        None
    }
}

/// A single percussion trigger. Only the onset matters; the encoder writes a
/// fixed [`DRUM_HIT_LENGTH_BEATS`] gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrumHit {
    /// Unique identifier for this hit.
    pub id: String,

    pub drum_piece: DrumPiece,

    /// Onset in beats from the start of the pattern.
    pub time: f64,

    /// Hit velocity (0-127).
    pub velocity: u8,
}

impl DrumHit {
    /// Creates a hit with a fresh id from `ids`.
    pub fn new(ids: &mut impl IdGenerator, drum_piece: DrumPiece, time: f64, velocity: u8) -> Self {
        Self {
            id: ids.next_id(),
            drum_piece,
            time,
            velocity,
        }
    }

    /// Canonical GM note for this hit's piece.
    pub fn gm_note(&self) -> u8 {
        self.drum_piece.gm_note()
    }
}
