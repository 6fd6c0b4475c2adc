//! Key detection and pitch snapping.
//!
//! Detection scores all 24 major and natural-minor keys against a
//! duration-weighted pitch-class histogram. Snapping moves an out-of-key
//! pitch to the nearest in-key pitch.

use crate::midi::{NoteEvent, NOTE_NAMES};
use serde::{Deserialize, Serialize};
use std::fmt;

const MAJOR_STEPS: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
const MINOR_STEPS: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];

/// Penalty factor for weight on pitch classes outside the scale.
const OUT_OF_SCALE_PENALTY: f64 = 0.5;
/// Bonus factor for weight on the tonic.
const ROOT_BONUS: f64 = 0.5;
/// Bonus factor for weight on the dominant (7 semitones above the tonic).
const FIFTH_BONUS: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    /// Natural minor (Aeolian).
    Minor,
}

impl Mode {
    fn steps(self) -> &'static [u8; 7] {
        match self {
            Mode::Major => &MAJOR_STEPS,
            Mode::Minor => &MINOR_STEPS,
        }
    }
}

/// A key: tonic pitch class, mode, and the seven pitch classes of its scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedKey {
    /// Tonic pitch class (0 = C, 11 = B).
    pub root: u8,
    pub mode: Mode,
    /// Scale pitch classes in ascending degree order, starting at the root.
    pub scale_pitch_classes: [u8; 7],
}

impl DetectedKey {
    pub fn new(root: u8, mode: Mode) -> Self {
        let root = root % 12;
        let mut scale_pitch_classes = [0u8; 7];
        for (slot, step) in scale_pitch_classes.iter_mut().zip(mode.steps()) {
            *slot = (root + step) % 12;
        }
        Self {
            root,
            mode,
            scale_pitch_classes,
        }
    }

    /// Whether a pitch class (0-11) belongs to the scale.
    pub fn contains(&self, pitch_class: u8) -> bool {
        self.scale_pitch_classes.contains(&(pitch_class % 12))
    }
}

impl Default for DetectedKey {
    /// C major.
    fn default() -> Self {
        Self::new(0, Mode::Major)
    }
}

impl fmt::Display for DetectedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            Mode::Major => "major",
            Mode::Minor => "minor",
        };
        write!(f, "{} {}", NOTE_NAMES[self.root as usize], mode)
    }
}

/// Sums note durations per pitch class. Non-finite or negative durations
/// contribute nothing.
pub fn pitch_class_histogram(notes: &[NoteEvent]) -> [f64; 12] {
    let mut histogram = [0.0; 12];
    for note in notes {
        if note.duration.is_finite() && note.duration > 0.0 {
            histogram[note.pitch_class() as usize] += note.duration;
        }
    }
    histogram
}

/// Scores one key against a histogram.
///
/// Each pitch class adds its weight if in the scale and subtracts half its
/// weight otherwise; the tonic earns an extra half and the fifth an extra
/// 0.3 of their weight.
pub fn score_key(histogram: &[f64; 12], key: &DetectedKey) -> f64 {
    let fifth = (key.root + 7) % 12;
    histogram
        .iter()
        .enumerate()
        .map(|(pc, &weight)| {
            let pc = pc as u8;
            let mut score = if key.contains(pc) {
                weight
            } else {
                -OUT_OF_SCALE_PENALTY * weight
            };
            if pc == key.root {
                score += ROOT_BONUS * weight;
            }
            if pc == fifth {
                score += FIFTH_BONUS * weight;
            }
            score
        })
        .sum()
}

/// All 24 candidate keys with their scores, in candidate order: roots
/// ascending from C, major before minor for each root.
pub fn key_scores(notes: &[NoteEvent]) -> Vec<(DetectedKey, f64)> {
    let histogram = pitch_class_histogram(notes);
    (0..12u8)
        .flat_map(|root| [DetectedKey::new(root, Mode::Major), DetectedKey::new(root, Mode::Minor)])
        .map(|key| (key, score_key(&histogram, &key)))
        .collect()
}

/// Infers the most likely key of a set of notes.
///
/// Ties go to the earliest candidate in [`key_scores`] order (lower root
/// first, major before minor). An empty slice is C major without scoring.
///
/// # Examples
///
/// ```
/// use promptmidi::theory::{detect_key, Mode};
///
/// let key = detect_key(&[]);
/// assert_eq!((key.root, key.mode), (0, Mode::Major));
/// ```
pub fn detect_key(notes: &[NoteEvent]) -> DetectedKey {
    if notes.is_empty() {
        return DetectedKey::default();
    }

    let mut best: Option<(DetectedKey, f64)> = None;
    for (key, score) in key_scores(notes) {
        match best {
            // Strictly greater: earlier candidates keep ties.
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((key, score)),
        }
    }
    best.map(|(key, _)| key).unwrap_or_default()
}

/// Moves a pitch to the nearest pitch in `key`.
///
/// In-key pitches are returned unchanged. Otherwise the closest scale tone
/// above or below is chosen; when both are equally far the lower one wins.
/// Moves that would leave 0-127 are not considered.
pub fn snap_to_key(pitch: u8, key: &DetectedKey) -> u8 {
    let pitch = pitch.min(127);
    if key.contains(pitch % 12) {
        return pitch;
    }

    for distance in 1..=6u8 {
        if let Some(down) = pitch.checked_sub(distance) {
            if key.contains(down % 12) {
                return down;
            }
        }
        let up = pitch + distance;
        if up <= 127 && key.contains(up % 12) {
            return up;
        }
    }
    pitch
}

/// Snaps every note's pitch into `key`, returning how many notes moved.
pub fn snap_notes_to_key(notes: &mut [NoteEvent], key: &DetectedKey) -> usize {
    let mut moved = 0;
    for note in notes {
        let snapped = snap_to_key(note.pitch, key);
        if snapped != note.pitch {
            note.pitch = snapped;
            moved += 1;
        }
    }
    moved
}
