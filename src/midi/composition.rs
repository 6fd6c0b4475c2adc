//! Composition containers.
//!
//! A [`Composition`] holds melodic notes, a [`DrumPattern`] holds drum hits.
//! Both are replaced wholesale on regeneration; the only in-place edits are
//! add, remove, and velocity updates, which leave every other entry untouched.

use super::drum::DrumHit;
use super::error::MidiError;
use super::note::NoteEvent;
use super::timing::beats_to_seconds;
use super::{DEFAULT_TEMPO, MAX_BPM, MAX_PIANO_PITCH, MIN_BPM, MIN_PIANO_PITCH};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A titled sequence of melodic notes at a fixed tempo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub title: String,

    /// Tempo in beats per minute (1-300).
    pub bpm: f64,

    /// Notes in no guaranteed order. Call [`Composition::sort`] before
    /// order-sensitive work.
    pub notes: Vec<NoteEvent>,
}

impl Composition {
    /// Creates an empty composition at the default tempo.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            bpm: DEFAULT_TEMPO as f64,
            notes: Vec::new(),
        }
    }

    /// Appends a note and returns its id.
    pub fn add_note(&mut self, note: NoteEvent) -> String {
        let id = note.id.clone();
        self.notes.push(note);
        id
    }

    /// Removes a note by id, returning it if it existed.
    pub fn remove_note(&mut self, id: &str) -> Option<NoteEvent> {
        let pos = self.notes.iter().position(|n| n.id == id)?;
        Some(self.notes.remove(pos))
    }

    /// Returns a note by id.
    pub fn get_note(&self, id: &str) -> Option<&NoteEvent> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Sets one note's velocity (clamped to 127). Returns false if no note has
    /// that id.
    pub fn update_velocity(&mut self, id: &str, velocity: u8) -> bool {
        match self.notes.iter_mut().find(|n| n.id == id) {
            Some(note) => {
                note.velocity = velocity.min(127);
                true
            }
            None => false,
        }
    }

    /// Restores onset order. Stable, so simultaneous notes keep their order.
    pub fn sort(&mut self) {
        self.notes
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    }

    /// End of the last sounding note, in beats.
    pub fn end_beats(&self) -> f64 {
        self.notes
            .iter()
            .map(NoteEvent::end_time)
            .fold(0.0, f64::max)
    }

    /// Total length in seconds at the composition tempo.
    pub fn duration_seconds(&self) -> f64 {
        beats_to_seconds(self.end_beats(), self.bpm)
    }

    /// Clamps tempo and every note into encoder-safe ranges.
    pub fn sanitize(&mut self) {
        self.bpm = sanitize_bpm(self.bpm);
        for note in &mut self.notes {
            note.sanitize();
        }
    }

    /// Checks the ranges the encoder relies on without modifying anything.
    ///
    /// # Errors
    ///
    /// `OutOfRangeValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), MidiError> {
        validate_bpm(self.bpm)?;
        for note in &self.notes {
            if !(MIN_PIANO_PITCH..=MAX_PIANO_PITCH).contains(&note.pitch) {
                return Err(out_of_range("pitch", note.pitch as f64));
            }
            if note.velocity > 127 {
                return Err(out_of_range("velocity", note.velocity as f64));
            }
            if !note.start_time.is_finite() || note.start_time < 0.0 {
                return Err(out_of_range("startTime", note.start_time));
            }
            if !note.duration.is_finite() || note.duration <= 0.0 {
                return Err(out_of_range("duration", note.duration));
            }
        }
        Ok(())
    }

    /// Suggested download name for this composition.
    pub fn file_name(&self) -> String {
        export_file_name(&self.title)
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a composition from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for Composition {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// A titled set of drum hits at a fixed tempo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrumPattern {
    pub title: String,

    /// Tempo in beats per minute (1-300).
    pub bpm: f64,

    pub hits: Vec<DrumHit>,
}

impl DrumPattern {
    /// Creates an empty pattern at the default tempo.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            bpm: DEFAULT_TEMPO as f64,
            hits: Vec::new(),
        }
    }

    /// Appends a hit and returns its id.
    pub fn add_hit(&mut self, hit: DrumHit) -> String {
        let id = hit.id.clone();
        self.hits.push(hit);
        id
    }

    /// Removes a hit by id, returning it if it existed.
    pub fn remove_hit(&mut self, id: &str) -> Option<DrumHit> {
        let pos = self.hits.iter().position(|h| h.id == id)?;
        Some(self.hits.remove(pos))
    }

    /// Sets one hit's velocity (clamped to 127). Returns false if no hit has
    /// that id.
    pub fn update_velocity(&mut self, id: &str, velocity: u8) -> bool {
        match self.hits.iter_mut().find(|h| h.id == id) {
            Some(hit) => {
                hit.velocity = velocity.min(127);
                true
            }
            None => false,
        }
    }

    /// Restores onset order (stable).
    pub fn sort(&mut self) {
        self.hits.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// Clamps tempo, hit times, and velocities into encoder-safe ranges.
    pub fn sanitize(&mut self) {
        self.bpm = sanitize_bpm(self.bpm);
        for hit in &mut self.hits {
            hit.time = super::timing::clamp_beats(hit.time);
            hit.velocity = hit.velocity.min(127);
        }
    }

    /// Checks the ranges the encoder relies on without modifying anything.
    pub fn validate(&self) -> Result<(), MidiError> {
        validate_bpm(self.bpm)?;
        for hit in &self.hits {
            if hit.velocity > 127 {
                return Err(out_of_range("velocity", hit.velocity as f64));
            }
            if !hit.time.is_finite() || hit.time < 0.0 {
                return Err(out_of_range("time", hit.time));
            }
        }
        Ok(())
    }

    /// Suggested download name for this pattern.
    pub fn file_name(&self) -> String {
        export_file_name(&self.title)
    }
}

impl Default for DrumPattern {
    fn default() -> Self {
        Self::new("Untitled Beat")
    }
}

/// Either kind of musical material. Deserializes from JSON by shape: objects
/// with `notes` are compositions, objects with `hits` are drum patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Piece {
    Melodic(Composition),
    Drums(DrumPattern),
}

impl Piece {
    pub fn title(&self) -> &str {
        match self {
            Piece::Melodic(c) => &c.title,
            Piece::Drums(p) => &p.title,
        }
    }

    pub fn bpm(&self) -> f64 {
        match self {
            Piece::Melodic(c) => c.bpm,
            Piece::Drums(p) => p.bpm,
        }
    }

    /// Number of notes or hits.
    pub fn event_count(&self) -> usize {
        match self {
            Piece::Melodic(c) => c.notes.len(),
            Piece::Drums(p) => p.hits.len(),
        }
    }

    pub fn sanitize(&mut self) {
        match self {
            Piece::Melodic(c) => c.sanitize(),
            Piece::Drums(p) => p.sanitize(),
        }
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses either kind of piece from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Saves the piece to a JSON file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }

    /// Loads a piece from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Derives a `.mid` file name from a title: every character that is not an
/// ASCII letter or digit becomes `_`.
///
/// # Examples
///
/// ```
/// use promptmidi::midi::export_file_name;
///
/// assert_eq!(export_file_name("Lo-fi Loop #2"), "Lo_fi_Loop__2.mid");
/// assert_eq!(export_file_name(""), "composition.mid");
/// ```
pub fn export_file_name(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "composition.mid".to_string()
    } else {
        format!("{}.mid", stem)
    }
}

fn sanitize_bpm(bpm: f64) -> f64 {
    if bpm.is_finite() {
        bpm.clamp(MIN_BPM, MAX_BPM)
    } else {
        DEFAULT_TEMPO as f64
    }
}

fn validate_bpm(bpm: f64) -> Result<(), MidiError> {
    if bpm.is_finite() && (MIN_BPM..=MAX_BPM).contains(&bpm) {
        Ok(())
    } else {
        Err(out_of_range("bpm", bpm))
    }
}

fn out_of_range(field: &'static str, value: f64) -> MidiError {
    MidiError::OutOfRangeValue { field, value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{DrumPiece, SequentialIdGenerator};

    fn sample() -> Composition {
        let mut ids = SequentialIdGenerator::new("n");
        let mut composition = Composition::new("Test");
        composition.add_note(NoteEvent::new(&mut ids, 64, 90, 2.0, 1.0));
        composition.add_note(NoteEvent::new(&mut ids, 60, 100, 0.0, 1.0));
        composition.add_note(NoteEvent::new(&mut ids, 67, 80, 1.0, 2.5));
        composition
    }

    #[test]
    fn test_sort_restores_onset_order() {
        let mut composition = sample();
        composition.sort();
        let starts: Vec<f64> = composition.notes.iter().map(|n| n.start_time).collect();
        assert_eq!(starts, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_edits_preserve_other_notes() {
        let mut composition = sample();
        let before = composition.notes.clone();

        assert!(composition.update_velocity("n-2", 30));
        assert_eq!(composition.get_note("n-2").unwrap().velocity, 30);
        assert_eq!(composition.notes[0], before[0]);
        assert_eq!(composition.notes[2], before[2]);

        let removed = composition.remove_note("n-1").unwrap();
        assert_eq!(removed.pitch, 64);
        assert_eq!(composition.notes.len(), 2);
        assert!(composition.remove_note("n-1").is_none());
        assert!(!composition.update_velocity("missing", 10));
    }

    #[test]
    fn test_end_and_duration() {
        let composition = sample();
        assert_eq!(composition.end_beats(), 3.5);
        assert!((composition.duration_seconds() - 1.75).abs() < 1e-9);
        assert_eq!(Composition::new("Empty").end_beats(), 0.0);
    }

    #[test]
    fn test_validate_and_sanitize() {
        let mut composition = sample();
        assert!(composition.validate().is_ok());

        composition.notes[0].pitch = 10;
        composition.bpm = 500.0;
        assert!(matches!(
            composition.validate(),
            Err(MidiError::OutOfRangeValue { field: "bpm", .. })
        ));
        composition.sanitize();
        assert_eq!(composition.bpm, 300.0);
        assert_eq!(composition.notes[0].pitch, 21);
        assert!(composition.validate().is_ok());

        composition.notes[1].duration = 0.0;
        assert!(matches!(
            composition.validate(),
            Err(MidiError::OutOfRangeValue { field: "duration", .. })
        ));
    }

    #[test]
    fn test_drum_pattern_edits() {
        let mut ids = SequentialIdGenerator::new("h");
        let mut pattern = DrumPattern::new("Beat");
        pattern.add_hit(DrumHit::new(&mut ids, DrumPiece::Snare, 1.0, 100));
        pattern.add_hit(DrumHit::new(&mut ids, DrumPiece::Kick, 0.0, 110));
        pattern.sort();
        assert_eq!(pattern.hits[0].drum_piece, DrumPiece::Kick);
        assert!(pattern.update_velocity("h-1", 64));
        assert_eq!(pattern.hits[1].velocity, 64);
        assert!(pattern.remove_hit("h-2").is_some());
        assert_eq!(pattern.hits.len(), 1);

        pattern.hits[0].time = -1.0;
        assert!(pattern.validate().is_err());
        pattern.sanitize();
        assert_eq!(pattern.hits[0].time, 0.0);
    }

    #[test]
    fn test_piece_json_by_shape() {
        let melodic = Piece::from_json(
            r#"{"title":"A","bpm":90,"notes":[{"id":"a","pitch":60,"velocity":100,"startTime":0,"duration":1}]}"#,
        )
        .unwrap();
        assert!(matches!(melodic, Piece::Melodic(_)));
        assert_eq!(melodic.event_count(), 1);

        let drums = Piece::from_json(
            r#"{"title":"B","bpm":100,"hits":[{"id":"b","drumPiece":"kick","time":0,"velocity":100}]}"#,
        )
        .unwrap();
        assert!(matches!(drums, Piece::Drums(_)));
        assert_eq!(drums.title(), "B");

        let json = drums.to_json().unwrap();
        assert_eq!(Piece::from_json(&json).unwrap(), drums);
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("My Song"), "My_Song.mid");
        assert_eq!(export_file_name("  beat 01  "), "beat_01.mid");
        assert_eq!(export_file_name("Café"), "Caf_.mid");
        assert_eq!(sample().file_name(), "Test.mid");
    }
}
