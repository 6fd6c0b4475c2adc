//! Melodic note representation and event id generation.
//!
//! A note is positioned in beats (quarter notes) from the start of the piece.
//! Ids come from an injected [`IdGenerator`] rather than a process-wide counter,
//! so decoding the same bytes twice with fresh generators yields the same ids.

use super::timing::clamp_beats;
use super::{MAX_PIANO_PITCH, MIN_NOTE_DURATION_BEATS, MIN_PIANO_PITCH};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Produces unique, never-reused event ids.
pub trait IdGenerator {
    /// Returns the next id.
    fn next_id(&mut self) -> String;
}

/// Random v4 UUIDs. Safe across sessions and compositions.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Monotonic counter scoped to one generator instance, e.g. one composition.
///
/// # Examples
///
/// ```
/// use promptmidi::midi::{IdGenerator, SequentialIdGenerator};
///
/// let mut ids = SequentialIdGenerator::new("note");
/// assert_eq!(ids.next_id(), "note-1");
/// assert_eq!(ids.next_id(), "note-2");
/// ```
#[derive(Debug, Clone)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: u64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&mut self) -> String {
        let id = format!("{}-{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

/// Arrangement role of a melodic note. Only a generation/UI tag; not stored in
/// MIDI files and regenerated heuristically on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartRole {
    Melody,
    Chords,
    Bass,
}

/// A single melodic note with beat-based timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    /// Unique identifier for this note instance.
    pub id: String,

    /// MIDI note number. 60 = Middle C (C4).
    pub pitch: u8,

    /// Note velocity (0-127).
    pub velocity: u8,

    /// Onset in beats from the start of the piece.
    pub start_time: f64,

    /// Length in beats.
    pub duration: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_role: Option<PartRole>,
}

impl NoteEvent {
    /// Creates a note with a fresh id from `ids`.
    ///
    /// Values are stored as given; use [`NoteEvent::sanitize`] to clamp them.
    pub fn new(
        ids: &mut impl IdGenerator,
        pitch: u8,
        velocity: u8,
        start_time: f64,
        duration: f64,
    ) -> Self {
        Self {
            id: ids.next_id(),
            pitch,
            velocity,
            start_time,
            duration,
            part_role: None,
        }
    }

    /// Sets the part role, builder style.
    pub fn with_role(mut self, role: PartRole) -> Self {
        self.part_role = Some(role);
        self
    }

    /// Returns the end position in beats (start + duration).
    pub fn end_time(&self) -> f64 {
        clamp_beats(self.start_time) + clamp_beats(self.duration)
    }

    /// Returns the pitch class (0 = C, 11 = B).
    pub fn pitch_class(&self) -> u8 {
        self.pitch % 12
    }

    /// Clamps every field into the range the encoder and editors expect:
    /// pitch into the piano range, velocity into 0-127, start to a finite
    /// non-negative beat, and duration to at least a sixteenth of a beat.
    pub fn sanitize(&mut self) {
        self.pitch = self.pitch.clamp(MIN_PIANO_PITCH, MAX_PIANO_PITCH);
        self.velocity = self.velocity.min(127);
        self.start_time = clamp_beats(self.start_time);
        if !self.duration.is_finite() || self.duration < MIN_NOTE_DURATION_BEATS {
            self.duration = MIN_NOTE_DURATION_BEATS;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_creation() {
        let mut ids = SequentialIdGenerator::new("n");
        let note = NoteEvent::new(&mut ids, 60, 100, 0.0, 1.0);
        assert_eq!(note.id, "n-1");
        assert_eq!(note.pitch, 60);
        assert_eq!(note.velocity, 100);
        assert_eq!(note.end_time(), 1.0);
        assert_eq!(note.part_role, None);
    }

    #[test]
    fn test_uuid_ids_are_unique() {
        let mut ids = UuidIdGenerator;
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn test_sanitize() {
        let mut ids = SequentialIdGenerator::new("n");
        let mut note = NoteEvent::new(&mut ids, 5, 200, -3.0, 0.0);
        note.sanitize();
        assert_eq!(note.pitch, 21);
        assert_eq!(note.velocity, 127);
        assert_eq!(note.start_time, 0.0);
        assert_eq!(note.duration, 1.0 / 16.0);

        let mut note = NoteEvent::new(&mut ids, 120, 64, f64::NAN, f64::INFINITY);
        note.sanitize();
        assert_eq!(note.pitch, 108);
        assert_eq!(note.start_time, 0.0);
        assert_eq!(note.duration, 1.0 / 16.0);
    }

    #[test]
    fn test_json_field_names() {
        let mut ids = SequentialIdGenerator::new("n");
        let note = NoteEvent::new(&mut ids, 64, 90, 2.5, 0.5).with_role(PartRole::Bass);
        let json = serde_json::to_string(&note).unwrap();
        assert!(json.contains("\"startTime\":2.5"));
        assert!(json.contains("\"partRole\":\"bass\""));

        let parsed: NoteEvent = serde_json::from_str(
            r#"{"id":"x","pitch":60,"velocity":80,"startTime":0,"duration":1}"#,
        )
        .unwrap();
        assert_eq!(parsed.part_role, None);
        assert_eq!(parsed.duration, 1.0);
    }
}
