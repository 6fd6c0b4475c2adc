//! Standard MIDI File (SMF) export.
//!
//! Writes SMF Format 0: one header chunk and one track chunk holding a tempo
//! event, the note on/off stream, and an end-of-track marker.
//!
//! # Limitations (Information Degradation)
//!
//! - Note ids and part roles are not stored
//! - The title is only used for the suggested file name
//! - Start and duration are quantized to whole ticks
//! - Events past tick 2^28 - 1 are pulled back to it
//!
//! The encoder trusts its input. Pitch and velocity outside 0-127 are masked to
//! 7 bits; callers are expected to run `sanitize` or `validate` first.

use super::composition::{Composition, DrumPattern, Piece};
use super::drum::{DrumHit, DRUM_HIT_LENGTH_BEATS};
use super::note::NoteEvent;
use super::timing::{beats_to_ticks_with, bpm_to_micros_per_beat};
use super::vlq::write_vlq;
use super::{DRUM_CHANNEL, MELODIC_CHANNEL, TICKS_PER_BEAT};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// MIME type for downloads of encoded files.
pub const MIDI_MIME_TYPE: &str = "audio/midi";

/// MIDI event types written to the track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MidiEvent {
    /// Note on: channel, pitch, velocity
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    /// Note off: channel, pitch (release velocity is always 0)
    NoteOff { channel: u8, pitch: u8 },
    /// Set tempo: microseconds per quarter note
    SetTempo { microseconds_per_beat: u32 },
    /// End of track (meta event)
    EndOfTrack,
}

/// Represents a timed MIDI event for sorting and writing.
struct TimedEvent {
    /// Absolute tick position
    tick: u32,
    /// The MIDI event
    event: MidiEvent,
    /// Order among events at the same tick (lower = first).
    /// Releases go before onsets so a note ending exactly where the next one
    /// on the same key starts never cuts it off.
    priority: u8,
}

/// Largest tick a track event is placed at. Keeps every delta time within
/// the four VLQ bytes SMF allows.
const MAX_EVENT_TICK: u32 = 0x0FFF_FFFF;

const PRIORITY_META: u8 = 0;
const PRIORITY_NOTE_OFF: u8 = 1;
const PRIORITY_NOTE_ON: u8 = 2;

impl TimedEvent {
    fn new(tick: u32, event: MidiEvent, priority: u8) -> Self {
        Self {
            tick,
            event,
            priority,
        }
    }
}

/// Writes a single MIDI event to the buffer (without delta time).
fn write_event(event: &MidiEvent, buffer: &mut Vec<u8>) {
    match event {
        MidiEvent::NoteOn {
            channel,
            pitch,
            velocity,
        } => {
            buffer.push(0x90 | (channel & 0x0F));
            buffer.push(pitch & 0x7F);
            buffer.push(velocity & 0x7F);
        }
        MidiEvent::NoteOff { channel, pitch } => {
            buffer.push(0x80 | (channel & 0x0F));
            buffer.push(pitch & 0x7F);
            buffer.push(0);
        }
        MidiEvent::SetTempo {
            microseconds_per_beat,
        } => {
            // Meta event: FF 51 03 tt tt tt
            buffer.push(0xFF);
            buffer.push(0x51);
            buffer.push(0x03);
            buffer.push((microseconds_per_beat >> 16) as u8);
            buffer.push((microseconds_per_beat >> 8) as u8);
            buffer.push(*microseconds_per_beat as u8);
        }
        MidiEvent::EndOfTrack => {
            // Meta event: FF 2F 00
            buffer.push(0xFF);
            buffer.push(0x2F);
            buffer.push(0x00);
        }
    }
}

/// One note's worth of input for the track builder.
struct Gate {
    channel: u8,
    pitch: u8,
    velocity: u8,
    start_beats: f64,
    length_beats: f64,
}

/// Builds the track payload: tempo at tick 0, sorted note events, then
/// end-of-track with delta 0.
fn build_track_data(gates: impl Iterator<Item = Gate>, bpm: f64, ticks_per_beat: u32) -> Vec<u8> {
    let mut events = vec![TimedEvent::new(
        0,
        MidiEvent::SetTempo {
            microseconds_per_beat: bpm_to_micros_per_beat(bpm),
        },
        PRIORITY_META,
    )];

    for gate in gates {
        let on_tick = beats_to_ticks_with(gate.start_beats, ticks_per_beat).min(MAX_EVENT_TICK - 1);
        let off_tick = beats_to_ticks_with(gate.start_beats + gate.length_beats, ticks_per_beat)
            .min(MAX_EVENT_TICK)
            // A note shorter than half a tick still needs its off after its on.
            .max(on_tick + 1);

        events.push(TimedEvent::new(
            on_tick,
            MidiEvent::NoteOn {
                channel: gate.channel,
                pitch: gate.pitch,
                velocity: gate.velocity,
            },
            PRIORITY_NOTE_ON,
        ));
        events.push(TimedEvent::new(
            off_tick,
            MidiEvent::NoteOff {
                channel: gate.channel,
                pitch: gate.pitch,
            },
            PRIORITY_NOTE_OFF,
        ));
    }

    // Stable: equal (tick, priority) keep input order.
    events.sort_by(|a, b| a.tick.cmp(&b.tick).then(a.priority.cmp(&b.priority)));

    let mut buffer = Vec::with_capacity(events.len() * 4 + 4);
    let mut last_tick = 0u32;
    for timed_event in &events {
        write_vlq(timed_event.tick - last_tick, &mut buffer);
        write_event(&timed_event.event, &mut buffer);
        last_tick = timed_event.tick;
    }
    write_vlq(0, &mut buffer);
    write_event(&MidiEvent::EndOfTrack, &mut buffer);

    buffer
}

/// Wraps a track payload in header and track chunks.
fn build_smf(track_data: &[u8], ticks_per_beat: u16) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(22 + track_data.len());

    // MThd: length 6, format 0, one track, division
    bytes.extend_from_slice(b"MThd");
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&ticks_per_beat.to_be_bytes());

    // MTrk: big-endian payload length, then payload
    bytes.extend_from_slice(b"MTrk");
    bytes.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
    bytes.extend_from_slice(track_data);

    bytes
}

/// Clears the SMPTE flag bit and zero so the division is always metrical.
fn metrical_division(ticks_per_beat: u16) -> u16 {
    (ticks_per_beat & 0x7FFF).max(1)
}

/// Encodes melodic notes as a complete SMF Type 0 file at 480 ticks per beat.
///
/// Notes are written on channel 0 in any input order. An empty slice yields a
/// file holding only the tempo and end-of-track events.
///
/// # Examples
///
/// ```
/// use promptmidi::midi::{encode_notes, NoteEvent, SequentialIdGenerator};
///
/// let mut ids = SequentialIdGenerator::new("n");
/// let bytes = encode_notes(&[NoteEvent::new(&mut ids, 60, 100, 0.0, 1.0)], 120.0);
/// assert_eq!(&bytes[..4], b"MThd");
/// ```
pub fn encode_notes(notes: &[NoteEvent], bpm: f64) -> Vec<u8> {
    encode_notes_with_resolution(notes, bpm, TICKS_PER_BEAT as u16)
}

/// Encodes melodic notes with a custom time division.
pub fn encode_notes_with_resolution(notes: &[NoteEvent], bpm: f64, ticks_per_beat: u16) -> Vec<u8> {
    let division = metrical_division(ticks_per_beat);
    let gates = notes.iter().map(|note| Gate {
        channel: MELODIC_CHANNEL,
        pitch: note.pitch,
        velocity: note.velocity,
        start_beats: note.start_time,
        length_beats: note.duration,
    });
    build_smf(&build_track_data(gates, bpm, division as u32), division)
}

/// Encodes drum hits on the GM percussion channel at 480 ticks per beat.
///
/// Every hit gets a fixed sixteenth-note gate.
pub fn encode_drum_hits(hits: &[DrumHit], bpm: f64) -> Vec<u8> {
    encode_drum_hits_with_resolution(hits, bpm, TICKS_PER_BEAT as u16)
}

/// Encodes drum hits with a custom time division.
pub fn encode_drum_hits_with_resolution(hits: &[DrumHit], bpm: f64, ticks_per_beat: u16) -> Vec<u8> {
    let division = metrical_division(ticks_per_beat);
    let gates = hits.iter().map(|hit| Gate {
        channel: DRUM_CHANNEL,
        pitch: hit.gm_note(),
        velocity: hit.velocity,
        start_beats: hit.time,
        length_beats: DRUM_HIT_LENGTH_BEATS,
    });
    build_smf(&build_track_data(gates, bpm, division as u32), division)
}

/// An encoded file ready to hand to a download or write to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiFile {
    /// Suggested file name, ending in `.mid`.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl MidiFile {
    pub fn mime_type(&self) -> &'static str {
        MIDI_MIME_TYPE
    }

    /// Writes the encoded bytes to disk.
    ///
    /// # Errors
    ///
    /// Returns error if file creation or writing fails
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&self.bytes)?;
        writer.flush()?;
        Ok(())
    }
}

impl Composition {
    /// Encodes the composition as a downloadable file.
    pub fn to_midi(&self) -> MidiFile {
        MidiFile {
            file_name: self.file_name(),
            bytes: encode_notes(&self.notes, self.bpm),
        }
    }
}

impl DrumPattern {
    /// Encodes the pattern as a downloadable file.
    pub fn to_midi(&self) -> MidiFile {
        MidiFile {
            file_name: self.file_name(),
            bytes: encode_drum_hits(&self.hits, self.bpm),
        }
    }
}

impl Piece {
    /// Encodes either kind of piece.
    pub fn to_midi(&self) -> MidiFile {
        match self {
            Piece::Melodic(composition) => composition.to_midi(),
            Piece::Drums(pattern) => pattern.to_midi(),
        }
    }
}

/// Exports a piece to a Standard MIDI File on disk.
///
/// # Errors
///
/// Returns error if file creation or writing fails
pub fn export_to_midi<P: AsRef<Path>>(piece: &Piece, path: P) -> std::io::Result<()> {
    piece.to_midi().save(path)
}
