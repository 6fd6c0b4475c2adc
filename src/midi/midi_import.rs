//! Standard MIDI File (SMF) import.
//!
//! Parses .mid bytes into melodic notes or drum hits. Format 0 and Format 1
//! files are accepted; all tracks are merged into one onset-sorted list.
//!
//! # Limitations
//!
//! - Only note on/off events become notes
//! - Only the first Set Tempo event in the file is used; later tempo changes
//!   are ignored (a composition carries a single scalar tempo)
//! - Program changes, controllers, pitch bend, and SysEx are skipped
//! - SMPTE time division and Format 2 files are rejected
//! - A track that fails to parse rejects the whole file

use super::composition::{Composition, DrumPattern, Piece};
use super::drum::{drum_piece_for_gm_note, DrumHit, GM_PERCUSSION_RANGE};
use super::error::MidiError;
use super::note::{IdGenerator, NoteEvent, PartRole, UuidIdGenerator};
use super::timing::{micros_per_beat_to_bpm, ticks_to_beats};
use super::{
    DEFAULT_TEMPO, DRUM_CHANNEL, MAX_BPM, MAX_PIANO_PITCH, MIN_BPM, MIN_NOTE_DURATION_BEATS,
    MIN_PIANO_PITCH,
};
use midly::{EventIter, Format, MetaMessage, MidiMessage, Timing, TrackEventKind};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;

/// Pitches below this are tagged as bass on import.
const BASS_PITCH_CEILING: u8 = 48;

/// Title used when the file name yields nothing usable.
const FALLBACK_TITLE: &str = "Imported MIDI";

/// A Note-On paired with its Note-Off, still in file ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawNote {
    channel: u8,
    key: u8,
    velocity: u8,
    start_tick: u64,
    end_tick: u64,
    /// Position of the Note-On in file order, for stable tie-breaking.
    order: usize,
}

/// Everything the decoder needs from the file, before mapping to the data model.
#[derive(Debug)]
struct ParsedSmf {
    ticks_per_beat: u32,
    micros_per_beat: Option<u32>,
    notes: Vec<RawNote>,
    /// Note-Ons seen so far across all tracks.
    onsets_seen: usize,
}

impl ParsedSmf {
    fn bpm(&self) -> f64 {
        match self.micros_per_beat {
            Some(micros) => micros_per_beat_to_bpm(micros).clamp(MIN_BPM, MAX_BPM),
            None => DEFAULT_TEMPO as f64,
        }
    }

    fn beats(&self, ticks: u64) -> f64 {
        ticks_to_beats(ticks, self.ticks_per_beat)
    }
}

/// Notes still waiting for their release.
/// Key is (channel, pitch), value is a FIFO of (start_tick, velocity, order).
type ActiveNotes = HashMap<(u8, u8), VecDeque<(u64, u8, usize)>>;

/// Parses the header and every track chunk.
///
/// midly is built with its `strict` feature, so truncated chunks, cut-off
/// delta times, and stray data bytes surface as errors instead of silently
/// shortening a track.
fn parse_smf(data: &[u8]) -> Result<ParsedSmf, MidiError> {
    let (header, tracks) = midly::parse(data).map_err(|e| MidiError::malformed(e.to_string()))?;

    if header.format == Format::Sequential {
        return Err(MidiError::UnsupportedFormat(
            "Format 2 (sequential) MIDI files not supported".to_string(),
        ));
    }

    let ticks_per_beat = match header.timing {
        Timing::Metrical(tpb) if tpb.as_int() > 0 => tpb.as_int() as u32,
        Timing::Metrical(_) => {
            return Err(MidiError::malformed("time division of zero ticks per beat"))
        }
        Timing::Timecode(_, _) => {
            return Err(MidiError::UnsupportedFormat(
                "SMPTE timecode timing not supported".to_string(),
            ))
        }
    };

    let mut parsed = ParsedSmf {
        ticks_per_beat,
        micros_per_beat: None,
        notes: Vec::new(),
        onsets_seen: 0,
    };

    // The track iterator's size hint is the count declared in the header.
    let declared_tracks = tracks.size_hint().0;
    let mut tracks_read = 0usize;
    for (track_idx, track) in tracks.enumerate() {
        let events = track
            .map_err(|e| MidiError::malformed(format!("track {}: {}", track_idx, e)))?;
        parse_track(events, track_idx, &mut parsed)?;
        tracks_read += 1;
    }
    if tracks_read < declared_tracks {
        return Err(MidiError::malformed(format!(
            "header declares {} tracks but only {} were found",
            declared_tracks, tracks_read
        )));
    }

    // Tracks are walked one after another; restore global onset order.
    parsed.notes.sort_by_key(|n| (n.start_tick, n.order));
    Ok(parsed)
}

/// Walks one track's events, pairing note on/off events.
fn parse_track(
    mut events: EventIter<'_>,
    track_idx: usize,
    parsed: &mut ParsedSmf,
) -> Result<(), MidiError> {
    let mut active_notes: ActiveNotes = HashMap::new();
    let mut current_tick: u64 = 0;

    loop {
        let running_status = events.running_status();
        let event = match events.next() {
            Some(event) => {
                event.map_err(|e| MidiError::malformed(format!("track {}: {}", track_idx, e)))?
            }
            None => break,
        };
        current_tick += event.delta.as_int() as u64;

        match event.kind {
            TrackEventKind::Meta(meta) => {
                // Many writers keep running status across meta events.
                *events.running_status_mut() = running_status;
                match meta {
                    MetaMessage::Tempo(tempo) => {
                        let micros = tempo.as_int();
                        if parsed.micros_per_beat.is_none() && micros > 0 {
                            parsed.micros_per_beat = Some(micros);
                        } else {
                            tracing::debug!(
                                "Ignoring tempo event at tick {} in track {}",
                                current_tick,
                                track_idx
                            );
                        }
                    }
                    MetaMessage::EndOfTrack => break,
                    _ => {} // Ignore other meta events
                }
            }
            TrackEventKind::Midi { channel, message } => {
                let channel = channel.as_int();
                match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        active_notes
                            .entry((channel, key.as_int()))
                            .or_default()
                            .push_back((current_tick, vel.as_int(), parsed.onsets_seen));
                        parsed.onsets_seen += 1;
                    }
                    // Note off, or note on with velocity 0
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        let key = key.as_int();
                        let pending = active_notes
                            .get_mut(&(channel, key))
                            .and_then(VecDeque::pop_front);
                        if let Some((start_tick, velocity, order)) = pending {
                            parsed.notes.push(RawNote {
                                channel,
                                key,
                                velocity,
                                start_tick,
                                end_tick: current_tick,
                                order,
                            });
                        }
                    }
                    _ => {} // Ignore other MIDI messages
                }
            }
            _ => {} // Ignore SysEx and escapes
        }
    }

    let orphaned: usize = active_notes.values().map(VecDeque::len).sum();
    if orphaned > 0 {
        tracing::debug!(
            "Dropping {} note(s) without a release in track {}",
            orphaned,
            track_idx
        );
    }
    Ok(())
}

/// Derives a display title from an uploaded file name.
///
/// # Examples
///
/// ```
/// use promptmidi::midi::title_from_file_name;
///
/// assert_eq!(title_from_file_name("uploads/late_night_jam.mid"), "late night jam");
/// assert_eq!(title_from_file_name(".mid"), "Imported MIDI");
/// ```
pub fn title_from_file_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    // ".mid" alone has no extension, only a hidden-file stem.
    let stem = stem.strip_prefix('.').map_or(stem, |rest| {
        if rest.eq_ignore_ascii_case("mid") || rest.eq_ignore_ascii_case("midi") {
            ""
        } else {
            stem
        }
    });
    let title = stem.replace('_', " ").trim().to_string();
    if title.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        title
    }
}

fn melodic_from_parsed(
    parsed: &ParsedSmf,
    file_name: &str,
    ids: &mut impl IdGenerator,
) -> Result<Composition, MidiError> {
    let raw: Vec<&RawNote> = parsed
        .notes
        .iter()
        .filter(|n| n.channel != DRUM_CHANNEL)
        .collect();
    if raw.is_empty() {
        return Err(MidiError::EmptyResult);
    }

    let mut onsets: HashMap<u64, usize> = HashMap::new();
    for note in &raw {
        *onsets.entry(note.start_tick).or_default() += 1;
    }

    let notes = raw
        .iter()
        .map(|n| {
            let duration = parsed.beats(n.end_tick.saturating_sub(n.start_tick));
            let role = if n.key < BASS_PITCH_CEILING {
                PartRole::Bass
            } else if onsets.get(&n.start_tick).copied().unwrap_or(0) > 1 {
                PartRole::Chords
            } else {
                PartRole::Melody
            };
            NoteEvent {
                id: ids.next_id(),
                pitch: n.key.clamp(MIN_PIANO_PITCH, MAX_PIANO_PITCH),
                velocity: n.velocity.clamp(1, 127),
                start_time: parsed.beats(n.start_tick),
                duration: duration.max(MIN_NOTE_DURATION_BEATS),
                part_role: Some(role),
            }
        })
        .collect();

    Ok(Composition {
        title: title_from_file_name(file_name),
        bpm: parsed.bpm(),
        notes,
    })
}

fn drums_from_parsed(
    parsed: &ParsedSmf,
    file_name: &str,
    ids: &mut impl IdGenerator,
) -> Result<DrumPattern, MidiError> {
    let mut hits = Vec::new();
    let mut unmapped = 0usize;

    for n in &parsed.notes {
        if n.channel != DRUM_CHANNEL && !GM_PERCUSSION_RANGE.contains(&n.key) {
            continue;
        }
        match drum_piece_for_gm_note(n.key) {
            Some(piece) => hits.push(DrumHit {
                id: ids.next_id(),
                drum_piece: piece,
                time: parsed.beats(n.start_tick),
                velocity: n.velocity.clamp(1, 127),
            }),
            None => unmapped += 1,
        }
    }

    if unmapped > 0 {
        tracing::debug!("Discarded {} percussion note(s) with no drum mapping", unmapped);
    }
    if hits.is_empty() {
        return Err(MidiError::EmptyResult);
    }

    Ok(DrumPattern {
        title: title_from_file_name(file_name),
        bpm: parsed.bpm(),
        hits,
    })
}

/// Decodes a file as melodic notes.
///
/// Notes on the drum channel are skipped. Pitches are clamped to the piano
/// range, velocities to 1-127, and durations to at least a sixteenth of a
/// beat. Part roles are regenerated from pitch and simultaneity.
///
/// # Errors
///
/// `MalformedStream` or `UnsupportedFormat` if the bytes cannot be parsed,
/// `EmptyResult` if no melodic notes were found.
pub fn decode_notes(
    bytes: &[u8],
    file_name: &str,
    ids: &mut impl IdGenerator,
) -> Result<Composition, MidiError> {
    let parsed = parse_smf(bytes)?;
    melodic_from_parsed(&parsed, file_name, ids)
}

/// Decodes a file as drum hits.
///
/// Notes on channel 9, and notes on any channel inside the GM percussion
/// range, go through the GM drum mapping; unmappable notes are discarded.
///
/// # Errors
///
/// As [`decode_notes`], with `EmptyResult` when no hit could be mapped.
pub fn decode_drum_hits(
    bytes: &[u8],
    file_name: &str,
    ids: &mut impl IdGenerator,
) -> Result<DrumPattern, MidiError> {
    let parsed = parse_smf(bytes)?;
    drums_from_parsed(&parsed, file_name, ids)
}

/// Decodes a file, choosing drums when every note sits on the drum channel
/// and melodic notes otherwise.
pub fn decode_midi(
    bytes: &[u8],
    file_name: &str,
    ids: &mut impl IdGenerator,
) -> Result<Piece, MidiError> {
    let parsed = parse_smf(bytes)?;
    if parsed.notes.is_empty() {
        return Err(MidiError::EmptyResult);
    }

    let piece = if parsed.notes.iter().all(|n| n.channel == DRUM_CHANNEL) {
        Piece::Drums(drums_from_parsed(&parsed, file_name, ids)?)
    } else {
        Piece::Melodic(melodic_from_parsed(&parsed, file_name, ids)?)
    };

    tracing::info!(
        "Imported {:?}: {} event(s) at {:.2} BPM",
        piece.title(),
        piece.event_count(),
        piece.bpm()
    );
    Ok(piece)
}

/// Reads and decodes a MIDI file from disk, assigning UUID event ids.
///
/// # Errors
///
/// Returns error if the file cannot be read or decoded
pub fn import_from_midi<P: AsRef<Path>>(path: P) -> Result<Piece, MidiError> {
    let path = path.as_ref();
    let data = fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    decode_midi(&data, file_name, &mut UuidIdGenerator)
}
