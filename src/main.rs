//! promptmidi - command-line front end for the MIDI codec.
//!
//! Converts compositions and drum patterns between their JSON form and
//! Standard MIDI Files, reports the key of a melody, and prints the
//! transport schedule a live player would consume.
//!
//! # Usage
//!
//! ```bash
//! promptmidi export song.json -o song.mid
//! promptmidi import song.mid --notes
//! promptmidi key song.json --snap
//! promptmidi schedule beat.json --bars 2
//! ```
//!
//! Set `RUST_LOG=debug` to see decode decisions on stderr.

use promptmidi::midi::{
    decode_drum_hits, decode_midi, decode_notes, schedule_drum_hits,
    schedule_notes, Piece, UuidIdGenerator,
};
use promptmidi::theory::{detect_key, snap_notes_to_key};

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// How `import` should interpret a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImportMode {
    Auto,
    Notes,
    Drums,
}

/// The subcommand to run.
#[derive(Debug)]
enum Command {
    Export {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    Import {
        input: PathBuf,
        mode: ImportMode,
    },
    Key {
        input: PathBuf,
        snap: bool,
    },
    Schedule {
        input: PathBuf,
        bars: Option<u32>,
    },
}

/// Command-line options for the application.
struct CliOptions {
    command: Command,
}

fn print_help(program: &str) {
    eprintln!("promptmidi - MIDI import/export for prompt-driven sketches");
    eprintln!();
    eprintln!("Usage: {} <COMMAND> [OPTIONS]", program);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  export <piece.json> [-o out.mid]     Encode a composition or drum pattern");
    eprintln!("  import <file.mid> [--drums|--notes]  Decode a MIDI file and print JSON");
    eprintln!("  key <composition.json> [--snap]      Detect the key; --snap prints the");
    eprintln!("                                       composition snapped into it");
    eprintln!("  schedule <piece.json> [--bars N]     Print the playback schedule");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -h, --help  Print this help message");
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// The first argument names the command, the second its input file.
    /// Remaining flags depend on the command.
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let program = args.first().map(String::as_str).unwrap_or("promptmidi");

        if args.len() < 2 || args.iter().skip(1).any(|a| a == "--help" || a == "-h") {
            print_help(program);
            std::process::exit(if args.len() < 2 { 1 } else { 0 });
        }

        let name = args[1].as_str();
        let input = match args.get(2) {
            Some(path) if !path.starts_with('-') => PathBuf::from(path),
            _ => bail!("{} requires an input file", name),
        };

        let mut output: Option<PathBuf> = None;
        let mut mode = ImportMode::Auto;
        let mut snap = false;
        let mut bars: Option<u32> = None;
        let mut i = 3;

        while i < args.len() {
            match (name, args[i].as_str()) {
                ("export", "-o" | "--output") => {
                    i += 1;
                    let path = args.get(i).context("--output requires a path argument")?;
                    output = Some(PathBuf::from(path));
                }
                ("import", "--drums") => mode = ImportMode::Drums,
                ("import", "--notes") => mode = ImportMode::Notes,
                ("key", "--snap") => snap = true,
                ("schedule", "--bars") => {
                    i += 1;
                    let value = args.get(i).context("--bars requires a number")?;
                    bars = Some(
                        value
                            .parse()
                            .with_context(|| format!("Invalid bar count: {}", value))?,
                    );
                }
                (_, other) => bail!("Unknown option for {}: {}", name, other),
            }
            i += 1;
        }

        let command = match name {
            "export" => Command::Export { input, output },
            "import" => Command::Import { input, mode },
            "key" => Command::Key { input, snap },
            "schedule" => Command::Schedule { input, bars },
            other => bail!("Unknown command: {} (use --help for usage)", other),
        };

        Ok(Self { command })
    }
}

fn load_piece(path: &Path) -> Result<Piece> {
    Piece::load_from_file(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn run_export(input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let mut piece = load_piece(&input)?;
    piece.sanitize();

    let file = piece.to_midi();
    let output = output.unwrap_or_else(|| PathBuf::from(&file.file_name));
    file.save(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!(
        "Exported {} event(s) to {} ({}, {} bytes)",
        piece.event_count(),
        output.display(),
        file.mime_type(),
        file.bytes.len()
    );
    println!("{}", output.display());
    Ok(())
}

fn run_import(input: PathBuf, mode: ImportMode) -> Result<()> {
    let bytes =
        std::fs::read(&input).with_context(|| format!("Failed to read {}", input.display()))?;
    let file_name = input
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let mut ids = UuidIdGenerator;
    let piece = match mode {
        ImportMode::Auto => decode_midi(&bytes, file_name, &mut ids),
        ImportMode::Notes => decode_notes(&bytes, file_name, &mut ids).map(Piece::Melodic),
        ImportMode::Drums => decode_drum_hits(&bytes, file_name, &mut ids).map(Piece::Drums),
    }
    .with_context(|| format!("Failed to decode {}", input.display()))?;

    println!("{}", piece.to_json().context("Failed to serialize piece")?);
    Ok(())
}

fn run_key(input: PathBuf, snap: bool) -> Result<()> {
    let mut composition = match load_piece(&input)? {
        Piece::Melodic(composition) => composition,
        Piece::Drums(_) => bail!("{} is a drum pattern; key detection needs notes", input.display()),
    };

    let key = detect_key(&composition.notes);
    if !snap {
        println!("{}", key);
        return Ok(());
    }

    let moved = snap_notes_to_key(&mut composition.notes, &key);
    tracing::info!("Snapped {} note(s) into {}", moved, key);
    println!(
        "{}",
        composition.to_json().context("Failed to serialize composition")?
    );
    Ok(())
}

fn run_schedule(input: PathBuf, bars: Option<u32>) -> Result<()> {
    let json = match load_piece(&input)? {
        Piece::Melodic(c) => serde_json::to_string_pretty(&schedule_notes(&c.notes, c.bpm, bars)),
        Piece::Drums(p) => {
            serde_json::to_string_pretty(&schedule_drum_hits(&p.hits, p.bpm, bars))
        }
    }
    .context("Failed to serialize schedule")?;

    println!("{}", json);
    Ok(())
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Export { input, output } => run_export(input, output),
        Command::Import { input, mode } => run_import(input, mode),
        Command::Key { input, snap } => run_key(input, snap),
        Command::Schedule { input, bars } => run_schedule(input, bars),
    }
}
