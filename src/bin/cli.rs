//! Macro Recorder CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use crossbeam_channel::bounded;
use macro_recorder::prelude::*;
use macro_recorder::storage;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mrec")]
#[command(about = "Record and replay mouse/keyboard macros with original timing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start recording (Ctrl+C to stop)
    Record {
        /// Macro name
        #[arg(short, long, default_value = "macro")]
        name: String,

        /// Write to an explicit path instead of the store
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip pointer motion, record only clicks and keys
        #[arg(long)]
        no_moves: bool,
    },

    /// Replay a macro file
    Play {
        /// Macro file
        file: PathBuf,

        /// Playback speed (1.0 = realtime, 2.0 = 2x)
        #[arg(short, long, default_value = "1.0")]
        speed: f64,
    },

    /// Show macro info
    Show {
        /// Macro file
        file: PathBuf,

        /// Print every event
        #[arg(long)]
        all: bool,
    },

    /// List macros in the store
    List,

    /// Delete a macro from the store
    Delete {
        /// Macro filename (as printed by list)
        file: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Record {
            name,
            output,
            no_moves,
        } => record(&name, output, no_moves),
        Commands::Play { file, speed } => play(&file, speed),
        Commands::Show { file, all } => show(&file, all),
        Commands::List => list(),
        Commands::Delete { file } => delete(&file),
    }
}

fn new_session(no_moves: bool) -> Session {
    let config = RecorderConfig {
        record_pointer_moves: !no_moves,
    };
    Session::with_config(Arc::new(SystemBackend::new()), config)
}

fn record(name: &str, output: Option<PathBuf>, no_moves: bool) -> Result<()> {
    let session = new_session(no_moves);

    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    session.start_recording(move |_event| {
        let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
        print!("\r{n} events");
        let _ = io::stdout().flush();
    })?;
    println!("Recording: {} (Ctrl+C to stop)", name);

    let (stop_tx, stop_rx) = bounded(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })?;
    stop_rx.recv()?;

    let recorded = session.stop_recording()?.unwrap_or_default();
    println!("\n{} events recorded", recorded.len());

    let path = match output {
        Some(path) => {
            storage::save(&recorded, &path)?;
            path
        }
        None => MacroStore::open_default()?.save(name, &recorded)?,
    };
    println!("Saved: {}", path.display());
    Ok(())
}

fn play(file: &PathBuf, speed: f64) -> Result<()> {
    let session = new_session(false);
    let loaded = session.load(file)?;
    session.set_speed(speed);

    println!(
        "Replaying {} events (~{} ms) at {}x speed...",
        loaded.len(),
        loaded.duration_ms(),
        speed
    );
    println!("Starting in 2 seconds...");
    std::thread::sleep(std::time::Duration::from_secs(2));

    let total = loaded.len();
    let (done_tx, done_rx) = bounded(1);
    session.start_playing(
        move |index| {
            print!("\r{}/{}", index + 1, total);
            let _ = io::stdout().flush();
        },
        move |outcome| {
            let _ = done_tx.send(outcome);
        },
    )?;

    let canceller = session.clone();
    ctrlc::set_handler(move || {
        let _ = canceller.stop_playing();
    })?;

    let outcome = done_rx.recv()?;
    if outcome.completed {
        println!("\nDone");
    } else if let Some(e) = outcome.error {
        println!("\nFailed after event {:?}: {e}", outcome.last_index);
    } else {
        println!("\nCancelled after event {:?}", outcome.last_index);
    }
    Ok(())
}

fn show(file: &PathBuf, all: bool) -> Result<()> {
    let loaded = storage::load(file)?;

    let mut moves = 0;
    let mut buttons = 0;
    let mut keys = 0;
    for event in &loaded.events {
        match event.kind {
            EventKind::Move { .. } => moves += 1,
            EventKind::Button { .. } => buttons += 1,
            EventKind::Key { .. } => keys += 1,
        }
    }

    println!("Events: {}", loaded.len());
    println!("Duration: {} ms", loaded.duration_ms());
    println!("\nSummary:");
    println!("  Moves: {moves}");
    println!("  Buttons: {buttons}");
    println!("  Keys: {keys}");

    if all {
        println!("\nEvents:");
        for (i, event) in loaded.events.iter().enumerate() {
            println!("{i}: {event:?}");
        }
    }
    Ok(())
}

fn list() -> Result<()> {
    let store = MacroStore::open_default()?;
    let files = store.list()?;
    if files.is_empty() {
        println!("No macros saved.");
    } else {
        for f in files {
            println!("{f}");
        }
    }
    Ok(())
}

fn delete(file: &str) -> Result<()> {
    let store = MacroStore::open_default()?;
    store.delete(file)?;
    println!("Deleted: {file}");
    Ok(())
}
