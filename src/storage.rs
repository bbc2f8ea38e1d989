//! Versioned JSON persistence for macros
//!
//! A macro file is a single object: a `version` tag plus an ordered array
//! of event objects tagged by variant. Loading is forward-compatible:
//! event variants this build does not know are skipped with a warning
//! instead of failing the whole load.

use crate::error::{Error, Result};
use crate::events::{Event, Macro, FORMAT_VERSION};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const KNOWN_VARIANTS: [&str; 3] = ["move", "button", "key"];

#[derive(Serialize)]
struct FileDocRef<'a> {
    version: u32,
    events: &'a [Event],
}

#[derive(Deserialize)]
struct FileDoc {
    version: u32,
    events: Vec<serde_json::Value>,
}

/// Serialize a frozen macro to `path`.
pub fn save(recording: &Macro, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    let doc = FileDocRef {
        version: recording.version,
        events: &recording.events,
    };
    serde_json::to_writer(&mut writer, &doc).map_err(|e| Error::io_failure(e.to_string()))?;
    writer.flush()?;
    debug!(events = recording.len(), path = %path.as_ref().display(), "macro saved");
    Ok(())
}

/// Deserialize a frozen macro from `path`.
///
/// Unknown event variants are skipped with a warning; anything else that
/// does not match the schema is `InvalidFormat`.
pub fn load(path: impl AsRef<Path>) -> Result<Macro> {
    let file = File::open(path.as_ref())?;
    let doc: FileDoc = serde_json::from_reader(BufReader::new(file))?;
    if doc.version > FORMAT_VERSION {
        debug!(version = doc.version, "macro written by a newer schema, loading best-effort");
    }

    let mut events = Vec::with_capacity(doc.events.len());
    let mut skipped = 0usize;
    for value in doc.events {
        let tag = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| Error::invalid_format("event missing its variant tag"))?;
        if !KNOWN_VARIANTS.contains(&tag) {
            warn!(variant = tag, "skipping unrecognized event variant");
            skipped += 1;
            continue;
        }
        events.push(serde_json::from_value::<Event>(value)?);
    }
    if skipped > 0 {
        warn!(skipped, "events dropped during load");
    }

    let recording = Macro {
        version: doc.version,
        events,
    };
    if !recording.is_monotonic() {
        return Err(Error::invalid_format("event offsets decrease"));
    }
    debug!(events = recording.len(), "macro loaded");
    Ok(recording)
}

/// Directory-backed macro library used by the CLI.
pub struct MacroStore {
    dir: PathBuf,
}

impl MacroStore {
    /// Store under `$HOME/.macro-recorder`.
    pub fn open_default() -> Result<Self> {
        let home =
            std::env::var("HOME").map_err(|_| Error::io_failure("HOME not set"))?;
        Self::open(PathBuf::from(home).join(".macro-recorder"))
    }

    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Save under a sanitized, timestamped filename; returns the full path.
    pub fn save(&self, name: &str, recording: &Macro) -> Result<PathBuf> {
        let ts = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let filename = format!("{}_{}.json", sanitize(name), ts);
        let path = self.dir.join(filename);
        save(recording, &path)?;
        Ok(path)
    }

    pub fn load(&self, filename: &str) -> Result<Macro> {
        load(self.dir.join(filename))
    }

    pub fn list(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            if let Some(s) = name.to_str() {
                if s.ends_with(".json") {
                    files.push(s.to_string());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn delete(&self, filename: &str) -> Result<()> {
        fs::remove_file(self.dir.join(filename))?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
