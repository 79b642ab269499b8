use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::settings::Settings;

const SNAPSHOT_VERSION: u32 = 1;

/// Failure to read the persisted snapshot document. Callers fall back to
/// safe defaults on any of these; none is ever fatal.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("snapshot file unreadable: {0}")]
    Io(#[source] io::Error),

    #[error("malformed snapshot document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    settings: Settings,
}

/// Durable mirror of the last successfully fetched settings snapshot, so a
/// restart keeps the last-known-good policy until the service is reachable
/// again.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `Ok(None)` when no snapshot has ever been written; `ParseError` when
    /// one exists but cannot be used.
    pub fn load(&self) -> Result<Option<Settings>, ParseError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(ParseError::Io(error)),
        };
        let snapshot: SnapshotFile = serde_json::from_str(&contents)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ParseError::UnsupportedVersion(snapshot.version));
        }
        Ok(Some(snapshot.settings))
    }

    /// Writes a sibling temp file and renames it into place, so a crash
    /// mid-write leaves the previous snapshot intact.
    pub fn save(&self, settings: &Settings) -> io::Result<()> {
        let snapshot = SnapshotFile {
            version: SNAPSHOT_VERSION,
            settings: settings.clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
