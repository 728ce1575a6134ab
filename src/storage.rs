//! Where the storefront session slots live between runs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Slot names
pub mod keys {
    pub const TOKEN: &str = concat!("pzstore:", "token");
    pub const LANGUAGE: &str = concat!("pzstore:", "language");
}

const SESSION_FILE: &str = "session.json";

/// Named string slots, the CLI's counterpart of browser local storage.
pub trait StorageAdapter: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);

    /// Clearing an absent slot is a no-op.
    fn remove(&self, key: &str);
}

/// Lock-guarded slot map shared by both adapters.
#[derive(Debug, Default)]
struct Slots(RwLock<HashMap<String, String>>);

impl Slots {
    fn read(&self, key: &str) -> Option<String> {
        self.0.read().ok().and_then(|slots| slots.get(key).cloned())
    }

    /// Apply `change` and report whether the map is now different.
    fn change(&self, change: impl FnOnce(&mut HashMap<String, String>) -> bool) -> bool {
        match self.0.write() {
            Ok(mut slots) => change(&mut slots),
            Err(_) => false,
        }
    }

    fn snapshot(&self) -> HashMap<String, String> {
        self.0.read().map(|slots| slots.clone()).unwrap_or_default()
    }
}

/// Slots kept in memory only; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Slots,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageAdapter for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.read(key)
    }

    fn set(&self, key: &str, value: &str) {
        self.slots.change(|slots| {
            slots.insert(key.to_string(), value.to_string());
            true
        });
    }

    fn remove(&self, key: &str) {
        self.slots.change(|slots| slots.remove(key).is_some());
    }
}

/// Slots persisted to `session.json`.
///
/// The whole map is one JSON object; the file is rewritten after every change
/// and read once, when the adapter is opened.
pub struct FileStorage {
    path: PathBuf,
    slots: Slots,
}

impl FileStorage {
    /// Session file in the platform data directory
    ///
    /// - Linux: `~/.local/share/pzstore/session.json`
    /// - macOS: `~/Library/Application Support/br.com.pzdev.pzstore/session.json`
    /// - Windows: `C:\Users\{User}\AppData\Roaming\pzdev\pzstore\data\session.json`
    pub fn new() -> Option<Self> {
        let dirs = directories::ProjectDirs::from("br.com", "pzdev", "pzstore")?;
        Self::in_dir(dirs.data_dir())
    }

    /// `session.json` inside `dir`, which is created when missing
    pub fn in_dir(dir: &Path) -> Option<Self> {
        std::fs::create_dir_all(dir).ok()?;
        Some(Self::at(dir.join(SESSION_FILE)))
    }

    /// An explicit file. Missing or corrupt contents start an empty session.
    pub fn at(path: PathBuf) -> Self {
        let loaded: HashMap<String, String> = std::fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default();

        Self {
            path,
            slots: Slots(RwLock::new(loaded)),
        }
    }

    fn persist(&self) {
        let written = serde_json::to_string_pretty(&self.slots.snapshot())
            .map_err(std::io::Error::other)
            .and_then(|contents| std::fs::write(&self.path, contents));
        if let Err(e) = written {
            tracing::warn!(path = %self.path.display(), "Failed to write session file: {}", e);
        }
    }
}

impl StorageAdapter for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.read(key)
    }

    fn set(&self, key: &str, value: &str) {
        let changed = self
            .slots
            .change(|slots| slots.insert(key.to_string(), value.to_string()).as_deref() != Some(value));
        if changed {
            self.persist();
        }
    }

    fn remove(&self, key: &str) {
        if self.slots.change(|slots| slots.remove(key).is_some()) {
            self.persist();
        }
    }
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage").field("session_file", &self.path).finish()
    }
}
