use super::fingerprint::ContentFingerprint;
use super::outcome::PartialFailure;
use std::collections::HashMap;
use std::path::PathBuf;

/// What a first render produced, replayed on every later hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoEntry {
    pub path: PathBuf,
    pub partial_failures: Vec<PartialFailure>,
}

/// Fingerprint to artifact. In-memory only; entries go away on `clear`.
#[derive(Debug, Default)]
pub struct MemoStore {
    entries: HashMap<ContentFingerprint, MemoEntry>,
}

impl MemoStore {
    pub fn lookup(&self, fingerprint: &ContentFingerprint) -> Option<&MemoEntry> {
        self.entries.get(fingerprint)
    }

    /// Last write wins when two renders of the same fingerprint race.
    pub fn record(&mut self, fingerprint: ContentFingerprint, entry: MemoEntry) {
        self.entries.insert(fingerprint, entry);
    }

    /// Returns the number of entries dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
