use super::fingerprint::ContentFingerprint;
use serde::Serialize;
use std::path::PathBuf;

/// Something a build or sweep skipped without failing as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartialFailure {
    SlideSkipped {
        slide: usize,
        reason: String,
    },
    PlaceholderSkipped {
        slide: usize,
        placeholder: u32,
        reason: String,
    },
    DeleteFailed {
        path: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Generated {
    pub path: PathBuf,
    pub fingerprint: ContentFingerprint,
    /// True when the memo store already had this fingerprint and nothing was rendered.
    /// Cached results repeat the partial failures of the first render.
    pub cached: bool,
    pub partial_failures: Vec<PartialFailure>,
}

impl Generated {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "path": self.path.display().to_string(),
            "fingerprint": self.fingerprint,
            "cached": self.cached,
            "partial_failures": self.partial_failures,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub deleted: usize,
    pub skipped_in_flight: usize,
    pub memo_entries_cleared: usize,
    pub failures: Vec<PartialFailure>,
}

impl SweepReport {
    pub fn message(&self) -> String {
        format!("Deleted {} temporary files.", self.deleted)
    }
}
