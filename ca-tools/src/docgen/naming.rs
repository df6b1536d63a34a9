//! Output filenames and certificate identifiers.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_STEM: &str = "document";
pub const DEFAULT_STEM_MAX_LEN: usize = 50;
pub const CERTIFICATE_ID_PREFIX: &str = "BON";
const CERTIFICATE_SUFFIX_LEN: usize = 6;
const CERTIFICATE_SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

static DISALLOWED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("static regex"));
static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Turns a free-text label into a filesystem-safe stem.
pub fn sanitize_stem(label: &str, max_len: usize) -> String {
    let text = label.replace(['\n', '\r'], " ");
    let text = DISALLOWED_CHARS.replace_all(&text, "");
    let text = WHITESPACE_RUNS.replace_all(&text, " ");
    let text = text.trim().replace(' ', "_");
    let stem: String = text.chars().take(max_len).collect();
    if stem.is_empty() {
        DEFAULT_STEM.to_string()
    } else {
        stem
    }
}

/// `{stem}_{YYYYMMDDHHMMSS}.{ext}`.
pub fn timestamped_filename(stem: &str, ext: &str, now: DateTime<Utc>) -> String {
    format!("{stem}_{}.{ext}", now.format("%Y%m%d%H%M%S"))
}

/// `BON-{YYYYMMDD}-{6 random uppercase alphanumerics}`.
pub fn certificate_id<R: Rng + ?Sized>(date: NaiveDate, rng: &mut R) -> String {
    let suffix: String = (0..CERTIFICATE_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..CERTIFICATE_SUFFIX_CHARSET.len());
            CERTIFICATE_SUFFIX_CHARSET[idx] as char
        })
        .collect();
    format!(
        "{CERTIFICATE_ID_PREFIX}-{}-{suffix}",
        date.format("%Y%m%d")
    )
}
