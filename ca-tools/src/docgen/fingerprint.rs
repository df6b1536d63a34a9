use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 digest of the exact input a builder is about to render.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds a fingerprint over several ordered fields.
///
/// Every field is length-prefixed, so `["ab", "c"]` and `["a", "bc"]` hash
/// differently, and the domain tag keeps a Word body and an identical CSV
/// payload from sharing a memo key.
pub struct Fingerprinter {
    hasher: Sha256,
}

impl Fingerprinter {
    pub fn new(domain: &str) -> Self {
        let mut fp = Self {
            hasher: Sha256::new(),
        };
        fp.push_frame(domain.as_bytes());
        fp
    }

    pub fn field(mut self, value: &str) -> Self {
        self.push_frame(value.as_bytes());
        self
    }

    pub fn number(mut self, value: i64) -> Self {
        self.push_frame(&value.to_le_bytes());
        self
    }

    pub fn finish(self) -> ContentFingerprint {
        ContentFingerprint(bytes_to_hex(&self.hasher.finalize()))
    }

    fn push_frame(&mut self, bytes: &[u8]) {
        self.hasher.update((bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
    }
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_encoding_matches_known_sha256() {
        assert_eq!(
            bytes_to_hex(&Sha256::digest(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn equal_fields_give_equal_fingerprints() {
        let a = Fingerprinter::new("docx").field("Quarterly plan").finish();
        let b = Fingerprinter::new("docx").field("Quarterly plan").finish();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn single_character_change_changes_fingerprint() {
        let a = Fingerprinter::new("docx").field("Quarterly plan").finish();
        let b = Fingerprinter::new("docx").field("Quarterly plan ").finish();
        assert_ne!(a, b);
    }

    #[test]
    fn field_order_and_boundaries_matter() {
        let ab = Fingerprinter::new("pptx").field("a").field("b").finish();
        let ba = Fingerprinter::new("pptx").field("b").field("a").finish();
        let joined = Fingerprinter::new("pptx").field("ab").finish();
        let split = Fingerprinter::new("pptx").field("a").field("b").finish();
        assert_ne!(ab, ba);
        assert_ne!(joined, split);
    }

    #[test]
    fn domain_separates_formats() {
        let word = Fingerprinter::new("docx").field("a,b\n1,2").finish();
        let excel = Fingerprinter::new("xlsx").field("a,b\n1,2").finish();
        assert_ne!(word, excel);
    }
}
