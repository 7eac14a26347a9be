//! Per-line content hashes for one file version.

use std::collections::HashMap;
use xxhash_rust::xxh3::xxh3_64;

/// Ordered per-line content hashes for one file version, with a reverse
/// index for hash → line-number lookup. Lines are 1-indexed. The empty
/// sequence is a valid value and stands in for "no version exists".
///
/// Immutable after construction. Equality compares the hash lists in order.
#[derive(Debug, Clone, Default)]
pub struct LineHashSequence {
    hashes: Vec<String>,
    by_hash: HashMap<String, Vec<u32>>,
}

impl LineHashSequence {
    pub fn new(hashes: Vec<String>) -> Self {
        let mut by_hash: HashMap<String, Vec<u32>> = HashMap::with_capacity(hashes.len());
        for (idx, hash) in hashes.iter().enumerate() {
            by_hash.entry(hash.clone()).or_default().push(idx as u32 + 1);
        }
        Self { hashes, by_hash }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of lines in this file version.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Hash of line `line` (1-indexed), or `None` when the sequence does not
    /// cover that line.
    pub fn hash_at(&self, line: u32) -> Option<&str> {
        if line == 0 {
            return None;
        }
        self.hashes.get(line as usize - 1).map(String::as_str)
    }

    /// All line numbers whose content hashes to `hash`, in ascending order.
    pub fn lines_with_hash(&self, hash: &str) -> &[u32] {
        self.by_hash.get(hash).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl PartialEq for LineHashSequence {
    fn eq(&self, other: &Self) -> bool {
        self.hashes == other.hashes
    }
}

impl Eq for LineHashSequence {}

/// Canonical per-line fingerprint: all whitespace is stripped before hashing,
/// so indentation and spacing edits keep a line's identity. A line that is
/// blank after stripping hashes to the empty string.
pub fn hash_line(line: &str) -> String {
    let stripped: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    if stripped.is_empty() {
        return String::new();
    }
    format!("{:016x}", xxh3_64(stripped.as_bytes()))
}

/// Hash every line of `text` into a sequence. Both sides of a comparison must
/// be hashed by this same function for matching to see unchanged lines.
pub fn sequence_of(text: &str) -> LineHashSequence {
    LineHashSequence::new(text.lines().map(hash_line).collect())
}
