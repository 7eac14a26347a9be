//! One side of a comparison: the pair (line-hash sequence, issue list).

use anyhow::{Context, Result};
use std::cell::OnceCell;

use super::line_hash::LineHashSequence;
use crate::component::ComponentType;
use crate::issue::Issue;
use crate::store::SourceStore;

/// One side of a comparison. The tracker only ever reads through this trait,
/// so the base side can load lazily from the store while the raw side is
/// handed over in memory.
pub trait TrackingInput {
    fn line_hashes(&self) -> Result<&LineHashSequence>;
    fn issues(&self) -> Result<&[Issue]>;
}

/// Store-backed input. Each field loads on first access and is cached for
/// the input's lifetime; a failed load propagates and aborts the pass.
///
/// Two short-circuits never touch the store:
/// - no target identity (component has no counterpart on the other side)
///   resolves both fields to empty;
/// - non-`File` components resolve `line_hashes()` to the empty sequence
///   (line-based matching is undefined for them), issues still load.
pub struct LazyInput<'a> {
    kind: ComponentType,
    target_uuid: Option<String>,
    store: &'a dyn SourceStore,
    line_hashes: OnceCell<LineHashSequence>,
    issues: OnceCell<Vec<Issue>>,
}

impl<'a> LazyInput<'a> {
    pub fn new(
        kind: ComponentType,
        target_uuid: Option<String>,
        store: &'a dyn SourceStore,
    ) -> Self {
        Self {
            kind,
            target_uuid,
            store,
            line_hashes: OnceCell::new(),
            issues: OnceCell::new(),
        }
    }

    /// Uuid of the component version this input reads, when one exists.
    pub fn target_uuid(&self) -> Option<&str> {
        self.target_uuid.as_deref()
    }
}

impl TrackingInput for LazyInput<'_> {
    fn line_hashes(&self) -> Result<&LineHashSequence> {
        if let Some(seq) = self.line_hashes.get() {
            return Ok(seq);
        }
        let seq = match &self.target_uuid {
            Some(uuid) if self.kind == ComponentType::File => self
                .store
                .line_hashes(uuid)
                .with_context(|| format!("Failed to load line hashes for component {uuid}"))?
                .map(LineHashSequence::new)
                .unwrap_or_else(LineHashSequence::empty),
            _ => LineHashSequence::empty(),
        };
        Ok(self.line_hashes.get_or_init(|| seq))
    }

    fn issues(&self) -> Result<&[Issue]> {
        if let Some(list) = self.issues.get() {
            return Ok(list);
        }
        let list = match &self.target_uuid {
            Some(uuid) => self
                .store
                .issues(uuid)
                .with_context(|| format!("Failed to load issues for component {uuid}"))?,
            None => Vec::new(),
        };
        Ok(self.issues.get_or_init(|| list))
    }
}

/// In-memory input for the side being scanned right now (and for tests).
pub struct ScanInput {
    line_hashes: LineHashSequence,
    issues: Vec<Issue>,
}

impl ScanInput {
    pub fn new(line_hashes: LineHashSequence, issues: Vec<Issue>) -> Self {
        Self {
            line_hashes,
            issues,
        }
    }

    /// An input with no lines and no issues.
    pub fn empty() -> Self {
        Self::new(LineHashSequence::empty(), Vec::new())
    }
}

impl TrackingInput for ScanInput {
    fn line_hashes(&self) -> Result<&LineHashSequence> {
        Ok(&self.line_hashes)
    }

    fn issues(&self) -> Result<&[Issue]> {
        Ok(&self.issues)
    }
}
