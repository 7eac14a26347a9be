//! Outcome of one component's tracking pass.

use crate::issue::Issue;

/// Bidirectional outcome of matching one component's two sides: the paired
/// issues, the raw issues with no base counterpart ("new"), and the base
/// issues no longer present ("closeable"). Read-only after construction;
/// the persistence collaborator consumes it exactly once.
///
/// The pair mapping is one-to-one by construction and the three views are
/// key-sorted, so equal inputs always produce an equal result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingResult {
    matched: Vec<(Issue, Issue)>,
    new_issues: Vec<Issue>,
    closed_issues: Vec<Issue>,
}

impl TrackingResult {
    pub(crate) fn new(
        mut matched: Vec<(Issue, Issue)>,
        mut new_issues: Vec<Issue>,
        mut closed_issues: Vec<Issue>,
    ) -> Self {
        matched.sort_by(|(a, _), (b, _)| a.key.cmp(&b.key));
        new_issues.sort_by(|a, b| a.key.cmp(&b.key));
        closed_issues.sort_by(|a, b| a.key.cmp(&b.key));

        debug_assert!(
            is_injective(&matched),
            "tracking produced a non one-to-one pairing"
        );

        Self {
            matched,
            new_issues,
            closed_issues,
        }
    }

    /// Matched `(raw, base)` pairs, ordered by raw issue key.
    pub fn matched_pairs(&self) -> impl Iterator<Item = (&Issue, &Issue)> {
        self.matched.iter().map(|(raw, base)| (raw, base))
    }

    pub fn matched_count(&self) -> usize {
        self.matched.len()
    }

    /// The base issue a raw issue continues, if any.
    pub fn base_of(&self, raw_key: &str) -> Option<&Issue> {
        self.matched
            .iter()
            .find(|(raw, _)| raw.key == raw_key)
            .map(|(_, base)| base)
    }

    /// Raw issues with no base counterpart: first seen in this scan.
    pub fn new_issues(&self) -> &[Issue] {
        &self.new_issues
    }

    /// Base issues with no raw counterpart: no longer present, closeable.
    pub fn closed_issues(&self) -> &[Issue] {
        &self.closed_issues
    }

    /// One-line digest for progress output.
    pub fn summary(&self) -> String {
        format!(
            "matched={} new={} closed={}",
            self.matched.len(),
            self.new_issues.len(),
            self.closed_issues.len()
        )
    }
}

fn is_injective(matched: &[(Issue, Issue)]) -> bool {
    let mut raw_keys: Vec<&str> = matched.iter().map(|(raw, _)| raw.key.as_str()).collect();
    let mut base_keys: Vec<&str> = matched.iter().map(|(_, base)| base.key.as_str()).collect();
    raw_keys.sort_unstable();
    base_keys.sort_unstable();
    raw_keys.windows(2).all(|w| w[0] != w[1]) && base_keys.windows(2).all(|w| w[0] != w[1])
}
