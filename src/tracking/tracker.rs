//! The matching engine: pairs the raw side's issues with the base side's.
//!
//! Rules run in descending priority; a pair recorded by one rule is never
//! revisited by a lower one. Every candidate scan walks a pre-sorted order
//! (creation timestamp, then issue key), never hash-map iteration order, so
//! the same two inputs always produce the identical result.

use anyhow::Result;
use std::collections::HashSet;

use super::input::TrackingInput;
use super::line_hash::LineHashSequence;
use super::result::TrackingResult;
use crate::issue::Issue;

/// Match `raw` (the scan being processed) against `base` (the prior version).
///
/// Absence of matches is a normal outcome; the only errors are propagated
/// load failures from the inputs, which abort the whole pass.
pub fn track(base: &dyn TrackingInput, raw: &dyn TrackingInput) -> Result<TrackingResult> {
    let base_hashes = base.line_hashes()?;
    let raw_hashes = raw.line_hashes()?;
    let base_issues = base.issues()?;
    let raw_issues = raw.issues()?;

    let mut matching = Matching::new(base_issues, raw_issues);
    matching.match_same_line(base_hashes, raw_hashes);
    matching.match_shifted_line(base_hashes, raw_hashes);
    matching.match_line_less();
    Ok(matching.finish())
}

/// Bookkeeping for one pass: which issues are taken, and who pairs with whom.
struct Matching<'a> {
    base_issues: &'a [Issue],
    raw_issues: &'a [Issue],
    /// Indices sorted oldest-first (creation timestamp, then key).
    base_order: Vec<usize>,
    raw_order: Vec<usize>,
    base_taken: Vec<bool>,
    raw_to_base: Vec<Option<usize>>,
}

impl<'a> Matching<'a> {
    fn new(base_issues: &'a [Issue], raw_issues: &'a [Issue]) -> Self {
        Self {
            base_issues,
            raw_issues,
            base_order: oldest_first(base_issues),
            raw_order: oldest_first(raw_issues),
            base_taken: vec![false; base_issues.len()],
            raw_to_base: vec![None; raw_issues.len()],
        }
    }

    fn record(&mut self, raw_idx: usize, base_idx: usize) {
        debug_assert!(self.raw_to_base[raw_idx].is_none());
        debug_assert!(!self.base_taken[base_idx]);
        self.raw_to_base[raw_idx] = Some(base_idx);
        self.base_taken[base_idx] = true;
    }

    /// Rule 1: same rule, same line number, and that line's content hash is
    /// identical on both sides. Earliest-created base issue wins ties.
    fn match_same_line(&mut self, base_hashes: &LineHashSequence, raw_hashes: &LineHashSequence) {
        for ri in self.raw_order.clone() {
            let raw_issue = &self.raw_issues[ri];
            let Some(line) = raw_issue.line else { continue };
            let (Some(base_hash), Some(raw_hash)) =
                (base_hashes.hash_at(line), raw_hashes.hash_at(line))
            else {
                continue;
            };
            if base_hash != raw_hash {
                continue;
            }
            let candidate = self.base_order.iter().copied().find(|&bi| {
                let base_issue = &self.base_issues[bi];
                !self.base_taken[bi]
                    && base_issue.line == Some(line)
                    && base_issue.rule == raw_issue.rule
            });
            if let Some(bi) = candidate {
                self.record(ri, bi);
            }
        }
    }

    /// Rule 2: same rule, same line content, different line number. Covers
    /// pure insertion/deletion of unrelated lines above or below. Candidates
    /// come from the base side's reverse index; the base issue on the line
    /// closest to the raw issue's wins, oldest-first on equal distance.
    fn match_shifted_line(
        &mut self,
        base_hashes: &LineHashSequence,
        raw_hashes: &LineHashSequence,
    ) {
        for ri in self.raw_order.clone() {
            if self.raw_to_base[ri].is_some() {
                continue;
            }
            let raw_issue = &self.raw_issues[ri];
            let Some(line) = raw_issue.line else { continue };
            // The raw sequence is authoritative for the line's content; the
            // stored checksum covers issues past the end of the sequence.
            let hash = raw_hashes
                .hash_at(line)
                .map(str::to_string)
                .or_else(|| raw_issue.checksum.clone());
            let Some(hash) = hash else { continue };
            let candidate_lines: HashSet<u32> =
                base_hashes.lines_with_hash(&hash).iter().copied().collect();
            if candidate_lines.is_empty() {
                continue;
            }

            let mut best: Option<(u32, usize)> = None;
            for &bi in &self.base_order {
                if self.base_taken[bi] {
                    continue;
                }
                let base_issue = &self.base_issues[bi];
                if base_issue.rule != raw_issue.rule {
                    continue;
                }
                let Some(base_line) = base_issue.line else {
                    continue;
                };
                if !candidate_lines.contains(&base_line) {
                    continue;
                }
                let distance = base_line.abs_diff(line);
                // Strictly-smaller keeps the oldest candidate on ties.
                match best {
                    Some((best_distance, _)) if distance >= best_distance => {}
                    _ => best = Some((distance, bi)),
                }
            }
            if let Some((_, bi)) = best {
                self.record(ri, bi);
            }
        }
    }

    /// Rule 3: issues without a line number (file- and project-level) match
    /// by rule alone, oldest-first, one-to-one.
    fn match_line_less(&mut self) {
        for ri in self.raw_order.clone() {
            if self.raw_to_base[ri].is_some() {
                continue;
            }
            let raw_issue = &self.raw_issues[ri];
            if raw_issue.line.is_some() {
                continue;
            }
            let candidate = self.base_order.iter().copied().find(|&bi| {
                let base_issue = &self.base_issues[bi];
                !self.base_taken[bi]
                    && base_issue.line.is_none()
                    && base_issue.rule == raw_issue.rule
            });
            if let Some(bi) = candidate {
                self.record(ri, bi);
            }
        }
    }

    fn finish(self) -> TrackingResult {
        let mut matched = Vec::new();
        let mut new_issues = Vec::new();
        for (ri, raw_issue) in self.raw_issues.iter().enumerate() {
            match self.raw_to_base[ri] {
                Some(bi) => matched.push((raw_issue.clone(), self.base_issues[bi].clone())),
                None => new_issues.push(raw_issue.clone()),
            }
        }
        let closed_issues: Vec<Issue> = self
            .base_issues
            .iter()
            .enumerate()
            .filter(|(bi, _)| !self.base_taken[*bi])
            .map(|(_, issue)| issue.clone())
            .collect();
        TrackingResult::new(matched, new_issues, closed_issues)
    }
}

/// Indices of `issues` ordered by creation timestamp, then key.
fn oldest_first(issues: &[Issue]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..issues.len()).collect();
    order.sort_by(|&a, &b| {
        issues[a]
            .created_at
            .cmp(&issues[b].created_at)
            .then_with(|| issues[a].key.cmp(&issues[b].key))
    });
    order
}
