//! The issue entity consumed (read-only) by the tracking engine.

use chrono::{DateTime, Utc};

/// Lifecycle status of a persisted issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueStatus {
    Open,
    Confirmed,
    Resolved,
    Closed,
}

impl IssueStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueStatus::Open => "open",
            IssueStatus::Confirmed => "confirmed",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(IssueStatus::Open),
            "confirmed" => Some(IssueStatus::Confirmed),
            "resolved" => Some(IssueStatus::Resolved),
            "closed" => Some(IssueStatus::Closed),
            _ => None,
        }
    }
}

/// One recorded change of an issue field. Carried opaquely for the
/// persistence collaborator; matching never reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueChange {
    pub issue_key: String,
    pub change_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A persisted static-analysis finding.
///
/// `key` is assigned once and never reused: it is the identity that tracking
/// preserves across versions. `line` is absent for file- and project-level
/// issues. `checksum` is the content hash of the line the issue was raised
/// on, recorded at creation time; it lets a line-bearing issue carry forward
/// even when the current line-hash sequence no longer covers its line.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub key: String,
    pub rule: String,
    pub component_uuid: String,
    pub line: Option<u32>,
    pub checksum: Option<String>,
    pub status: IssueStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub changes: Vec<IssueChange>,
}

impl Issue {
    /// Minimal constructor for the common case: an open issue with no
    /// recorded change history.
    pub fn new(
        key: impl Into<String>,
        rule: impl Into<String>,
        component_uuid: impl Into<String>,
        line: Option<u32>,
        checksum: Option<String>,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            rule: rule.into(),
            component_uuid: component_uuid.into(),
            line,
            checksum,
            status: IssueStatus::Open,
            message: message.into(),
            created_at,
            changes: Vec::new(),
        }
    }
}
