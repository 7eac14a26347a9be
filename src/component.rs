//! Component and branch identities shared by the store and the tracking engine.

use serde::{Deserialize, Serialize};

/// Closed set of component kinds. Line-based matching is only meaningful for
/// `File`; the other kinds carry issues but never line hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Project,
    Directory,
    File,
}

impl ComponentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentType::Project => "project",
            ComponentType::Directory => "directory",
            ComponentType::File => "file",
        }
    }

    /// Parse the stored representation. Unknown strings map to `None` so a
    /// corrupt row surfaces at the store layer instead of panicking here.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "project" => Some(ComponentType::Project),
            "directory" => Some(ComponentType::Directory),
            "file" => Some(ComponentType::File),
            _ => None,
        }
    }
}

/// Closed set of branch kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchType {
    Main,
    LongLived,
    ShortLived,
}

impl BranchType {
    pub fn as_str(self) -> &'static str {
        match self {
            BranchType::Main => "main",
            BranchType::LongLived => "long_lived",
            BranchType::ShortLived => "short_lived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "main" => Some(BranchType::Main),
            "long_lived" => Some(BranchType::LongLived),
            "short_lived" => Some(BranchType::ShortLived),
            _ => None,
        }
    }
}

/// One node of an analyzed source tree. `key` is the logical identity that is
/// stable across branches (typically the repo-relative path prefixed with the
/// project key); `uuid` identifies one branch's copy of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub uuid: String,
    pub key: String,
    pub path: Option<String>,
    pub kind: ComponentType,
}

impl Component {
    pub fn file(uuid: impl Into<String>, key: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            key: key.into(),
            path: Some(path.into()),
            kind: ComponentType::File,
        }
    }
}

/// An analyzed branch. `merge_branch_uuid` names the branch whose analysis
/// results a short-lived branch inherits when it is first analyzed; it is
/// absent for the main branch and for branches configured without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub uuid: String,
    pub name: String,
    pub kind: BranchType,
    pub merge_branch_uuid: Option<String>,
}

impl Branch {
    /// Whether this branch's first analysis inherits issues from its
    /// merge-source branch instead of tracking against its own (nonexistent)
    /// previous analysis.
    pub fn inherits_from_merge_branch(&self) -> bool {
        match self.kind {
            BranchType::ShortLived => self.merge_branch_uuid.is_some(),
            BranchType::Main | BranchType::LongLived => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_type_roundtrips_through_storage_form() {
        for kind in [
            ComponentType::Project,
            ComponentType::Directory,
            ComponentType::File,
        ] {
            assert_eq!(ComponentType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ComponentType::parse("module"), None);
    }

    #[test]
    fn only_short_lived_branches_with_a_merge_source_inherit() {
        let mut branch = Branch {
            uuid: "b1".into(),
            name: "feature/x".into(),
            kind: BranchType::ShortLived,
            merge_branch_uuid: Some("main-uuid".into()),
        };
        assert!(branch.inherits_from_merge_branch());

        branch.merge_branch_uuid = None;
        assert!(!branch.inherits_from_merge_branch());

        branch.kind = BranchType::Main;
        branch.merge_branch_uuid = Some("main-uuid".into());
        assert!(!branch.inherits_from_merge_branch());
    }

    #[test]
    fn branch_type_roundtrips_through_storage_form() {
        for kind in [
            BranchType::Main,
            BranchType::LongLived,
            BranchType::ShortLived,
        ] {
            assert_eq!(BranchType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(BranchType::parse("feature"), None);
    }
}
