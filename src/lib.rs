//! Cross-version issue tracking engine for static-analysis scans.
//!
//! Matches the issues of a freshly scanned component against a prior
//! version (the previous analysis of the same branch, or the same-path
//! component on a merge-source branch) using per-line content hashes and
//! issue metadata only. Matching is deterministic and treats a missing
//! counterpart as a normal outcome, not an error. The result is a one-to-one
//! pairing plus the two leftover sets (new issues, closeable issues).
//!
//! Entry points:
//! - [`tracking::track`] matches one component's two sides.
//! - [`pipeline::track_components`] runs a whole scan, parallel across
//!   components.
//! - [`store::SqliteStore`] is the bundled analysis store; anything
//!   implementing [`store::SourceStore`] works in its place.

pub mod component;
pub mod config;
pub mod issue;
pub mod pipeline;
pub mod store;
pub mod tracking;

pub use component::{Branch, BranchType, Component, ComponentType};
pub use issue::{Issue, IssueChange, IssueStatus};
pub use pipeline::{track_components, ComponentOutcome};
pub use store::{SourceStore, SqliteStore, StoreError};
pub use tracking::{
    track, BaseInputFactory, ComponentIndex, InputFactory, LazyInput, LineHashSequence,
    MergeBranchInputFactory, ScanInput, TrackingInput, TrackingResult,
};
