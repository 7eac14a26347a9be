//! End-to-end tracking flows over a real SQLite-backed analysis store:
//! record a merge-source branch's analysis, then track a short-lived
//! branch's scan against it.

use chrono::{TimeZone, Utc};
use scantrack::config::PipelineConfig;
use scantrack::tracking::{hash_line, sequence_of};
use scantrack::{
    track, track_components, Component, ComponentIndex, InputFactory, Issue,
    MergeBranchInputFactory, ScanInput, SqliteStore,
};
use tempfile::TempDir;

const MERGE_BRANCH: &str = "branch-main";

const SOURCE_V1: &str = "\
fn main() {
    let unused = 1;
    println!(\"hello\");
}
";

// One unrelated line inserted at the top; the flagged line shifts 2 -> 3.
const SOURCE_V2: &str = "\
// new header comment
fn main() {
    let unused = 1;
    println!(\"hello\");
}
";

fn line_hashes(text: &str) -> Vec<String> {
    text.lines().map(hash_line).collect()
}

fn issue(key: &str, rule: &str, uuid: &str, line: Option<u32>, created_millis: i64) -> Issue {
    Issue::new(
        key,
        rule,
        uuid,
        line,
        None,
        "finding",
        Utc.timestamp_millis_opt(created_millis).unwrap(),
    )
}

/// Store with one analyzed file on the merge-source branch: an issue on the
/// `let unused` line plus a file-level issue.
fn seeded_store(dir: &TempDir) -> SqliteStore {
    let store = SqliteStore::open_at(dir.path().join("analysis.db")).expect("open store");

    store
        .save_component(
            MERGE_BRANCH,
            &Component::file("main-a", "proj:src/a.rs", "src/a.rs"),
        )
        .unwrap();
    store
        .save_line_hashes("main-a", &line_hashes(SOURCE_V1))
        .unwrap();
    store
        .save_issue(&issue("B1", "rust:S1481", "main-a", Some(2), 1_000))
        .unwrap();
    store
        .save_issue(&issue("B2", "license:header", "main-a", None, 2_000))
        .unwrap();

    store
}

// ── Merge-branch inheritance ────────────────────────────────

#[test]
fn pr_scan_inherits_issues_from_the_merge_branch() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    let index = ComponentIndex::build(&store, MERGE_BRANCH).unwrap();
    let factory = MergeBranchInputFactory::new(&store, &index);

    let component = Component::file("pr-a", "proj:src/a.rs", "src/a.rs");
    let base = factory.create(&component);
    let raw = ScanInput::new(
        sequence_of(SOURCE_V2),
        vec![
            issue("R1", "rust:S1481", "pr-a", Some(3), 9_000),
            issue("R2", "license:header", "pr-a", None, 9_100),
        ],
    );

    let result = track(&base, &raw).unwrap();

    assert_eq!(result.matched_count(), 2);
    assert_eq!(result.base_of("R1").unwrap().key, "B1", "shifted line carried forward");
    assert_eq!(result.base_of("R2").unwrap().key, "B2", "file-level issue carried forward");
    assert!(result.new_issues().is_empty());
    assert!(result.closed_issues().is_empty());
}

#[test]
fn genuinely_fixed_issue_surfaces_as_closeable() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    let index = ComponentIndex::build(&store, MERGE_BRANCH).unwrap();
    let factory = MergeBranchInputFactory::new(&store, &index);

    // The unused variable is gone from the scanned source.
    let fixed = "\
fn main() {
    println!(\"hello\");
}
";
    let base = factory.create(&Component::file("pr-a", "proj:src/a.rs", "src/a.rs"));
    let raw = ScanInput::new(
        sequence_of(fixed),
        vec![issue("R2", "license:header", "pr-a", None, 9_100)],
    );

    let result = track(&base, &raw).unwrap();

    assert_eq!(result.matched_count(), 1);
    let closed: Vec<&str> = result.closed_issues().iter().map(|i| i.key.as_str()).collect();
    assert_eq!(closed, vec!["B1"]);
    assert!(result.new_issues().is_empty());
}

#[test]
fn component_without_merge_counterpart_tracks_against_nothing() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    let index = ComponentIndex::build(&store, MERGE_BRANCH).unwrap();
    let factory = MergeBranchInputFactory::new(&store, &index);

    let base = factory.create(&Component::file("pr-new", "proj:src/new.rs", "src/new.rs"));
    let raw = ScanInput::new(
        sequence_of("fn fresh() {}\n"),
        vec![issue("R1", "rust:S1481", "pr-new", Some(1), 9_000)],
    );

    let result = track(&base, &raw).unwrap();

    assert_eq!(result.matched_count(), 0);
    assert_eq!(result.new_issues().len(), 1);
    assert!(result.closed_issues().is_empty());
}

// ── Determinism ─────────────────────────────────────────────

#[test]
fn repeated_runs_produce_identical_results() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    let index = ComponentIndex::build(&store, MERGE_BRANCH).unwrap();
    let factory = MergeBranchInputFactory::new(&store, &index);
    let component = Component::file("pr-a", "proj:src/a.rs", "src/a.rs");

    let raw_issues = vec![
        issue("R1", "rust:S1481", "pr-a", Some(3), 9_000),
        issue("R2", "license:header", "pr-a", None, 9_100),
        issue("R3", "rust:S2933", "pr-a", Some(1), 9_200),
    ];

    let first = {
        let base = factory.create(&component);
        let raw = ScanInput::new(sequence_of(SOURCE_V2), raw_issues.clone());
        track(&base, &raw).unwrap()
    };
    let second = {
        let base = factory.create(&component);
        let raw = ScanInput::new(sequence_of(SOURCE_V2), raw_issues);
        track(&base, &raw).unwrap()
    };

    assert_eq!(first, second);
}

// ── Whole-scan pipeline ─────────────────────────────────────

#[test]
fn pipeline_tracks_every_scanned_component() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    let index = ComponentIndex::build(&store, MERGE_BRANCH).unwrap();
    let factory = MergeBranchInputFactory::new(&store, &index);

    let components = vec![
        (
            Component::file("pr-a", "proj:src/a.rs", "src/a.rs"),
            ScanInput::new(
                sequence_of(SOURCE_V2),
                vec![issue("R1", "rust:S1481", "pr-a", Some(3), 9_000)],
            ),
        ),
        (
            Component::file("pr-new", "proj:src/new.rs", "src/new.rs"),
            ScanInput::new(
                sequence_of("fn fresh() {}\n"),
                vec![issue("R9", "rust:S1481", "pr-new", Some(1), 9_000)],
            ),
        ),
    ];

    let outcomes =
        track_components(&components, &factory, &PipelineConfig::default(), 0).unwrap();

    assert_eq!(outcomes.len(), 2);
    let inherited = outcomes[0].result.as_ref().unwrap();
    assert_eq!(inherited.base_of("R1").unwrap().key, "B1");
    // The file-level issue was not re-raised by this scan.
    let closed: Vec<&str> = inherited.closed_issues().iter().map(|i| i.key.as_str()).collect();
    assert_eq!(closed, vec!["B2"]);

    let fresh = outcomes[1].result.as_ref().unwrap();
    assert_eq!(fresh.matched_count(), 0);
    assert_eq!(fresh.new_issues().len(), 1);
}
