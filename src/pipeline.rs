//! Across-components tracking pass: parallel over components, strictly
//! sequential within one component's match.

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::component::Component;
use crate::config::PipelineConfig;
use crate::tracking::{track, InputFactory, ScanInput, TrackingResult};

/// Per-component outcome of a pass. A failed component is a failed analysis
/// step; it is never reported as "all issues new".
pub struct ComponentOutcome {
    pub component_key: String,
    pub result: Result<TrackingResult>,
}

impl ComponentOutcome {
    pub fn is_failed(&self) -> bool {
        self.result.is_err()
    }
}

/// Track every `(component, raw scan input)` pair against the base side the
/// factory resolves. Outcomes come back in input order.
///
/// Parallelism is across components only; each worker runs one component's
/// match to completion. `workers = 0` uses one worker per core.
pub fn track_components(
    components: &[(Component, ScanInput)],
    factory: &dyn InputFactory,
    config: &PipelineConfig,
    verbose: u8,
) -> Result<Vec<ComponentOutcome>> {
    let run = || {
        components
            .par_iter()
            .map(|(component, raw)| track_one(component, raw, factory, verbose))
            .collect::<Vec<_>>()
    };

    let outcomes = if config.workers == 0 {
        run()
    } else {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .context("Failed to build tracking thread pool")?
            .install(run)
    };
    Ok(outcomes)
}

fn track_one(
    component: &Component,
    raw: &ScanInput,
    factory: &dyn InputFactory,
    verbose: u8,
) -> ComponentOutcome {
    let base = factory.create(component);
    let result = track(&base, raw)
        .with_context(|| format!("Tracking pass failed for component {}", component.key));

    if verbose > 0 {
        match &result {
            Ok(r) => eprintln!("tracking.component key={} {}", component.key, r.summary()),
            Err(e) => eprintln!("tracking.component key={} failed: {e:#}", component.key),
        }
    }

    ComponentOutcome {
        component_key: component.key.clone(),
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::Issue;
    use crate::store::{SourceStore, StoreError};
    use crate::tracking::line_hash::sequence_of;
    use crate::tracking::{BaseInputFactory, LazyInput};
    use chrono::{TimeZone, Utc};

    /// Store that serves one good component and fails hard on another.
    struct SplitStore;

    impl SourceStore for SplitStore {
        fn line_hashes(&self, uuid: &str) -> Result<Option<Vec<String>>, StoreError> {
            if uuid == "bad-uuid" {
                return Err(StoreError::Corrupt("store unavailable".into()));
            }
            Ok(Some(vec![crate::tracking::line_hash::hash_line(
                "let unused = 1;",
            )]))
        }

        fn issues(&self, uuid: &str) -> Result<Vec<Issue>, StoreError> {
            if uuid == "bad-uuid" {
                return Err(StoreError::Corrupt("store unavailable".into()));
            }
            Ok(vec![Issue::new(
                "B1",
                "rust:S1481",
                uuid,
                Some(1),
                None,
                "Unused variable",
                Utc.timestamp_millis_opt(1_000).unwrap(),
            )])
        }

        fn components_of_branch(
            &self,
            _branch_uuid: &str,
        ) -> Result<Vec<(String, String)>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn raw_input() -> ScanInput {
        ScanInput::new(
            sequence_of("let unused = 1;\n"),
            vec![Issue::new(
                "R1",
                "rust:S1481",
                "any",
                Some(1),
                None,
                "Unused variable",
                Utc.timestamp_millis_opt(9_000).unwrap(),
            )],
        )
    }

    #[test]
    fn one_failing_component_does_not_poison_the_others() {
        let store = SplitStore;
        let factory = BaseInputFactory::new(&store);
        let components = vec![
            (
                Component::file("good-uuid", "proj:src/good.rs", "src/good.rs"),
                raw_input(),
            ),
            (
                Component::file("bad-uuid", "proj:src/bad.rs", "src/bad.rs"),
                raw_input(),
            ),
        ];

        let outcomes =
            track_components(&components, &factory, &PipelineConfig::default(), 0).unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].component_key, "proj:src/good.rs");
        assert!(!outcomes[0].is_failed());
        assert_eq!(
            outcomes[0].result.as_ref().unwrap().matched_count(),
            1,
            "good component still matched"
        );
        assert!(outcomes[1].is_failed());
    }

    #[test]
    fn outcomes_preserve_input_order_with_capped_workers() {
        let store = SplitStore;
        let factory = BaseInputFactory::new(&store);
        let components: Vec<(Component, ScanInput)> = (0..8)
            .map(|i| {
                (
                    Component::file(
                        format!("uuid-{i}"),
                        format!("proj:src/f{i}.rs"),
                        format!("src/f{i}.rs"),
                    ),
                    raw_input(),
                )
            })
            .collect();

        let config = PipelineConfig { workers: 2 };
        let outcomes = track_components(&components, &factory, &config, 0).unwrap();

        let keys: Vec<&str> = outcomes.iter().map(|o| o.component_key.as_str()).collect();
        let expected: Vec<String> = (0..8).map(|i| format!("proj:src/f{i}.rs")).collect();
        assert_eq!(keys, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    // LazyInput is created inside the worker that consumes it; this only
    // checks the factory seam stays object-safe for the pipeline.
    #[test]
    fn factory_trait_object_is_usable() {
        let store = SplitStore;
        let factory: &dyn InputFactory = &BaseInputFactory::new(&store);
        let input: LazyInput =
            factory.create(&Component::file("good-uuid", "proj:src/a.rs", "src/a.rs"));
        assert_eq!(input.target_uuid(), Some("good-uuid"));
    }
}
