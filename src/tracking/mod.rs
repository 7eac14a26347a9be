//! Cross-version issue tracking: given the prior version of a component (the
//! base side) and the scan being processed (the raw side), decide for every
//! issue whether it continues an existing one, is new, or is gone.
//!
//! Flow: an [`InputFactory`] resolves the base side for a component and hands
//! a lazily-loaded [`LazyInput`] to [`track`], which matches it against the
//! scan's [`ScanInput`] and emits a [`TrackingResult`]. Persisting that
//! result (key propagation, closing) is the caller's concern.

pub mod factory;
pub mod input;
pub mod line_hash;
pub mod result;
pub mod tracker;

pub use factory::{BaseInputFactory, ComponentIndex, InputFactory, MergeBranchInputFactory};
pub use input::{LazyInput, ScanInput, TrackingInput};
pub use line_hash::{hash_line, sequence_of, LineHashSequence};
pub use result::TrackingResult;
pub use tracker::track;
