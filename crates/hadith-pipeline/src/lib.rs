#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod clusters;
pub mod merge;
pub mod orchestrator;
pub mod registry;
pub mod searcher;

pub use clusters::validate_clusters;
pub use merge::merge_ranked;
pub use orchestrator::{compose_enhanced, Capabilities, Pipeline};
pub use registry::CachedRegistry;
pub use searcher::{MultiCollectionSearcher, SearchOutcome, SkippedCollection};
