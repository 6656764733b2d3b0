pub mod client;
pub mod merge;

pub use client::{ActivityQuery, ActivitySource, ActivityStreamClient};
pub use merge::{ActivityMergeEngine, SpaceScope};
