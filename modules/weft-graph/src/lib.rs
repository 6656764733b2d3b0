pub mod client;
pub mod edges;
pub mod reader;
pub mod writer;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use client::GraphClient;
pub use edges::{can_invert, would_duplicate, EdgeIndex};
pub use reader::GraphReader;
pub use writer::GraphWriter;
