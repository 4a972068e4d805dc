mod bucket;
mod store;
mod workspace;

pub use bucket::MemoryBucket;
pub use store::FlakyStore;
pub use workspace::TestWorkspace;
