//! Topic usage history shared by the pipeline's runs

pub mod cache;
pub mod entry;

pub use cache::TopicCache;
pub use entry::UsageEntry;
