// Feed store implementations.

pub mod in_memory;
pub mod sqlite_store;

pub use in_memory::InMemoryFeedStore;
pub use sqlite_store::SqliteFeedStore;
