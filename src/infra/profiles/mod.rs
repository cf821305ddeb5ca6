// Profile store implementations.

pub mod in_memory;
pub mod sqlite_store;

pub use in_memory::InMemoryProfileStore;
pub use sqlite_store::SqliteProfileStore;
