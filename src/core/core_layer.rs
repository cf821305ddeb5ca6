// The core module contains all business logic.
// Each component gets its own submodule; none of them do I/O directly.

#[path = "identity.rs"]
pub mod identity;

#[path = "profiles/profile_registry.rs"]
pub mod profiles;

#[path = "feed/mod.rs"]
pub mod feed;
