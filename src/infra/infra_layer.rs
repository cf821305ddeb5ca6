// The infra module contains implementations of core traits.
// Each component's stores go in their own submodule.

#[path = "profiles/mod.rs"]
pub mod profiles;

#[path = "feed/mod.rs"]
pub mod feed;

#[path = "timestamps.rs"]
pub(crate) mod timestamps;

#[cfg(test)]
#[path = "test_support.rs"]
pub(crate) mod test_support;
