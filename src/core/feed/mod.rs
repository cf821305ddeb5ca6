// Core feed module - tweets, flags and moderation.
// Same split as the profile registry: models here, rules in the service.

pub mod feed_models;
pub mod feed_service;

pub use feed_models::*;
pub use feed_service::*;
