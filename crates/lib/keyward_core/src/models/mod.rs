//! Domain and wire models.

pub mod auth;
