//! Delegates render recipes and user scripts from a render orchestrator to
//! remote worker processes over HTTP.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
