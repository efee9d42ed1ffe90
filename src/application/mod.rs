//! Delegation protocols and the seams they run against.

pub mod caller;
pub mod correlation;
pub mod error;
pub mod lease;
pub mod recipe;
pub mod registry;
pub mod render;
pub mod script;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
