//! # Configuration Module
//!
//! Centralizes the numeric constants of the directory engine. Scattering
//! on-disk format constants across modules invites mismatch bugs, for example
//! an entry size that no longer agrees with the fanout derived from it, so
//! all of them live in [`constants`] with their interdependencies documented
//! and enforced through compile-time assertions.

pub mod constants;
pub use constants::*;
