//! Shared data model for the Carimbo gateway
//!
//! This crate holds everything the fetch, cache, and HTTP layers agree on:
//! - Request coordinates and the artifact kinds they can select
//! - Cache keys and cached artifact payloads
//! - The error taxonomy every layer reports through
//! - Validator (ETag) computation over request coordinates

mod artifact;
mod coordinates;
mod error;
mod validator;

pub use artifact::{Artifact, ArtifactKey, RuntimePair};
pub use coordinates::{ArtifactKind, BundleFormat, Coordinates};
pub use error::{Error, Result};
pub use validator::validator;
