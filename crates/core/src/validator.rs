//! Validator (ETag) computation over request coordinates
//!
//! Validators are coordinate-addressed, not content-addressed: the digest is
//! computed from the request tuple alone, so it is stable across process
//! restarts and can short-circuit a conditional request before any fetch.
//! The flip side is accepted: an upstream artifact silently replaced under the
//! same release tag keeps its old validator.

use sha2::{Digest, Sha256};

use crate::coordinates::{ArtifactKind, Coordinates};

/// Scheme tag mixed into every digest. Bump the suffix when the coordinate
/// scheme changes so previously issued validators go stale instead of
/// colliding with the new scheme.
const SCHEME: &str = "carimbo-gateway/1";

/// Compute the validator for an artifact selected by `coordinates`.
///
/// Deterministic: identical inputs always produce the identical 64-character
/// lowercase hex digest. Every field is length-prefixed before hashing, so
/// field values containing any separator cannot alias another tuple.
#[must_use]
pub fn validator(coordinates: &Coordinates, kind: ArtifactKind) -> String {
    let mut hasher = Sha256::new();
    update_field(&mut hasher, SCHEME);
    update_field(&mut hasher, &coordinates.runtime);
    update_field(&mut hasher, &coordinates.org);
    update_field(&mut hasher, &coordinates.repo);
    update_field(&mut hasher, &coordinates.release);
    update_field(&mut hasher, kind.as_str());
    hex::encode(hasher.finalize())
}

fn update_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}
