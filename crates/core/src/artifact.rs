//! Cache keys and cached artifact payloads

use crate::coordinates::BundleFormat;

/// Identifier a cached artifact is stored under.
///
/// Two requests with identical coordinates map to the same key. Runtime pairs
/// are keyed by version alone: every project on the same runtime version shares
/// one cached pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKey {
    /// A runtime pair, keyed by runtime version
    Runtime {
        /// Runtime version string
        version: String,
    },
    /// A project bundle, keyed by its release triplet and container format
    Bundle {
        /// GitHub organization
        org: String,
        /// Repository name
        repo: String,
        /// Release tag (without the `v` prefix)
        release: String,
        /// Container format of the bundle
        format: BundleFormat,
    },
}

/// The two payloads extracted from one runtime release archive.
#[derive(Debug, Clone)]
pub struct RuntimePair {
    /// Contents of `carimbo.js`
    pub script: Vec<u8>,
    /// Contents of `carimbo.wasm`
    pub binary: Vec<u8>,
}

/// A cached payload. Immutable once stored; a key is write-once for the
/// process lifetime.
#[derive(Debug, Clone)]
pub enum Artifact {
    /// A runtime script/binary pair
    Runtime(RuntimePair),
    /// A (possibly normalized) bundle archive
    Bundle(Vec<u8>),
}
