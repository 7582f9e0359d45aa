//! Request coordinates and the artifact kinds they can select

/// The four path segments that identify which release a request is about.
///
/// `runtime` selects the runtime pair; `org`/`repo`/`release` select the
/// project bundle. All four participate in validator computation regardless of
/// which artifact is being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    /// Runtime version (e.g. `1.2.3`)
    pub runtime: String,
    /// GitHub organization owning the project
    pub org: String,
    /// Repository name within the organization
    pub repo: String,
    /// Release tag of the project (without the `v` prefix)
    pub release: String,
}

/// Container format of a project bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BundleFormat {
    /// Zip bundle; may be a tagged-source archive needing normalization
    Zip,
    /// 7z bundle; always a purpose-built release asset, served as-is
    SevenZ,
}

impl BundleFormat {
    /// Asset file name this format is published under.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Zip => "bundle.zip",
            Self::SevenZ => "bundle.7z",
        }
    }

    /// MIME type for serving this format.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Zip => "application/zip",
            Self::SevenZ => "application/x-7z-compressed",
        }
    }
}

/// Which concrete artifact a request resolves to.
///
/// Hashed into the validator so the script, binary, and bundle of one release
/// carry distinct ETags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The runtime's JavaScript loader, `carimbo.js`
    RuntimeScript,
    /// The runtime's WebAssembly module, `carimbo.wasm`
    RuntimeBinary,
    /// A project bundle in the given format
    Bundle(BundleFormat),
}

impl ArtifactKind {
    /// Stable name mixed into the validator digest.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RuntimeScript => "carimbo.js",
            Self::RuntimeBinary => "carimbo.wasm",
            Self::Bundle(format) => format.file_name(),
        }
    }

    /// MIME type for serving this artifact.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::RuntimeScript => "application/javascript",
            Self::RuntimeBinary => "application/wasm",
            Self::Bundle(format) => format.content_type(),
        }
    }
}
