//! GitHub Releases client for the Carimbo gateway
//!
//! Retrieves the runtime pair (`carimbo.js` + `carimbo.wasm`, published
//! together in one `WebAssembly.zip` release asset) and per-project bundles.
//! Bundles are looked up as purpose-built release assets first; zip bundles
//! fall back to the tagged-source archive, which is normalized before use.
//!
//! No retries: a single upstream failure surfaces as a typed error and the
//! caller (the artifact cache) decides what happens next.

use std::io::{Cursor, Read};
use std::time::Duration;

use carimbo_core::{BundleFormat, Error, Result, RuntimePair};
use reqwest::Client;
use tracing::{debug, info};
use zip::ZipArchive;

/// Release store the gateway talks to unless configured otherwise.
pub const DEFAULT_BASE_URL: &str = "https://github.com";

const RUNTIME_ORG: &str = "carimbolabs";
const RUNTIME_REPO: &str = "carimbo";
const RUNTIME_ASSET: &str = "WebAssembly.zip";
const RUNTIME_SCRIPT_NAME: &str = "carimbo.js";
const RUNTIME_BINARY_NAME: &str = "carimbo.wasm";

/// HTTP client for the remote release store.
///
/// Stateless aside from the connection pool. The base URL is injectable so
/// tests can point it at a local stub server.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    client: Client,
    base_url: String,
}

impl ReleaseClient {
    /// Create a client against `base_url` with a bounded total request
    /// timeout covering connect, transfer, and redirects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the TLS backend fails to initialize.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("carimbo-gateway/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the runtime pair for `version`.
    ///
    /// Downloads the versioned `WebAssembly.zip` release asset and scans it
    /// for the two well-known entries.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] / [`Error::UpstreamStatus`] for network and HTTP
    /// failures, [`Error::Archive`] for a malformed zip, [`Error::NotFound`]
    /// when either named entry is absent after a full scan.
    pub async fn fetch_runtime(&self, version: &str) -> Result<RuntimePair> {
        let url = format!(
            "{}/{RUNTIME_ORG}/{RUNTIME_REPO}/releases/download/v{version}/{RUNTIME_ASSET}",
            self.base_url
        );
        let body = self.get(&url).await?;
        scan_runtime_archive(&body)
    }

    /// Fetch the bundle for a release triplet.
    ///
    /// Tries the release-attached asset (`bundle.zip` / `bundle.7z`) first
    /// and caches-as-is semantics apply: the asset bytes are returned
    /// untouched. For zip bundles only, an upstream 404 on the asset falls
    /// back to the tagged-source archive, whose synthetic root directory is
    /// stripped before returning.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::fetch_runtime`]; the fallback's normalization
    /// can additionally report [`Error::Archive`].
    pub async fn fetch_bundle(
        &self,
        org: &str,
        repo: &str,
        release: &str,
        format: BundleFormat,
    ) -> Result<Vec<u8>> {
        let asset_url = format!(
            "{}/{org}/{repo}/releases/download/v{release}/{}",
            self.base_url,
            format.file_name()
        );
        match self.get(&asset_url).await {
            Ok(body) => Ok(body),
            Err(err) if err.is_upstream_not_found() && format == BundleFormat::Zip => {
                info!(org, repo, release, "no release asset, trying tagged-source archive");
                let source_url = format!(
                    "{}/{org}/{repo}/archive/refs/tags/v{release}.zip",
                    self.base_url
                );
                let body = self.get(&source_url).await?;
                carimbo_archive::strip_root(&body)
            }
            Err(err) => Err(err),
        }
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        debug!(%url, "fetching upstream artifact");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream_status(status.as_u16(), url));
        }

        response
            .bytes()
            .await
            .map(|body| body.to_vec())
            .map_err(|e| Error::transport(format!("failed to read body of {url}: {e}")))
    }
}

/// Scan a runtime release archive for the script and binary entries.
fn scan_runtime_archive(data: &[u8]) -> Result<RuntimePair> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| Error::archive(format!("runtime archive is not a valid zip: {e}")))?;

    let mut script = None;
    let mut binary = None;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| Error::archive(format!("failed to read runtime archive entry: {e}")))?;
        let name = entry.name().to_string();
        match name.as_str() {
            RUNTIME_SCRIPT_NAME => script = Some(read_entry(&mut entry)?),
            RUNTIME_BINARY_NAME => binary = Some(read_entry(&mut entry)?),
            _ => {}
        }
    }

    let script = script
        .ok_or_else(|| Error::not_found(format!("{RUNTIME_SCRIPT_NAME} in runtime archive")))?;
    let binary = binary
        .ok_or_else(|| Error::not_found(format!("{RUNTIME_BINARY_NAME} in runtime archive")))?;
    Ok(RuntimePair { script, binary })
}

fn read_entry<R: Read>(entry: &mut R) -> Result<Vec<u8>> {
    let mut contents = Vec::new();
    entry
        .read_to_end(&mut contents)
        .map_err(|e| Error::archive(format!("failed to read runtime archive entry: {e}")))?;
    Ok(contents)
}
