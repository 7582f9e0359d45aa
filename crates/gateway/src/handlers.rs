//! Request handlers: coordinate parsing, conditional requests, responses

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use carimbo_core::{
    Artifact, ArtifactKey, ArtifactKind, BundleFormat, Coordinates, Error, Result, validator,
};
use chrono::{TimeDelta, Utc};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;

/// One year, the cache lifetime of immutable artifact responses.
const ARTIFACT_CACHE_CONTROL: &str = "public, max-age=31536000";
/// Five minutes, the cache lifetime of the templated shell page.
const SHELL_CACHE_CONTROL: &str = "public, max-age=300";

/// Query parameters accepted by the shell page.
#[derive(Debug, Deserialize)]
pub struct ShellParams {
    /// Resolution preset name (`480p`, `720p`, `1080p`)
    preset: Option<String>,
}

/// Canvas resolution presets offered by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Preset {
    P480,
    P720,
    P1080,
}

impl Preset {
    fn dimensions(self) -> (u32, u32) {
        match self {
            Self::P480 => (854, 480),
            Self::P720 => (1280, 720),
            Self::P1080 => (1920, 1080),
        }
    }
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "480p" => Ok(Self::P480),
            "720p" => Ok(Self::P720),
            "1080p" => Ok(Self::P1080),
            other => Err(Error::invalid_request(format!(
                "unknown resolution preset '{other}'"
            ))),
        }
    }
}

/// `GET /{runtime}/{org}/{repo}/{release}/` — the HTML shell.
pub async fn shell(
    State(state): State<Arc<AppState>>,
    Path((runtime, org, repo, release)): Path<(String, String, String, String)>,
    Query(params): Query<ShellParams>,
) -> std::result::Result<Response, ApiError> {
    let preset = match params.preset.as_deref() {
        Some(raw) => raw.parse::<Preset>()?,
        None => Preset::P720,
    };
    let (width, height) = preset.dimensions();

    let mut context = tera::Context::new();
    context.insert("base_url", &format!("/{runtime}/{org}/{repo}/{release}/"));
    context.insert("width", &width);
    context.insert("height", &height);

    let page = state
        .templates
        .render("shell", &context)
        .map_err(|e| Error::internal(format!("failed to render shell template: {e}")))?;

    Ok((
        [(header::CACHE_CONTROL, SHELL_CACHE_CONTROL)],
        Html(page),
    )
        .into_response())
}

/// `GET /{runtime}/{org}/{repo}/{release}/{artifact}` — cacheable artifacts.
///
/// The validator depends only on the request coordinates, so a conditional
/// hit short-circuits before any fetch, cold cache included.
pub async fn artifact(
    State(state): State<Arc<AppState>>,
    Path((runtime, org, repo, release, artifact)): Path<(String, String, String, String, String)>,
    headers: HeaderMap,
) -> std::result::Result<Response, ApiError> {
    let kind = match artifact.as_str() {
        "carimbo.js" => ArtifactKind::RuntimeScript,
        "carimbo.wasm" => ArtifactKind::RuntimeBinary,
        "bundle.zip" => ArtifactKind::Bundle(BundleFormat::Zip),
        "bundle.7z" => ArtifactKind::Bundle(BundleFormat::SevenZ),
        other => {
            return Err(Error::not_found(format!("no artifact named '{other}'")).into());
        }
    };
    let coordinates = Coordinates {
        runtime,
        org,
        repo,
        release,
    };

    let etag = format!("\"{}\"", validator(&coordinates, kind));
    if if_none_match_hit(&headers, &etag) {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
    }

    let body = fetch_artifact(&state, &coordinates, kind).await?;
    Ok(artifact_response(&etag, kind.content_type(), body))
}

/// `GET /favicon.ico` — empty icon, kept so browsers stop asking.
pub async fn favicon() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/x-icon")], Vec::<u8>::new())
}

/// Resolve an artifact through the cache, binding the right fetch to the key.
async fn fetch_artifact(
    state: &AppState,
    coordinates: &Coordinates,
    kind: ArtifactKind,
) -> Result<Vec<u8>> {
    match kind {
        ArtifactKind::RuntimeScript | ArtifactKind::RuntimeBinary => {
            let key = ArtifactKey::Runtime {
                version: coordinates.runtime.clone(),
            };
            let fetcher = state.fetcher.clone();
            let version = coordinates.runtime.clone();
            let cached = state
                .cache
                .get_or_fetch(key, move || async move {
                    fetcher.fetch_runtime(&version).await.map(Artifact::Runtime)
                })
                .await?;
            match cached.as_ref() {
                Artifact::Runtime(pair) => Ok(if kind == ArtifactKind::RuntimeScript {
                    pair.script.clone()
                } else {
                    pair.binary.clone()
                }),
                Artifact::Bundle(_) => {
                    Err(Error::internal("runtime key resolved to a bundle artifact"))
                }
            }
        }
        ArtifactKind::Bundle(format) => {
            let key = ArtifactKey::Bundle {
                org: coordinates.org.clone(),
                repo: coordinates.repo.clone(),
                release: coordinates.release.clone(),
                format,
            };
            let fetcher = state.fetcher.clone();
            let (org, repo, release) = (
                coordinates.org.clone(),
                coordinates.repo.clone(),
                coordinates.release.clone(),
            );
            let cached = state
                .cache
                .get_or_fetch(key, move || async move {
                    fetcher
                        .fetch_bundle(&org, &repo, &release, format)
                        .await
                        .map(Artifact::Bundle)
                })
                .await?;
            match cached.as_ref() {
                Artifact::Bundle(bytes) => Ok(bytes.clone()),
                Artifact::Runtime(_) => {
                    Err(Error::internal("bundle key resolved to a runtime artifact"))
                }
            }
        }
    }
}

/// Whether the request's `If-None-Match` matches `etag`.
///
/// Accepts a comma-separated candidate list, `*`, and weak validators.
fn if_none_match_hit(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|raw| {
            raw.split(',')
                .map(str::trim)
                .any(|candidate| candidate == "*" || candidate.trim_start_matches("W/") == etag)
        })
}

fn artifact_response(etag: &str, content_type: &'static str, body: Vec<u8>) -> Response {
    let expires = (Utc::now() + TimeDelta::days(365))
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CACHE_CONTROL, ARTIFACT_CACHE_CONTROL.to_string()),
            (header::ETAG, etag.to_string()),
            (header::EXPIRES, expires),
        ],
        body,
    )
        .into_response()
}
