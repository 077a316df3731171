//! Attachment resolution: download-vs-link policy, stable local filenames,
//! and per-scope dedup.
//!
//! An [`AttachmentScope`] is transient state for one output scope (a day or
//! a single post). It caches every resolution made inside the scope so a
//! media URL referenced twice yields one file and two identical links, and
//! it accumulates the warnings produced along the way. Scopes are created
//! fresh per document and dropped when the document is written.

use crate::report::RenderWarning;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tumbleweed_common::config::Config;
use tumbleweed_common::post::{HostKind, MediaKind, MediaRef};
use url::Url;

/// Directory name for attachment files, a sibling of each document.
pub const ATTACHMENTS_DIR: &str = "Attachments";

/// Download toggles and the size ceiling, injected from configuration.
#[derive(Debug, Clone)]
pub struct AttachmentPolicy {
    pub download_images: bool,
    pub download_videos: bool,
    pub download_audio: bool,
    pub size_ceiling_bytes: Option<u64>,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            download_images: true,
            download_videos: true,
            download_audio: true,
            size_ceiling_bytes: Some(100 * 1024 * 1024),
        }
    }
}

impl AttachmentPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            download_images: config.download_images,
            download_videos: config.download_videos,
            download_audio: config.download_audio,
            size_ceiling_bytes: config.size_ceiling_bytes,
        }
    }

    fn allows(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Image => self.download_images,
            MediaKind::Video => self.download_videos,
            MediaKind::Audio => self.download_audio,
        }
    }
}

/// Outcome of resolving one media reference: either a path relative to the
/// document's directory, or the URL passed through as an external link.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAttachment {
    pub source: MediaRef,
    pub target: AttachmentTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentTarget {
    Local { relative_path: String },
    External { url: String },
}

impl ResolvedAttachment {
    fn local(source: &MediaRef, relative_path: String) -> Self {
        Self {
            source: source.clone(),
            target: AttachmentTarget::Local { relative_path },
        }
    }

    fn external(source: &MediaRef) -> Self {
        Self {
            source: source.clone(),
            target: AttachmentTarget::External {
                url: source.url.clone(),
            },
        }
    }

    /// The link to put in the markdown body.
    pub fn link(&self) -> &str {
        match &self.target {
            AttachmentTarget::Local { relative_path } => relative_path,
            AttachmentTarget::External { url } => url,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.target, AttachmentTarget::Local { .. })
    }
}

/// The seam for fetching attachment bytes. The real implementation is
/// [`HttpMediaFetcher`]; tests substitute an in-memory one.
pub trait MediaFetcher {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
    ) -> impl Future<
        Output = core::result::Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>,
    > + Send;
}

/// Downloads attachment bytes over HTTP with a bounded wait. Re-checks the
/// response's Content-Length against the ceiling, since declared sizes in
/// post payloads are not always present or honest.
pub struct HttpMediaFetcher {
    http: reqwest::Client,
    size_ceiling_bytes: Option<u64>,
}

impl HttpMediaFetcher {
    pub fn new(size_ceiling_bytes: Option<u64>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            size_ceiling_bytes,
        })
    }
}

impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
    ) -> core::result::Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        if let (Some(ceiling), Some(length)) = (self.size_ceiling_bytes, response.content_length())
        {
            if length > ceiling {
                return Err(format!("content length {length} exceeds ceiling {ceiling}").into());
            }
        }
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }
}

/// Per-scope attachment state. See the module docs for lifetime rules.
pub struct AttachmentScope {
    dir: PathBuf,
    policy: AttachmentPolicy,
    by_url: HashMap<String, ResolvedAttachment>,
    claimed: HashMap<String, String>,
    warnings: Vec<RenderWarning>,
}

impl AttachmentScope {
    pub fn new(dir: impl Into<PathBuf>, policy: AttachmentPolicy) -> Self {
        Self {
            dir: dir.into(),
            policy,
            by_url: HashMap::new(),
            claimed: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn warnings(&self) -> &[RenderWarning] {
        &self.warnings
    }

    pub fn push_warning(&mut self, warning: RenderWarning) {
        tracing::warn!(%warning, "render degraded");
        self.warnings.push(warning);
    }

    /// Resolves one media reference.
    ///
    /// Decision order: external hosting wins unconditionally; then the
    /// per-kind download toggle; then the declared-size ceiling; then the
    /// scope cache; then reuse of a file already on disk; only after all of
    /// that do we fetch. A failed fetch degrades to the external form and is
    /// cached too, so a bad URL is attempted once per scope.
    pub async fn resolve<F: MediaFetcher>(
        &mut self,
        media: &MediaRef,
        fetcher: &F,
    ) -> ResolvedAttachment {
        if media.host_kind == HostKind::External || !self.policy.allows(media.kind) {
            return ResolvedAttachment::external(media);
        }

        if let (Some(ceiling), Some(declared)) =
            (self.policy.size_ceiling_bytes, media.declared_size_bytes)
        {
            if declared > ceiling {
                self.push_warning(RenderWarning::OversizeMedia {
                    url: media.url.clone(),
                    declared_size: declared,
                });
                return ResolvedAttachment::external(media);
            }
        }

        if let Some(cached) = self.by_url.get(&media.url) {
            return cached.clone();
        }

        let filename = self.claim_filename(&media.url);
        let dest = self.dir.join(&filename);
        let relative_path = format!("{}/{}", self.link_prefix(), filename);

        let resolved = if dest.exists() {
            // Already downloaded on a previous run; the dedup guarantee is
            // keyed by (scope, filename), not content.
            ResolvedAttachment::local(media, relative_path)
        } else {
            match self.download(media, fetcher, &dest).await {
                Ok(()) => ResolvedAttachment::local(media, relative_path),
                Err(reason) => {
                    self.push_warning(RenderWarning::MediaFetchFailed {
                        url: media.url.clone(),
                        reason,
                    });
                    ResolvedAttachment::external(media)
                }
            }
        };

        self.by_url.insert(media.url.clone(), resolved.clone());
        resolved
    }

    async fn download<F: MediaFetcher>(
        &self,
        media: &MediaRef,
        fetcher: &F,
        dest: &Path,
    ) -> core::result::Result<(), String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| e.to_string())?;
        fetcher
            .fetch(&media.url, dest)
            .await
            .map_err(|e| e.to_string())
    }

    fn link_prefix(&self) -> &str {
        self.dir
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(ATTACHMENTS_DIR)
    }

    /// Picks a filename for `url`, appending `-1`, `-2`, ... when a distinct
    /// URL in this scope already produced the same name.
    fn claim_filename(&mut self, url: &str) -> String {
        let base = terminal_segment(url);
        let mut candidate = base.clone();
        let mut suffix = 1usize;
        loop {
            match self.claimed.get(&candidate) {
                Some(owner) if owner != url => {
                    candidate = with_suffix(&base, suffix);
                    suffix += 1;
                }
                _ => break,
            }
        }
        self.claimed.insert(candidate.clone(), url.to_owned());
        candidate
    }
}

/// Terminal path segment of a URL, used as the stable local filename.
fn terminal_segment(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
                .map(str::to_owned)
        })
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| "attachment".to_owned())
}

fn with_suffix(name: &str, n: usize) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}-{}{}", &name[..dot], n, &name[dot..]),
        _ => format!("{name}-{n}"),
    }
}
