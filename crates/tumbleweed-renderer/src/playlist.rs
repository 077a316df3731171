//! Playlist side channel: collecting externally hosted video links.
//!
//! Only a post's own content feeds the queue. Trail layers belong to other
//! blogs and would fill the playlist with videos the archive owner never
//! posted.

use std::sync::LazyLock;

use regex::Regex;
use tumbleweed_common::post::{ContentUnit, MediaKind, MediaRef, Post};

static YOUTUBE_ID_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"youtube\.com/watch\?(?:[^&\s]*&)*v=([\w-]{11})").expect("valid pattern"),
        Regex::new(r"youtu\.be/([\w-]{11})").expect("valid pattern"),
        Regex::new(r"youtube\.com/(?:embed|v)/([\w-]{11})").expect("valid pattern"),
    ]
});

/// Extracts the 11-character YouTube video id from a watch, short, embed,
/// or `/v/` URL. Returns `None` for anything else.
pub fn youtube_video_id(url: &str) -> Option<&str> {
    YOUTUBE_ID_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str())
}

/// Externally hosted video URLs from the post's own content, in block
/// order. Native uploads and trail videos never appear here.
pub fn collect_external_videos(post: &Post) -> Vec<String> {
    let mut urls = Vec::new();
    for block in &post.content {
        let ContentUnit::Video {
            media,
            url,
            provider,
        } = block
        else {
            continue;
        };
        let candidate = match media.as_ref().filter(|m| !m.url.is_empty()) {
            Some(object) => object.url.clone(),
            None => match url.as_ref().filter(|u| !u.is_empty()) {
                Some(u) => u.clone(),
                None => continue,
            },
        };
        let media_ref = MediaRef::new(
            candidate.clone(),
            None,
            None,
            MediaKind::Video,
            provider.as_deref(),
        );
        if media_ref.is_external() {
            urls.push(candidate);
        }
    }
    urls
}
