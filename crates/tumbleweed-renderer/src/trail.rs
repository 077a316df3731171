//! Reblog trail reconstruction.
//!
//! A reblogged post carries the chain of prior contributors as a flat list,
//! oldest first. Each layer renders as a blockquote under an attribution
//! line; the current post's own commentary always comes last, unquoted.

use crate::attach::{AttachmentScope, MediaFetcher};
use crate::blocks::render_blocks;
use tumbleweed_common::post::Post;

pub async fn render_post_body<F: MediaFetcher>(
    post: &Post,
    scope: &mut AttachmentScope,
    fetcher: &F,
) -> Vec<String> {
    let mut lines = Vec::new();

    for layer in &post.trail {
        lines.push(format!("{}:", layer.attribution()));
        for line in render_blocks(&layer.content, scope, fetcher).await {
            if line.is_empty() {
                lines.push(">".to_owned());
            } else {
                lines.push(format!("> {line}"));
            }
        }
    }

    if !post.trail.is_empty() && !post.content.is_empty() {
        lines.push("---".to_owned());
        lines.push(String::new());
    }

    lines.extend(render_blocks(&post.content, scope, fetcher).await);
    lines
}
