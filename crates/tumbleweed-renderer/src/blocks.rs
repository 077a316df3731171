//! Content block rendering: one post's ordered blocks to markdown lines.
//!
//! Blocks render strictly in their original order; layout groupings are
//! presentation hints for multi-column display and never reorder anything,
//! since markdown output is linear. A single bad block degrades to a
//! placeholder or a remote link and the rest of the post keeps rendering.

use crate::assemble::escape_markdown;
use crate::attach::{AttachmentScope, MediaFetcher};
use crate::report::RenderWarning;
use crate::span::{apply_spans, normalize_ranges};
use tumbleweed_common::post::{ContentUnit, MediaKind, MediaObject, MediaRef, TextSubtype};

pub async fn render_blocks<F: MediaFetcher>(
    blocks: &[ContentUnit],
    scope: &mut AttachmentScope,
    fetcher: &F,
) -> Vec<String> {
    let mut lines = Vec::new();

    for block in blocks {
        match block {
            ContentUnit::Text {
                text,
                subtype,
                formatting,
            } => {
                if text.is_empty() {
                    continue;
                }
                let formatted = apply_spans(text, &normalize_ranges(formatting));
                let formatted = match subtype {
                    TextSubtype::Plain => formatted,
                    TextSubtype::Heading1 => format!("# {formatted}"),
                    TextSubtype::Heading2 => format!("## {formatted}"),
                    TextSubtype::Indented => format!("  {formatted}"),
                    TextSubtype::Chat => format!("**{formatted}**"),
                };
                lines.extend(formatted.split('\n').map(str::to_owned));
            }
            ContentUnit::Quote { text, formatting } => {
                if !text.is_empty() {
                    let formatted = apply_spans(text, &normalize_ranges(formatting));
                    for line in formatted.split('\n') {
                        if line.is_empty() {
                            lines.push(">".to_owned());
                        } else {
                            lines.push(format!("> {line}"));
                        }
                    }
                }
            }
            ContentUnit::ListItem {
                text,
                formatting,
                ordered,
            } => {
                if !text.is_empty() {
                    let formatted = apply_spans(text, &normalize_ranges(formatting));
                    let marker = if *ordered { "1." } else { "-" };
                    for (idx, line) in formatted.split('\n').enumerate() {
                        if idx == 0 {
                            lines.push(format!("{marker} {line}"));
                        } else if line.is_empty() {
                            lines.push(String::new());
                        } else {
                            // Continuation lines stay inside the item.
                            lines.push(format!("  {line}"));
                        }
                    }
                }
            }
            ContentUnit::Image { media, alt_text } => {
                let Some(object) = largest_rendition(media) else {
                    continue;
                };
                let media_ref = media_ref_for(object, None, MediaKind::Image);
                let resolved = scope.resolve(&media_ref, fetcher).await;
                let label = alt_text
                    .as_deref()
                    .filter(|alt| !alt.is_empty())
                    .map(escape_markdown)
                    .unwrap_or_else(|| "Image".to_owned());
                lines.push(format!("![{label}]({})", resolved.link()));
            }
            ContentUnit::Video {
                media,
                url,
                provider,
            } => {
                if let Some(line) =
                    render_av(media, url, provider, MediaKind::Video, scope, fetcher).await
                {
                    lines.push(line);
                }
            }
            ContentUnit::Audio {
                media,
                url,
                provider,
            } => {
                if let Some(line) =
                    render_av(media, url, provider, MediaKind::Audio, scope, fetcher).await
                {
                    lines.push(line);
                }
            }
            ContentUnit::Link { url, title } => {
                if url.is_empty() {
                    continue;
                }
                let label = title
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .map(escape_markdown)
                    .unwrap_or_else(|| url.clone());
                lines.push(format!("[{label}]({url})"));
            }
            ContentUnit::Layout { .. } => {}
            ContentUnit::Unknown { kind } => {
                scope.push_warning(RenderWarning::UnknownUnit { kind: kind.clone() });
                lines.push(format!("[unsupported content block: {kind}]"));
            }
        }
    }

    lines
}

async fn render_av<F: MediaFetcher>(
    media: &Option<MediaObject>,
    url: &Option<String>,
    provider: &Option<String>,
    kind: MediaKind,
    scope: &mut AttachmentScope,
    fetcher: &F,
) -> Option<String> {
    let media_ref = match media.as_ref().filter(|m| !m.url.is_empty()) {
        Some(object) => media_ref_for(object, provider.as_deref(), kind),
        None => {
            let url = url.as_ref().filter(|u| !u.is_empty())?;
            MediaRef::new(url.clone(), None, None, kind, provider.as_deref())
        }
    };
    let resolved = scope.resolve(&media_ref, fetcher).await;
    Some(format!("[{}]({})", kind.label(), resolved.link()))
}

/// The API usually lists the largest rendition first, but not always;
/// declared dimensions decide, with list order breaking ties.
fn largest_rendition(media: &[MediaObject]) -> Option<&MediaObject> {
    media
        .iter()
        .filter(|m| !m.url.is_empty())
        .min_by_key(|m| {
            std::cmp::Reverse(u64::from(m.width.unwrap_or(0)) * u64::from(m.height.unwrap_or(0)))
        })
}

fn media_ref_for(object: &MediaObject, provider: Option<&str>, kind: MediaKind) -> MediaRef {
    MediaRef::new(
        object.url.clone(),
        object.mime.clone(),
        object.size_bytes,
        kind,
        provider,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attach::{ATTACHMENTS_DIR, AttachmentPolicy};
    use std::path::Path;
    use std::sync::Mutex;

    struct MemoryFetcher {
        calls: Mutex<Vec<String>>,
    }

    impl MemoryFetcher {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl MediaFetcher for MemoryFetcher {
        async fn fetch(
            &self,
            url: &str,
            dest: &Path,
        ) -> core::result::Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
            self.calls.lock().unwrap().push(url.to_owned());
            tokio::fs::write(dest, b"media bytes").await?;
            Ok(())
        }
    }

    fn unit(json: &str) -> ContentUnit {
        serde_json::from_str(json).unwrap()
    }

    async fn render(blocks: &[ContentUnit]) -> (Vec<String>, usize) {
        let tmp = tempfile::tempdir().unwrap();
        let mut scope = AttachmentScope::new(
            tmp.path().join(ATTACHMENTS_DIR),
            AttachmentPolicy::default(),
        );
        let fetcher = MemoryFetcher::new();
        let lines = render_blocks(blocks, &mut scope, &fetcher).await;
        (lines, fetcher.call_count())
    }

    #[tokio::test]
    async fn text_subtypes_render_prefixes() {
        let blocks = vec![
            unit(r#"{"type": "text", "subtype": "heading1", "text": "Title"}"#),
            unit(r#"{"type": "text", "text": "body line"}"#),
            unit(r#"{"type": "text", "subtype": "chat", "text": "me: hi"}"#),
            unit(r#"{"type": "text", "subtype": "quote", "text": "wisdom"}"#),
            unit(r#"{"type": "text", "subtype": "unordered-list-item", "text": "a point"}"#),
        ];
        let (lines, _) = render(&blocks).await;
        assert_eq!(
            lines,
            vec!["# Title", "body line", "**me: hi**", "> wisdom", "- a point"]
        );
    }

    #[tokio::test]
    async fn multiline_text_splits_after_formatting() {
        let blocks = vec![unit(
            r#"{"type": "text", "text": "one\ntwo", "formatting": [{"start": 0, "end": 3, "type": "bold"}]}"#,
        )];
        let (lines, _) = render(&blocks).await;
        assert_eq!(lines, vec!["**one**", "two"]);
    }

    #[tokio::test]
    async fn multiline_quote_prefixes_every_line() {
        let blocks = vec![unit(
            r#"{"type": "text", "subtype": "quote", "text": "first\nsecond"}"#,
        )];
        let (lines, _) = render(&blocks).await;
        assert_eq!(lines, vec!["> first", "> second"]);
    }

    #[tokio::test]
    async fn multiline_list_item_indents_continuation() {
        let blocks = vec![unit(
            r#"{"type": "text", "subtype": "unordered-list-item", "text": "head\ntail"}"#,
        )];
        let (lines, _) = render(&blocks).await;
        assert_eq!(lines, vec!["- head", "  tail"]);
    }

    #[tokio::test]
    async fn image_downloads_and_links_relative() {
        let blocks = vec![unit(
            r#"{"type": "image", "media": [{"url": "https://media.example/pic.png", "type": "image/png"}]}"#,
        )];
        let (lines, fetches) = render(&blocks).await;
        assert_eq!(lines, vec!["![Image](Attachments/pic.png)"]);
        assert_eq!(fetches, 1);
    }

    #[tokio::test]
    async fn image_picks_largest_declared_rendition() {
        let blocks = vec![unit(
            r#"{"type": "image", "media": [
                {"url": "https://media.example/small.png", "type": "image/png", "width": 250, "height": 150},
                {"url": "https://media.example/big.png", "type": "image/png", "width": 1280, "height": 720}
            ]}"#,
        )];
        let (lines, fetches) = render(&blocks).await;
        assert_eq!(lines, vec!["![Image](Attachments/big.png)"]);
        assert_eq!(fetches, 1);
    }

    #[tokio::test]
    async fn external_video_renders_bare_link_without_fetch() {
        let blocks = vec![unit(
            r#"{"type": "video", "url": "https://www.youtube.com/watch?v=abc123def45", "provider": "youtube"}"#,
        )];
        let (lines, fetches) = render(&blocks).await;
        assert_eq!(
            lines,
            vec!["[Video](https://www.youtube.com/watch?v=abc123def45)"]
        );
        assert_eq!(fetches, 0);
    }

    #[tokio::test]
    async fn link_block_uses_title_as_label() {
        let blocks = vec![
            unit(r#"{"type": "link", "url": "https://example.com", "title": "An [odd] title"}"#),
            unit(r#"{"type": "link", "url": "https://example.com/bare"}"#),
        ];
        let (lines, _) = render(&blocks).await;
        assert_eq!(
            lines,
            vec![
                "[An \\[odd\\] title](https://example.com)",
                "[https://example.com/bare](https://example.com/bare)"
            ]
        );
    }

    #[tokio::test]
    async fn unknown_block_renders_placeholder() {
        let blocks = vec![unit(r#"{"type": "poll", "question": "?"}"#)];
        let (lines, _) = render(&blocks).await;
        assert_eq!(lines, vec!["[unsupported content block: poll]"]);
    }

    #[tokio::test]
    async fn layout_block_emits_nothing_and_preserves_order() {
        let blocks = vec![
            unit(r#"{"type": "text", "text": "first"}"#),
            unit(r#"{"type": "layout", "display": [{"blocks": [1, 0]}]}"#),
            unit(r#"{"type": "text", "text": "second"}"#),
        ];
        let (lines, _) = render(&blocks).await;
        assert_eq!(lines, vec!["first", "second"]);
    }
}
