use tumbleweed_common::post::Formatting;

/// Inline style kinds we can express in markdown. Styles without a markdown
/// equivalent (`small`, `color`, anything new) map to [`SpanKind::Other`]
/// and pass text through unmarked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanKind {
    Bold,
    Italic,
    Strikethrough,
    Code,
    Link { href: String },
    Mention { url: String },
    Other,
}

/// A half-open formatting range over the original text, in byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRange {
    pub start: usize,
    pub length: usize,
    pub kind: SpanKind,
}

impl FormatRange {
    pub fn new(start: usize, length: usize, kind: SpanKind) -> Self {
        Self {
            start,
            length,
            kind,
        }
    }

    pub fn end(&self) -> usize {
        self.start.saturating_add(self.length)
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Converts raw NPF formatting entries into span ranges. Negative offsets
/// and inverted or zero-length ranges are dropped here; bounds clamping
/// against the actual text happens in the processor.
pub fn normalize_ranges(formatting: &[Formatting]) -> Vec<FormatRange> {
    formatting
        .iter()
        .filter_map(|entry| {
            if entry.start < 0 || entry.end <= entry.start {
                return None;
            }
            let start = entry.start as usize;
            let length = (entry.end - entry.start) as usize;
            let kind = match entry.kind.as_str() {
                "bold" => SpanKind::Bold,
                "italic" => SpanKind::Italic,
                "strikethrough" => SpanKind::Strikethrough,
                "code" => SpanKind::Code,
                "link" => match &entry.url {
                    Some(url) => SpanKind::Link { href: url.clone() },
                    None => SpanKind::Other,
                },
                "mention" => match entry.blog.as_ref().and_then(|blog| blog.url.clone()) {
                    Some(url) => SpanKind::Mention { url },
                    None => SpanKind::Other,
                },
                _ => SpanKind::Other,
            };
            Some(FormatRange::new(start, length, kind))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tumbleweed_common::post::MentionBlog;

    fn raw(start: i64, end: i64, kind: &str) -> Formatting {
        Formatting {
            start,
            end,
            kind: kind.into(),
            url: None,
            blog: None,
        }
    }

    #[test]
    fn invalid_ranges_are_dropped() {
        let formatting = vec![
            raw(-1, 4, "bold"),
            raw(5, 5, "bold"),
            raw(8, 2, "italic"),
            raw(0, 4, "bold"),
        ];
        let ranges = normalize_ranges(&formatting);
        assert_eq!(ranges, vec![FormatRange::new(0, 4, SpanKind::Bold)]);
    }

    #[test]
    fn link_without_url_degrades_to_plain() {
        let formatting = vec![raw(0, 4, "link")];
        let ranges = normalize_ranges(&formatting);
        assert_eq!(ranges[0].kind, SpanKind::Other);
    }

    #[test]
    fn mention_takes_blog_url() {
        let mut entry = raw(0, 8, "mention");
        entry.blog = Some(MentionBlog {
            url: Some("https://someblog.tumblr.com".into()),
        });
        let ranges = normalize_ranges(&[entry]);
        assert_eq!(
            ranges[0].kind,
            SpanKind::Mention {
                url: "https://someblog.tumblr.com".into()
            }
        );
    }

    #[test]
    fn unknown_styles_map_to_other() {
        let ranges = normalize_ranges(&[raw(0, 3, "small"), raw(0, 3, "color")]);
        assert!(ranges.iter().all(|r| r.kind == SpanKind::Other));
    }
}
