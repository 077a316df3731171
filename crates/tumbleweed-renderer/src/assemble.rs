//! Document assembly: combining rendered post bodies into final files.
//!
//! Two composition policies exist. Grouped-by-day concatenates a calendar
//! day's posts into one document with time headings; per-post gives each
//! post its own file with front matter. Path derivation is a pure function
//! of post metadata so repeated runs land on identical paths.

use crate::attach::ATTACHMENTS_DIR;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tumbleweed_common::post::Post;

/// The final artifact: write-once, immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub path: PathBuf,
    pub body: String,
}

/// A document path plus the sibling attachment directory its links resolve
/// against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPaths {
    pub document: PathBuf,
    pub attachments_dir: PathBuf,
}

/// Builds the fixed offset used for all local-time rendering. Falls back to
/// UTC if the configured minutes are out of range.
pub fn local_offset(utc_offset_minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60))
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"))
}

pub fn local_time(timestamp: DateTime<Utc>, offset: FixedOffset) -> DateTime<FixedOffset> {
    timestamp.with_timezone(&offset)
}

pub fn local_day(timestamp: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    local_time(timestamp, offset).date_naive()
}

/// Path for a single-post document: `root/YYYY/MM/DD/HH-MM-<title>.md`,
/// attachments alongside in `root/YYYY/MM/DD/Attachments/`.
pub fn post_document_paths(root: &Path, post: &Post, offset: FixedOffset) -> DocumentPaths {
    let local = local_time(post.timestamp, offset);
    let day_dir = root
        .join(format!("{:04}", local.year()))
        .join(format!("{:02}", local.month()))
        .join(format!("{:02}", local.day()));
    let filename = format!(
        "{}-{}.md",
        local.format("%H-%M"),
        sanitize_title(&post_title(post))
    );
    DocumentPaths {
        document: day_dir.join(filename),
        attachments_dir: day_dir.join(ATTACHMENTS_DIR),
    }
}

/// Path for a grouped-day document: `root/YYYY/MM/DD.md`, attachments in
/// `root/YYYY/MM/Attachments/` (shared by the month's day files, still a
/// sibling of the document so links stay relative).
pub fn day_document_paths(root: &Path, day: NaiveDate) -> DocumentPaths {
    let month_dir = root
        .join(format!("{:04}", day.year()))
        .join(format!("{:02}", day.month()));
    DocumentPaths {
        document: month_dir.join(format!("{:02}.md", day.day())),
        attachments_dir: month_dir.join(ATTACHMENTS_DIR),
    }
}

fn post_title(post: &Post) -> String {
    if !post.summary.is_empty() {
        return post.summary.clone();
    }
    if let Some(title) = post.title.as_deref().filter(|t| !t.is_empty()) {
        return title.to_owned();
    }
    format!("post-{}", post.id())
}

/// Makes a post title safe for use as a filename: strips characters that
/// are invalid on common filesystems, replaces spaces with hyphens, and
/// caps the length.
pub fn sanitize_title(title: &str) -> String {
    const INVALID: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
    let cleaned: String = title
        .chars()
        .filter(|c| !INVALID.contains(c))
        .map(|c| if c == ' ' { '-' } else { c })
        .take(100)
        .collect();
    let trimmed = cleaned.trim_matches('-');
    if trimmed.is_empty() {
        "untitled".to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Escapes markdown-significant characters so titles and tags render as
/// literal text.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '`' | '*' | '_' | '[' | ']' | '(' | ')' | '#' | '<' | '>' | '|'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// One post per document, with structured front matter.
pub fn assemble_singular(
    post: &Post,
    body: &[String],
    path: PathBuf,
    offset: FixedOffset,
) -> RenderedDocument {
    let local = local_time(post.timestamp, offset);
    let mut lines = Vec::new();

    lines.push("---".to_owned());
    lines.push(format!("id: {}", post.id()));
    lines.push(format!("title: {}", escape_markdown(&post_title(post))));
    lines.push(format!("date: {}", local.format("%Y-%m-%d %H:%M:%S")));
    if !post.post_type.is_empty() {
        lines.push(format!("type: {}", post.post_type));
    }
    if !post.url.is_empty() {
        lines.push(format!("url: {}", post.url));
    }
    if !post.tags.is_empty() {
        lines.push("tags:".to_owned());
        for tag in &post.tags {
            lines.push(format!("  - {}", escape_markdown(tag)));
        }
    }
    lines.push("---".to_owned());
    lines.push(String::new());
    lines.extend(body.iter().cloned());

    RenderedDocument {
        path,
        body: join_lines(lines),
    }
}

/// All of one calendar day's posts in a single document, ascending by
/// timestamp, each under a local-time heading, separated by rules.
pub fn assemble_grouped(
    mut entries: Vec<(&Post, Vec<String>)>,
    path: PathBuf,
    offset: FixedOffset,
) -> RenderedDocument {
    entries.sort_by_key(|(post, _)| post.timestamp);

    let mut lines = Vec::new();
    for (index, (post, body)) in entries.iter().enumerate() {
        if index > 0 {
            lines.push(String::new());
            lines.push("---".to_owned());
            lines.push(String::new());
        }
        let local = local_time(post.timestamp, offset);
        let mut heading = format!("## {}", local.format("%H:%M"));
        for tag in &post.tags {
            heading.push_str(" #");
            heading.push_str(&escape_markdown(tag));
        }
        lines.push(heading);
        lines.push(String::new());
        lines.extend(body.iter().cloned());
    }

    RenderedDocument {
        path,
        body: join_lines(lines),
    }
}

fn join_lines(lines: Vec<String>) -> String {
    let mut body = lines.join("\n");
    body.push('\n');
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(json: &str) -> Post {
        serde_json::from_str(json).unwrap()
    }

    fn sydney() -> FixedOffset {
        local_offset(600)
    }

    #[test]
    fn singular_path_uses_local_date_and_title() {
        // 2023-11-14T22:13:20Z is 2023-11-15 08:13 at +10:00.
        let post = post(
            r#"{"id": 5, "id_string": "5", "timestamp": 1700000000, "summary": "A nice day: out/about"}"#,
        );
        let paths = post_document_paths(Path::new("backup"), &post, sydney());
        assert_eq!(
            paths.document,
            PathBuf::from("backup/2023/11/15/08-13-A-nice-day-outabout.md")
        );
        assert_eq!(
            paths.attachments_dir,
            PathBuf::from("backup/2023/11/15/Attachments")
        );
    }

    #[test]
    fn legacy_title_fills_in_for_empty_summary() {
        let post = post(r#"{"id": 8, "timestamp": 1700000000, "title": "Legacy title"}"#);
        let paths = post_document_paths(Path::new("backup"), &post, sydney());
        assert_eq!(
            paths.document,
            PathBuf::from("backup/2023/11/15/08-13-Legacy-title.md")
        );

        let untitled = self::post(r#"{"id": 8, "timestamp": 1700000000}"#);
        let paths = post_document_paths(Path::new("backup"), &untitled, sydney());
        assert_eq!(
            paths.document,
            PathBuf::from("backup/2023/11/15/08-13-post-8.md")
        );
    }

    #[test]
    fn day_path_is_month_scoped() {
        let day = NaiveDate::from_ymd_opt(2025, 12, 4).unwrap();
        let paths = day_document_paths(Path::new("backup"), day);
        assert_eq!(paths.document, PathBuf::from("backup/2025/12/04.md"));
        assert_eq!(
            paths.attachments_dir,
            PathBuf::from("backup/2025/12/Attachments")
        );
    }

    #[test]
    fn sanitize_title_matches_filename_rules() {
        assert_eq!(sanitize_title("hello world"), "hello-world");
        assert_eq!(sanitize_title("a/b\\c:d?e"), "abcde");
        assert_eq!(sanitize_title("---"), "untitled");
        assert_eq!(sanitize_title(""), "untitled");
        assert_eq!(sanitize_title("-trimmed- "), "trimmed");
    }

    #[test]
    fn escape_markdown_covers_delimiters() {
        assert_eq!(escape_markdown("a*b_c[d]"), "a\\*b\\_c\\[d\\]");
        assert_eq!(escape_markdown("#tag|pipe"), "\\#tag\\|pipe");
        assert_eq!(escape_markdown("plain"), "plain");
    }

    #[test]
    fn singular_document_has_front_matter() {
        let post = post(
            r#"{
            "id_string": "77",
            "timestamp": 1700000000,
            "summary": "Morning walk",
            "type": "text",
            "post_url": "https://example.tumblr.com/post/77",
            "tags": ["walks", "photos"]
        }"#,
        );
        let doc = assemble_singular(
            &post,
            &["some body".to_owned()],
            PathBuf::from("out.md"),
            sydney(),
        );
        insta::assert_snapshot!(doc.body.trim_end(), @r"
        ---
        id: 77
        title: Morning walk
        date: 2023-11-15 08:13:20
        type: text
        url: https://example.tumblr.com/post/77
        tags:
          - walks
          - photos
        ---

        some body
        ");
    }

    #[test]
    fn grouped_document_sorts_and_separates_posts() {
        let later = post(r#"{"id": 2, "timestamp": 1700010000, "tags": ["late"]}"#);
        let earlier = post(r#"{"id": 1, "timestamp": 1700000000}"#);

        let doc = assemble_grouped(
            vec![
                (&later, vec!["second post".to_owned()]),
                (&earlier, vec!["first post".to_owned()]),
            ],
            PathBuf::from("04.md"),
            sydney(),
        );

        insta::assert_snapshot!(doc.body.trim_end(), @r"
        ## 08:13

        first post

        ---

        ## 11:00 #late

        second post
        ");
    }

    #[test]
    fn assembly_is_deterministic() {
        let post = post(r#"{"id": 9, "timestamp": 1700000000, "tags": ["t"]}"#);
        let body = vec!["line".to_owned()];
        let a = assemble_singular(&post, &body, PathBuf::from("x.md"), sydney());
        let b = assemble_singular(&post, &body, PathBuf::from("x.md"), sydney());
        assert_eq!(a, b);
    }
}
