//! Backup driver: fetch, plan, render, write.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use tumbleweed_common::client::TumblrClient;
use tumbleweed_common::post::Post;
use tumbleweed_common::{Config, Granularity, Result};
use tumbleweed_renderer::assemble::{
    assemble_grouped, assemble_singular, day_document_paths, local_day, local_offset,
    post_document_paths,
};
use tumbleweed_renderer::attach::{AttachmentPolicy, AttachmentScope, HttpMediaFetcher};
use tumbleweed_renderer::playlist::{collect_external_videos, youtube_video_id};
use tumbleweed_renderer::util::write_document;
use tumbleweed_renderer::{MediaFetcher, WritePlan, plan_document, render_post_body};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BackupSummary {
    pub written: usize,
    pub skipped: usize,
    pub warnings: usize,
    pub playlist_urls: usize,
}

/// Runs a full backup pass with the real API client and downloader.
pub async fn backup(config: &Config) -> Result<BackupSummary> {
    let client = TumblrClient::new(&config.blog_identifier, &config.api_key)?;
    let posts = client.fetch_all(config.incremental_hours).await?;
    let fetcher = HttpMediaFetcher::new(config.size_ceiling_bytes)?;
    archive_posts(config, &posts, &fetcher).await
}

/// Renders and writes the given posts. Split from [`backup`] so the
/// pipeline can run against canned posts without a network.
pub async fn archive_posts<F: MediaFetcher>(
    config: &Config,
    posts: &[Post],
    fetcher: &F,
) -> Result<BackupSummary> {
    let offset = local_offset(config.utc_offset_minutes);
    let policy = AttachmentPolicy::from_config(config);
    let mut summary = BackupSummary::default();
    let mut playlist = Vec::new();

    match config.granularity {
        Granularity::PerPost => {
            for post in posts {
                let paths = post_document_paths(&config.output_dir, post, offset);
                match plan_document(paths) {
                    WritePlan::Skip(path) => {
                        tracing::debug!(path = %path.display(), "document exists, skipping");
                        summary.skipped += 1;
                    }
                    WritePlan::Render(paths) => {
                        let mut scope =
                            AttachmentScope::new(paths.attachments_dir.clone(), policy.clone());
                        let body = render_post_body(post, &mut scope, fetcher).await;
                        summary.warnings += scope.warnings().len();
                        playlist.extend(collect_external_videos(post));

                        let doc = assemble_singular(post, &body, paths.document, offset);
                        write_or_log(&mut summary, &doc.path, &doc.body).await;
                    }
                }
            }
        }
        Granularity::GroupedByDay => {
            let mut days: BTreeMap<NaiveDate, Vec<&Post>> = BTreeMap::new();
            for post in posts {
                days.entry(local_day(post.timestamp, offset))
                    .or_default()
                    .push(post);
            }

            for (day, day_posts) in days {
                let paths = day_document_paths(&config.output_dir, day);
                match plan_document(paths) {
                    WritePlan::Skip(path) => {
                        tracing::debug!(path = %path.display(), %day, "day already archived");
                        summary.skipped += 1;
                    }
                    WritePlan::Render(paths) => {
                        let mut scope =
                            AttachmentScope::new(paths.attachments_dir.clone(), policy.clone());
                        let mut entries = Vec::new();
                        for post in &day_posts {
                            let body = render_post_body(post, &mut scope, fetcher).await;
                            entries.push((*post, body));
                            playlist.extend(collect_external_videos(post));
                        }
                        summary.warnings += scope.warnings().len();

                        let doc = assemble_grouped(entries, paths.document, offset);
                        write_or_log(&mut summary, &doc.path, &doc.body).await;
                    }
                }
            }
        }
    }

    if let Some(queue) = &config.playlist_queue {
        summary.playlist_urls = append_playlist(queue, &playlist).await?;
    }

    Ok(summary)
}

/// A document that fails to write is logged and the run continues; one bad
/// path never aborts the rest of the archive.
async fn write_or_log(summary: &mut BackupSummary, path: &Path, body: &str) {
    match write_document(path, body).await {
        Ok(()) => {
            tracing::info!(path = %path.display(), "wrote document");
            summary.written += 1;
        }
        Err(err) => {
            tracing::error!(path = %path.display(), %err, "failed to write document");
            summary.warnings += 1;
        }
    }
}

/// Dedup key for a queue entry. YouTube URLs reduce to the video id so the
/// same video is never queued twice under different URL forms.
fn queue_key(url: &str) -> &str {
    youtube_video_id(url).unwrap_or(url)
}

/// Appends URLs to the playlist queue, one per line, skipping any video
/// already present so re-runs never duplicate entries.
async fn append_playlist(path: &Path, urls: &[String]) -> Result<usize> {
    let existing = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => {
            return Err(tumbleweed_common::ArchiveError::Write {
                path: path.to_path_buf(),
                source: err,
            });
        }
    };

    let mut seen: HashSet<&str> = existing.lines().map(queue_key).collect();
    let mut content = existing.clone();
    let mut appended = 0;
    for url in urls {
        if seen.insert(queue_key(url)) {
            content.push_str(url);
            content.push('\n');
            appended += 1;
        }
    }

    if appended > 0 {
        write_document(path, &content).await?;
    }
    Ok(appended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct NoFetch;

    impl MediaFetcher for NoFetch {
        async fn fetch(
            &self,
            _url: &str,
            _dest: &Path,
        ) -> core::result::Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
            Err("no network in tests".into())
        }
    }

    fn posts() -> Vec<Post> {
        serde_json::from_str(
            r#"[
            {
                "id": 1,
                "timestamp": 1700000000,
                "summary": "first",
                "content": [{"type": "text", "text": "hello"}]
            },
            {
                "id": 2,
                "timestamp": 1700010000,
                "summary": "second",
                "content": [
                    {"type": "video", "url": "https://youtu.be/dQw4w9WgXcQ", "provider": "youtube"}
                ]
            }
        ]"#,
        )
        .unwrap()
    }

    fn config(output_dir: PathBuf) -> Config {
        Config {
            blog_identifier: "example.tumblr.com".into(),
            api_key: "key".into(),
            output_dir,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn per_post_run_writes_then_skips() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path().to_path_buf());
        let posts = posts();

        let first = archive_posts(&config, &posts, &NoFetch).await.unwrap();
        assert_eq!(first.written, 2);
        assert_eq!(first.skipped, 0);

        let second = archive_posts(&config, &posts, &NoFetch).await.unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.skipped, 2);
    }

    #[tokio::test]
    async fn grouped_run_produces_one_day_document() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            granularity: Granularity::GroupedByDay,
            ..config(tmp.path().to_path_buf())
        };
        let posts = posts();

        // Both posts fall on 2023-11-15 at +10:00.
        let summary = archive_posts(&config, &posts, &NoFetch).await.unwrap();
        assert_eq!(summary.written, 1);

        let day_file = tmp.path().join("2023/11/15.md");
        let body = std::fs::read_to_string(day_file).unwrap();
        assert!(body.contains("## 08:13"));
        assert!(body.contains("## 11:00"));
    }

    #[tokio::test]
    async fn playlist_queue_appends_without_duplicates() {
        let tmp = tempfile::tempdir().unwrap();
        let queue = tmp.path().join("playlist.txt");
        let config = Config {
            playlist_queue: Some(queue.clone()),
            ..config(tmp.path().join("archive"))
        };
        let posts = posts();

        let first = archive_posts(&config, &posts, &NoFetch).await.unwrap();
        assert_eq!(first.playlist_urls, 1);
        assert_eq!(
            std::fs::read_to_string(&queue).unwrap(),
            "https://youtu.be/dQw4w9WgXcQ\n"
        );

        // Fresh output dir so posts render again; the queue must not grow.
        let config = Config {
            output_dir: tmp.path().join("archive-2"),
            ..config
        };
        let second = archive_posts(&config, &posts, &NoFetch).await.unwrap();
        assert_eq!(second.playlist_urls, 0);
        assert_eq!(
            std::fs::read_to_string(&queue).unwrap(),
            "https://youtu.be/dQw4w9WgXcQ\n"
        );
    }

    #[tokio::test]
    async fn playlist_dedups_by_video_id_across_url_forms() {
        let tmp = tempfile::tempdir().unwrap();
        let queue = tmp.path().join("playlist.txt");
        let config = Config {
            playlist_queue: Some(queue.clone()),
            ..config(tmp.path().join("archive"))
        };
        let posts: Vec<Post> = serde_json::from_str(
            r#"[{
            "id": 3,
            "timestamp": 1700000000,
            "content": [
                {"type": "video", "url": "https://youtu.be/dQw4w9WgXcQ", "provider": "youtube"},
                {"type": "video", "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ", "provider": "youtube"},
                {"type": "video", "url": "https://vimeo.com/111", "provider": "vimeo"}
            ]
        }]"#,
        )
        .unwrap();

        let summary = archive_posts(&config, &posts, &NoFetch).await.unwrap();
        assert_eq!(summary.playlist_urls, 2);
        assert_eq!(
            std::fs::read_to_string(&queue).unwrap(),
            "https://youtu.be/dQw4w9WgXcQ\nhttps://vimeo.com/111\n"
        );
    }
}
