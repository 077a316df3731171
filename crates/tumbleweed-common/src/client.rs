//! API client: paginates through a blog's posts in NPF form.
//!
//! The client owns the call-rate budget (a small fixed delay between pages)
//! and the incremental time-window filter. It hands the pipeline a plain
//! `Vec<Post>`; nothing downstream talks to the posts endpoint.

use crate::error::{ArchiveError, Result};
use crate::post::Post;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::time::Duration;

const API_BASE: &str = "https://api.tumblr.com/v2";
const PAGE_LIMIT: usize = 20;
const PAGE_DELAY: Duration = Duration::from_millis(200);

pub struct TumblrClient {
    http: reqwest::Client,
    base_url: String,
    blog: String,
    api_key: String,
}

#[derive(Deserialize)]
struct Envelope {
    response: PageBody,
}

#[derive(Deserialize)]
struct PageBody {
    #[serde(default)]
    posts: Vec<Post>,
    #[serde(default)]
    total_posts: Option<u64>,
}

impl TumblrClient {
    pub fn new(blog: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: API_BASE.to_owned(),
            blog: blog.into(),
            api_key: api_key.into(),
        })
    }

    /// Overrides the API base URL. Test seam.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetches one page of posts. `limit` is capped at the API maximum of 20.
    pub async fn fetch_page(&self, limit: usize, offset: usize) -> Result<(Vec<Post>, Option<u64>)> {
        let url = format!("{}/blog/{}/posts", self.base_url, self.blog);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("limit", limit.min(PAGE_LIMIT).to_string()),
                ("offset", offset.to_string()),
                // Neue Post Format gives structured content blocks instead
                // of an opaque HTML blob.
                ("npf", "true".to_string()),
                ("api_key", self.api_key.clone()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArchiveError::Api {
                status: status.as_u16(),
                url,
            });
        }

        let envelope: Envelope = response.json().await?;
        Ok((envelope.response.posts, envelope.response.total_posts))
    }

    /// Fetches every post, or only those inside the incremental window when
    /// `incremental_hours` is set. Pages are walked oldest-last, so the
    /// window check can stop early once a page dips below the cutoff.
    pub async fn fetch_all(&self, incremental_hours: Option<u64>) -> Result<Vec<Post>> {
        let cutoff = incremental_hours
            .map(|hours| Utc::now() - ChronoDuration::hours(hours as i64));
        match cutoff {
            Some(cutoff) => tracing::info!(blog = %self.blog, %cutoff, "fetching posts inside window"),
            None => tracing::info!(blog = %self.blog, "fetching all posts"),
        }

        let mut all = Vec::new();
        let mut offset = 0usize;

        loop {
            let (posts, total) = self.fetch_page(PAGE_LIMIT, offset).await?;
            if posts.is_empty() {
                break;
            }
            let page_len = posts.len();

            if let Some(cutoff) = cutoff {
                let (kept, reached_cutoff) = filter_window(posts, cutoff);
                all.extend(kept);
                if reached_cutoff {
                    tracing::info!(count = all.len(), "reached cutoff time");
                    break;
                }
            } else {
                all.extend(posts);
                if let Some(total) = total {
                    if all.len() as u64 >= total {
                        break;
                    }
                }
            }

            tracing::debug!(count = all.len(), "fetched page");
            offset += page_len;

            // Stay well inside the documented rate budget.
            tokio::time::sleep(PAGE_DELAY).await;
        }

        tracing::info!(count = all.len(), "fetch complete");
        Ok(all)
    }
}

/// Keeps posts at or after the cutoff. The second value is true when the
/// page dipped below the cutoff, meaning pagination can stop.
fn filter_window(posts: Vec<Post>, cutoff: DateTime<Utc>) -> (Vec<Post>, bool) {
    let page_len = posts.len();
    let oldest_before_cutoff = posts
        .last()
        .map(|post| post.timestamp < cutoff)
        .unwrap_or(false);
    let kept: Vec<Post> = posts
        .into_iter()
        .filter(|post| post.timestamp >= cutoff)
        .collect();
    let reached = kept.len() < page_len || oldest_before_cutoff;
    (kept, reached)
}
