//! Post data model for the Neue Post Format (NPF).
//!
//! The API returns posts as a list of loosely typed content blocks plus an
//! optional reblog trail. Everything here deserializes into a closed set of
//! variants; blocks that fail to match a known shape become
//! [`ContentUnit::Unknown`] instead of failing the whole post.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One archived post, as fetched from the API. Immutable once deserialized.
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    #[serde(rename = "id", default)]
    id_number: Option<u64>,
    #[serde(default)]
    id_string: Option<String>,
    /// Posting time, seconds since the epoch in the API.
    #[serde(default = "unix_epoch", deserialize_with = "timestamp_secs")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Canonical source link.
    #[serde(rename = "post_url", default)]
    pub url: String,
    /// One-line summary the API derives from the body. Used for titles.
    #[serde(default)]
    pub summary: String,
    /// Explicit title, still present on legacy text posts.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub post_type: String,
    /// The post's own content blocks. For a reblog this is the commentary
    /// added on top of the trail.
    #[serde(default)]
    pub content: Vec<ContentUnit>,
    /// Prior contributors, oldest first. Empty for original posts.
    #[serde(default)]
    pub trail: Vec<TrailLayer>,
}

impl Post {
    /// Stable identifier. The API sends both a numeric `id` and an
    /// `id_string`; the string form is preferred.
    pub fn id(&self) -> String {
        self.id_string
            .clone()
            .or_else(|| self.id_number.map(|n| n.to_string()))
            .unwrap_or_else(|| "unknown".to_owned())
    }
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

fn timestamp_secs<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let secs = i64::deserialize(d)?;
    Ok(DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH))
}

/// One layer of a reblog trail. The trail is a flat ordered list, not a
/// tree: each layer carries its own blocks and nothing points back at it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrailLayer {
    #[serde(default)]
    pub blog: TrailBlog,
    #[serde(default)]
    pub content: Vec<ContentUnit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrailBlog {
    #[serde(default)]
    pub name: Option<String>,
}

impl TrailLayer {
    /// Author handle for this layer. Deactivated blogs come through with no
    /// name; they render as a fixed placeholder so the chain's layer count
    /// stays visible.
    pub fn attribution(&self) -> &str {
        self.blog
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or("unknown")
    }
}

/// A typed content block.
///
/// Text blocks with a `quote` or list subtype surface as their own variants
/// so the renderer never has to re-inspect subtype strings.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentUnit {
    Text {
        text: String,
        subtype: TextSubtype,
        formatting: Vec<Formatting>,
    },
    Image {
        media: Vec<MediaObject>,
        alt_text: Option<String>,
    },
    Video {
        media: Option<MediaObject>,
        url: Option<String>,
        provider: Option<String>,
    },
    Audio {
        media: Option<MediaObject>,
        url: Option<String>,
        provider: Option<String>,
    },
    Link {
        url: String,
        title: Option<String>,
    },
    Quote {
        text: String,
        formatting: Vec<Formatting>,
    },
    ListItem {
        text: String,
        formatting: Vec<Formatting>,
        ordered: bool,
    },
    /// Multi-column presentation hint. Carries row groupings of block
    /// indices; markdown output is linear so this never reorders blocks.
    Layout { rows: Vec<Vec<usize>> },
    /// Anything we do not recognize. Rendered as a visible placeholder,
    /// never dropped silently.
    Unknown { kind: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextSubtype {
    #[default]
    Plain,
    Heading1,
    Heading2,
    Indented,
    Chat,
}

/// An inline formatting range over a text block. Offsets index the original
/// text, never partially transformed output.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Formatting {
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub end: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Target for `link` ranges.
    #[serde(default)]
    pub url: Option<String>,
    /// Target blog for `mention` ranges.
    #[serde(default)]
    pub blog: Option<MentionBlog>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MentionBlog {
    #[serde(default)]
    pub url: Option<String>,
}

/// A media object as the API declares it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaObject {
    #[serde(default)]
    pub url: String,
    #[serde(rename = "type", default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Image => "Image",
            MediaKind::Video => "Video",
            MediaKind::Audio => "Audio",
        }
    }
}

/// Native media is hosted by the source platform and eligible for download.
/// External media is a third-party embed and is always kept as a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Native,
    External,
}

const EXTERNAL_VIDEO_HOSTS: &[&str] = &["youtube.com", "youtu.be", "vimeo.com", "instagram.com"];
const EXTERNAL_AUDIO_HOSTS: &[&str] = &["spotify.com", "soundcloud.com", "bandcamp.com"];

/// Domain check for third-party streaming/social embeds. Images are always
/// native.
pub fn is_external_host(url: &str, kind: MediaKind) -> bool {
    let url = url.to_ascii_lowercase();
    let hosts = match kind {
        MediaKind::Image => return false,
        MediaKind::Video => EXTERNAL_VIDEO_HOSTS,
        MediaKind::Audio => EXTERNAL_AUDIO_HOSTS,
    };
    hosts.iter().any(|host| url.contains(host))
}

/// A media reference after normalization, ready for attachment resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRef {
    pub url: String,
    pub declared_type: Option<String>,
    pub declared_size_bytes: Option<u64>,
    pub kind: MediaKind,
    pub host_kind: HostKind,
}

impl MediaRef {
    /// Classifies hosting provenance from the declared provider when the API
    /// names one, falling back to the domain table.
    pub fn new(
        url: impl Into<String>,
        declared_type: Option<String>,
        declared_size_bytes: Option<u64>,
        kind: MediaKind,
        provider: Option<&str>,
    ) -> Self {
        let url = url.into();
        let external = match provider {
            Some(p) if !p.is_empty() && !p.eq_ignore_ascii_case("tumblr") => true,
            _ => is_external_host(&url, kind),
        };
        Self {
            url,
            declared_type,
            declared_size_bytes,
            kind,
            host_kind: if external {
                HostKind::External
            } else {
                HostKind::Native
            },
        }
    }

    pub fn is_external(&self) -> bool {
        self.host_kind == HostKind::External
    }
}

impl<'de> Deserialize<'de> for ContentUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(ContentUnit::from_value(value))
    }
}

#[derive(Deserialize)]
struct RawText {
    #[serde(default)]
    text: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    formatting: Vec<Formatting>,
}

#[derive(Deserialize)]
struct RawImage {
    #[serde(default)]
    media: Vec<MediaObject>,
    #[serde(default)]
    alt_text: Option<String>,
}

#[derive(Deserialize)]
struct RawEmbed {
    #[serde(default)]
    media: Option<MediaObject>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    provider: Option<String>,
}

#[derive(Deserialize)]
struct RawLink {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Deserialize)]
struct RawLayout {
    #[serde(default)]
    display: Vec<RawRow>,
}

#[derive(Deserialize)]
struct RawRow {
    #[serde(default)]
    blocks: Vec<usize>,
}

impl ContentUnit {
    fn from_value(value: Value) -> Self {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("untyped")
            .to_owned();
        let unknown = || ContentUnit::Unknown { kind: kind.clone() };

        match kind.as_str() {
            "text" => match serde_json::from_value::<RawText>(value) {
                Ok(raw) => Self::from_text(raw),
                Err(_) => unknown(),
            },
            "image" => match serde_json::from_value::<RawImage>(value) {
                Ok(raw) => ContentUnit::Image {
                    media: raw.media,
                    alt_text: raw.alt_text,
                },
                Err(_) => unknown(),
            },
            "video" => match serde_json::from_value::<RawEmbed>(value) {
                Ok(raw) => ContentUnit::Video {
                    media: raw.media,
                    url: raw.url,
                    provider: raw.provider,
                },
                Err(_) => unknown(),
            },
            "audio" => match serde_json::from_value::<RawEmbed>(value) {
                Ok(raw) => ContentUnit::Audio {
                    media: raw.media,
                    url: raw.url,
                    provider: raw.provider,
                },
                Err(_) => unknown(),
            },
            "link" => match serde_json::from_value::<RawLink>(value) {
                Ok(raw) => ContentUnit::Link {
                    url: raw.url,
                    title: raw.title,
                },
                Err(_) => unknown(),
            },
            "layout" => match serde_json::from_value::<RawLayout>(value) {
                Ok(raw) => ContentUnit::Layout {
                    rows: raw.display.into_iter().map(|row| row.blocks).collect(),
                },
                Err(_) => unknown(),
            },
            _ => unknown(),
        }
    }

    fn from_text(raw: RawText) -> Self {
        match raw.subtype.as_deref() {
            Some("quote") => ContentUnit::Quote {
                text: raw.text,
                formatting: raw.formatting,
            },
            Some("ordered-list-item") => ContentUnit::ListItem {
                text: raw.text,
                formatting: raw.formatting,
                ordered: true,
            },
            Some("unordered-list-item") => ContentUnit::ListItem {
                text: raw.text,
                formatting: raw.formatting,
                ordered: false,
            },
            other => ContentUnit::Text {
                text: raw.text,
                subtype: match other {
                    Some("heading1") => TextSubtype::Heading1,
                    Some("heading2") => TextSubtype::Heading2,
                    Some("indented") => TextSubtype::Indented,
                    Some("chat") => TextSubtype::Chat,
                    _ => TextSubtype::Plain,
                },
                formatting: raw.formatting,
            },
        }
    }
}
