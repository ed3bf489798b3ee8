//! Stream URL resolution.
//!
//! Input URLs have the shape `https://{host}/{type}/{userId}/{streamId}`.
//! [`resolve`] validates them against a [`Configuration`] and builds the
//! canonical backend URL for the stream type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Configuration;
use crate::error::{PlayerError, Result};

/// Kind of stream, taken from the first path segment of an input URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    /// HLS playlist served from object storage.
    Live,
    /// Live stream served through the player API.
    Live2,
    /// Recorded stream served through the player API.
    Vod,
}

impl StreamType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Live2 => "live2",
            Self::Vod => "vod",
        }
    }

    /// Canonical backend URL for this stream type.
    fn canonical_url(self, user_id: &str, stream_id: &str, config: &Configuration) -> String {
        match self {
            Self::Live => format!(
                "https://{}/{user_id}/{stream_id}/prog_index.m3u8",
                config.cloud_host
            ),
            Self::Live2 => format!("https://{}/api/stream/{user_id}/{stream_id}", config.host),
            Self::Vod => format!("https://{}/api/vod/{user_id}/{stream_id}", config.host),
        }
    }
}

impl FromStr for StreamType {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "live" => Ok(Self::Live),
            "live2" => Ok(Self::Live2),
            "vod" => Ok(Self::Vod),
            other => Err(PlayerError::InvalidStreamUrl(format!(
                "unknown stream type {other:?}"
            ))),
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated stream request.
///
/// Ids are copied verbatim from the input path; the canonical URL's host
/// comes only from the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub id: String,
    pub user_id: String,
    pub stream_type: StreamType,
    pub canonical_url: Url,
    /// Stand-in source played while the canonical URL is not yet live.
    pub placeholder_url: Option<Url>,
}

impl StreamDescriptor {
    /// Resolve `url` and attach an optional placeholder.
    pub fn with_placeholder(
        url: &Url,
        placeholder_url: Option<Url>,
        config: &Configuration,
    ) -> Result<Self> {
        let mut descriptor = resolve(url, config)?;
        descriptor.placeholder_url = placeholder_url;
        Ok(descriptor)
    }

    pub fn has_placeholder(&self) -> bool {
        self.placeholder_url.is_some()
    }
}

/// Validate an input URL and build its descriptor.
///
/// Resolution is all-or-nothing: any host, shape or type mismatch yields
/// [`PlayerError::InvalidStreamUrl`].
pub fn resolve(url: &Url, config: &Configuration) -> Result<StreamDescriptor> {
    let (stream_type, user_id, stream_id) = parse_url(url, config)?;
    let canonical = stream_type.canonical_url(user_id, stream_id, config);
    let canonical_url = Url::parse(&canonical)
        .map_err(|e| PlayerError::InvalidStreamUrl(format!("{canonical}: {e}")))?;

    Ok(StreamDescriptor {
        id: stream_id.to_string(),
        user_id: user_id.to_string(),
        stream_type,
        canonical_url,
        placeholder_url: None,
    })
}

/// Parse `raw` as a URL and resolve it.
pub fn resolve_str(raw: &str, config: &Configuration) -> Result<StreamDescriptor> {
    let url =
        Url::parse(raw).map_err(|e| PlayerError::InvalidStreamUrl(format!("{raw}: {e}")))?;
    resolve(&url, config)
}

/// Build and resolve the `live2` input URL for a user's stream.
///
/// Fails with [`PlayerError::WrongUserId`] before building anything when
/// `user_id` is empty. With `show_preview`, the configured preview clip is
/// attached as the placeholder.
pub fn resolve_user_stream(
    user_id: &str,
    stream_id: &str,
    show_preview: bool,
    config: &Configuration,
) -> Result<StreamDescriptor> {
    if user_id.is_empty() {
        return Err(PlayerError::WrongUserId);
    }

    let raw = format!(
        "https://{}/{}/{user_id}/{stream_id}",
        config.host,
        StreamType::Live2
    );
    let mut descriptor = resolve_str(&raw, config)?;
    // Ids must survive URL parsing unchanged, no query, fragment or escaping.
    if descriptor.user_id != user_id || descriptor.id != stream_id {
        return Err(PlayerError::InvalidStreamUrl(format!(
            "{raw}: user and stream ids must be plain path segments"
        )));
    }
    if show_preview {
        descriptor.placeholder_url = Some(config.preview_url()?);
    }
    Ok(descriptor)
}

fn parse_url<'a>(url: &'a Url, config: &Configuration) -> Result<(StreamType, &'a str, &'a str)> {
    if url.host_str() != Some(config.host.as_str()) {
        return Err(PlayerError::InvalidStreamUrl(format!(
            "{url}: host must be {}",
            config.host
        )));
    }

    let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
    let [kind, user_id, stream_id] = segments.as_slice() else {
        return Err(PlayerError::InvalidStreamUrl(format!(
            "{url}: expected /{{type}}/{{userId}}/{{streamId}}"
        )));
    };
    if user_id.is_empty() || stream_id.is_empty() {
        return Err(PlayerError::InvalidStreamUrl(format!(
            "{url}: empty user or stream id"
        )));
    }

    let stream_type = kind.parse::<StreamType>()?;
    Ok((stream_type, user_id, stream_id))
}
