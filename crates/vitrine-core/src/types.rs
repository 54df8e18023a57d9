use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Caller-assigned dispatch hint; higher values are serviced sooner.
pub type Priority = i32;

/// Default priority for requests that carry no layout information.
pub const DEFAULT_PRIORITY: Priority = 5;

/// Which family of assets a queue or resolver handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Gallery photos; terminal failures degrade to a placeholder graphic.
    Image,
    /// Carousel videos; terminal failures are surfaced to the caller.
    Video,
}

impl MediaKind {
    /// MIME family a successful probe is expected to report.
    #[must_use]
    pub const fn content_type_prefix(self) -> &'static str {
        match self {
            Self::Image => "image/",
            Self::Video => "video/",
        }
    }

    /// Lowercase name used in logs and metric names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// Lifecycle of one requested asset.
///
/// `unrequested` is the absence of an entry. `Resolved` and `Failed` are
/// terminal until the entry expires or the cache is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStatus {
    /// A probe sequence is queued or running.
    Pending,
    /// A working URL was found.
    Resolved,
    /// Every candidate failed.
    Failed,
}

/// One cached resolution, keyed by the nominal URL that was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// URL that actually answered (the nominal URL itself while pending or failed).
    #[serde(rename = "url")]
    pub resolved_url: String,
    /// Current lifecycle state.
    pub status: ResolutionStatus,
    /// Milliseconds since the Unix epoch when the status last changed.
    pub timestamp: i64,
    /// Priority of the request that created the entry.
    pub priority: Priority,
}

impl CacheEntry {
    /// Entry for a request that has just been queued.
    #[must_use]
    pub fn pending(url: &str, priority: Priority) -> Self {
        Self::stamped(url.to_string(), ResolutionStatus::Pending, priority)
    }

    /// Entry for a successful resolution.
    #[must_use]
    pub fn resolved(resolved_url: String, priority: Priority) -> Self {
        Self::stamped(resolved_url, ResolutionStatus::Resolved, priority)
    }

    /// Entry for a terminal failure.
    #[must_use]
    pub fn failed(url: &str, priority: Priority) -> Self {
        Self::stamped(url.to_string(), ResolutionStatus::Failed, priority)
    }

    fn stamped(resolved_url: String, status: ResolutionStatus, priority: Priority) -> Self {
        Self {
            resolved_url,
            status,
            timestamp: Utc::now().timestamp_millis(),
            priority,
        }
    }

    /// Whether the entry is older than `ttl_ms` relative to `now_ms`.
    #[must_use]
    pub const fn is_expired(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp) >= ttl_ms
    }
}

/// How eagerly a video element should buffer once its URL is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreloadHint {
    /// Buffer the whole clip.
    Auto,
    /// Fetch only enough to know duration and dimensions.
    Metadata,
}

impl PreloadHint {
    /// Featured clips (priority above 8) buffer fully; the rest fetch metadata.
    #[must_use]
    pub const fn for_priority(priority: Priority) -> Self {
        if priority > 8 { Self::Auto } else { Self::Metadata }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_entry_wire_format() {
        let entry = CacheEntry {
            resolved_url: "/galeria/a.webp".to_string(),
            status: ResolutionStatus::Resolved,
            timestamp: 1_700_000_000_000,
            priority: 7,
        };
        let json = serde_json::to_value(&entry).unwrap_or_default();
        assert_eq!(json["url"], "/galeria/a.webp");
        assert_eq!(json["status"], "resolved");
        assert_eq!(json["timestamp"], 1_700_000_000_000_i64);
        assert_eq!(json["priority"], 7);
    }

    #[test]
    fn test_expiry_boundary() {
        let mut entry = CacheEntry::pending("/a.jpg", 1);
        entry.timestamp = 1_000;
        assert!(!entry.is_expired(1_999, 1_000));
        assert!(entry.is_expired(2_000, 1_000));
    }

    #[test]
    fn test_preload_hint_threshold() {
        assert_eq!(PreloadHint::for_priority(9), PreloadHint::Auto);
        assert_eq!(PreloadHint::for_priority(8), PreloadHint::Metadata);
        assert_eq!(PreloadHint::for_priority(-3), PreloadHint::Metadata);
    }

    #[test]
    fn test_media_kind_content_types() {
        assert_eq!(MediaKind::Image.content_type_prefix(), "image/");
        assert_eq!(MediaKind::Video.content_type_prefix(), "video/");
    }
}
