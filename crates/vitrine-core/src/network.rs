//! Network condition estimation.
//!
//! The host reports what it knows about the connection (effective type,
//! downlink, data-saver) through [`NetworkMonitor::update`]. The monitor maps
//! that onto a coarse [`NetworkTier`] and publishes a [`ConnectionProfile`]
//! that queues and observers read when they schedule new work. Work already
//! in flight is never adjusted after a change.

use crate::config::{NetworkConfig, TierSettings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Effective connection type as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EffectiveType {
    /// `slow-2g`
    #[serde(rename = "slow-2g")]
    Slow2g,
    /// `2g`
    #[serde(rename = "2g")]
    TwoG,
    /// `3g`
    #[serde(rename = "3g")]
    ThreeG,
    /// `4g`
    #[serde(rename = "4g")]
    FourG,
    /// Not reported or not recognized.
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl EffectiveType {
    /// Parse the host's string form; anything unrecognized is `Unknown`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => Self::Slow2g,
            "2g" => Self::TwoG,
            "3g" => Self::ThreeG,
            "4g" => Self::FourG,
            _ => Self::Unknown,
        }
    }
}

/// Raw connectivity hints.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Effective connection type.
    pub effective_type: EffectiveType,
    /// Estimated downlink in megabits per second.
    pub downlink_mbps: Option<f64>,
    /// Estimated round-trip time in milliseconds.
    pub rtt_ms: Option<u32>,
    /// The user asked for reduced data usage.
    pub save_data: bool,
}

/// Coarse network quality classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkTier {
    /// Slow or metered.
    Low,
    /// Usable but constrained, or unknown.
    Medium,
    /// Fast.
    High,
}

impl NetworkTier {
    /// Classify connectivity hints.
    ///
    /// Data-saver always wins. A 3g connection is promoted to medium only when
    /// its measured downlink exceeds `medium_downlink_mbps`.
    #[must_use]
    pub fn classify(info: &ConnectionInfo, medium_downlink_mbps: f64) -> Self {
        if info.save_data {
            return Self::Low;
        }
        match info.effective_type {
            EffectiveType::Slow2g | EffectiveType::TwoG => Self::Low,
            EffectiveType::ThreeG => match info.downlink_mbps {
                Some(downlink) if downlink > medium_downlink_mbps => Self::Medium,
                _ => Self::Low,
            },
            EffectiveType::FourG => Self::High,
            EffectiveType::Unknown => Self::Medium,
        }
    }
}

impl fmt::Display for NetworkTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// Scheduling parameters derived from the current tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Tier the numbers below were derived from.
    pub tier: NetworkTier,
    /// Ceiling on in-flight image resolutions.
    pub max_concurrency: usize,
    /// Ceiling on in-flight video resolutions.
    pub video_concurrency: usize,
    /// Proximity margin beyond the viewport, in pixels.
    pub preload_distance_px: u32,
    /// Video rendition to request.
    pub video_quality: NetworkTier,
    /// Data-saver was requested.
    pub save_data: bool,
}

impl ConnectionProfile {
    /// Build the profile for `info` from the tier table.
    #[must_use]
    pub fn derive(info: &ConnectionInfo, config: &NetworkConfig) -> Self {
        let tier = NetworkTier::classify(info, config.medium_downlink_mbps);
        let settings: TierSettings = match tier {
            NetworkTier::Low => config.low,
            NetworkTier::Medium => config.medium,
            NetworkTier::High => config.high,
        };
        Self {
            tier,
            // A zero ceiling would stall every queue.
            max_concurrency: settings.max_concurrency.max(1),
            video_concurrency: settings.video_concurrency.max(1),
            preload_distance_px: settings.preload_distance_px,
            video_quality: tier,
            save_data: info.save_data,
        }
    }

    /// Whether speculative prefetching is worthwhile.
    #[must_use]
    pub const fn should_preload(&self) -> bool {
        !matches!(self.tier, NetworkTier::Low) && !self.save_data
    }

    /// Whether the connection should be treated as slow.
    #[must_use]
    pub const fn is_slow(&self) -> bool {
        matches!(self.tier, NetworkTier::Low) || self.save_data
    }
}

/// Publishes the current [`ConnectionProfile`] to every consumer.
///
/// Cheap to clone; all clones share the same channel.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    config: NetworkConfig,
    sender: Arc<watch::Sender<ConnectionProfile>>,
}

impl NetworkMonitor {
    /// Create a monitor seeded with the connection known at startup.
    #[must_use]
    pub fn new(config: NetworkConfig, initial: ConnectionInfo) -> Self {
        let (sender, _) = watch::channel(ConnectionProfile::derive(&initial, &config));
        Self {
            config,
            sender: Arc::new(sender),
        }
    }

    /// Monitor for hosts that expose no connectivity hints (medium tier).
    #[must_use]
    pub fn unknown(config: NetworkConfig) -> Self {
        Self::new(config, ConnectionInfo::default())
    }

    /// Snapshot of the current profile.
    #[must_use]
    pub fn current_profile(&self) -> ConnectionProfile {
        *self.sender.borrow()
    }

    /// Record a connectivity change and recompute the profile.
    pub fn update(&self, info: ConnectionInfo) -> ConnectionProfile {
        let profile = ConnectionProfile::derive(&info, &self.config);
        let previous = self.sender.send_replace(profile);
        if previous.tier != profile.tier {
            info!(
                from = %previous.tier,
                to = %profile.tier,
                max_concurrency = profile.max_concurrency,
                "Network tier changed"
            );
        }
        profile
    }

    /// Receiver that is notified on every profile change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionProfile> {
        self.sender.subscribe()
    }

    /// Whether speculative prefetching is worthwhile right now.
    #[must_use]
    pub fn should_preload(&self) -> bool {
        self.current_profile().should_preload()
    }

    /// Whether the connection should be treated as slow right now.
    #[must_use]
    pub fn is_slow_connection(&self) -> bool {
        self.current_profile().is_slow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(effective_type: EffectiveType, downlink: Option<f64>, save_data: bool) -> ConnectionInfo {
        ConnectionInfo {
            effective_type,
            downlink_mbps: downlink,
            rtt_ms: None,
            save_data,
        }
    }

    #[test]
    fn test_tier_table() {
        let cases = [
            (info(EffectiveType::Slow2g, None, false), NetworkTier::Low),
            (info(EffectiveType::TwoG, Some(10.0), false), NetworkTier::Low),
            (info(EffectiveType::ThreeG, Some(1.0), false), NetworkTier::Low),
            (info(EffectiveType::ThreeG, None, false), NetworkTier::Low),
            (info(EffectiveType::ThreeG, Some(2.0), false), NetworkTier::Medium),
            (info(EffectiveType::FourG, None, false), NetworkTier::High),
            (info(EffectiveType::Unknown, None, false), NetworkTier::Medium),
            (info(EffectiveType::FourG, Some(50.0), true), NetworkTier::Low),
        ];
        for (input, expected) in cases {
            assert_eq!(NetworkTier::classify(&input, 1.5), expected, "{input:?}");
        }
    }

    #[test]
    fn test_downlink_threshold_is_exclusive() {
        let at_threshold = info(EffectiveType::ThreeG, Some(1.5), false);
        assert_eq!(NetworkTier::classify(&at_threshold, 1.5), NetworkTier::Low);
    }

    #[test]
    fn test_parse_effective_type() {
        assert_eq!(EffectiveType::parse("4G"), EffectiveType::FourG);
        assert_eq!(EffectiveType::parse(" slow-2g "), EffectiveType::Slow2g);
        assert_eq!(EffectiveType::parse("5g"), EffectiveType::Unknown);
    }

    #[test]
    fn test_profile_uses_tier_settings() {
        let config = NetworkConfig::default();
        let low = ConnectionProfile::derive(&info(EffectiveType::TwoG, None, false), &config);
        assert_eq!(low.max_concurrency, 2);
        assert_eq!(low.video_concurrency, 1);
        assert_eq!(low.preload_distance_px, 50);
        assert!(low.is_slow());
        assert!(!low.should_preload());

        let high = ConnectionProfile::derive(&info(EffectiveType::FourG, None, false), &config);
        assert_eq!(high.max_concurrency, 20);
        assert_eq!(high.video_quality, NetworkTier::High);
        assert!(high.should_preload());
    }

    #[test]
    fn test_zero_ceiling_is_clamped() {
        let mut config = NetworkConfig::default();
        config.high.max_concurrency = 0;
        let profile = ConnectionProfile::derive(&info(EffectiveType::FourG, None, false), &config);
        assert_eq!(profile.max_concurrency, 1);
    }

    #[tokio::test]
    async fn test_monitor_publishes_changes() {
        let monitor = NetworkMonitor::unknown(NetworkConfig::default());
        assert_eq!(monitor.current_profile().tier, NetworkTier::Medium);

        let mut rx = monitor.subscribe();
        let clone = monitor.clone();
        clone.update(info(EffectiveType::TwoG, None, false));

        assert!(rx.has_changed().unwrap_or(false));
        assert_eq!(rx.borrow_and_update().tier, NetworkTier::Low);
        assert!(monitor.is_slow_connection());
        assert!(!monitor.should_preload());
    }
}
