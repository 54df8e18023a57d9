//! Application-level wiring of the media subsystem.
//!
//! A [`MediaLoader`] is created once at startup and handed to every view that
//! loads media. It owns one network monitor shared by the image queue, the
//! video queue, and the viewport observer, so a connectivity change reaches
//! all of them at once.

use crate::cache::PersistentCache;
use crate::config::Config;
use crate::network::{ConnectionInfo, NetworkMonitor};
use crate::probe::{HttpProber, Prober};
use crate::profiling::PerformanceMonitor;
use crate::queue::LoadQueue;
use crate::resolver::CandidateResolver;
use crate::storage::{FileStore, KeyValueStore};
use crate::types::MediaKind;
use crate::visibility::ViewportObserver;
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Image and video queues plus their shared collaborators.
#[derive(Debug, Clone)]
pub struct MediaLoader {
    images: LoadQueue,
    videos: LoadQueue,
    network: NetworkMonitor,
    observer: ViewportObserver,
    monitor: Arc<PerformanceMonitor>,
}

impl MediaLoader {
    /// Wire the subsystem from explicit collaborators.
    ///
    /// Image resolutions persist in `store`; video resolutions are kept for the
    /// session only.
    pub fn new(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        prober: Arc<dyn Prober>,
        connection: ConnectionInfo,
    ) -> Result<Self> {
        let network = NetworkMonitor::new(config.network, connection);
        let monitor = Arc::new(PerformanceMonitor::new());
        let ttl = config.cache.ttl();

        let image_cache = PersistentCache::open(store, config.cache.storage_key("image"), ttl)?;
        let images = LoadQueue::builder(MediaKind::Image)
            .prober(Arc::clone(&prober))
            .resolver(CandidateResolver::new(
                MediaKind::Image,
                &config.media,
                config.formats,
            ))
            .cache(Arc::new(image_cache))
            .network(network.clone())
            .monitor(Arc::clone(&monitor))
            .placeholder(config.media.image_placeholder.clone())
            .build()?;

        let videos = LoadQueue::builder(MediaKind::Video)
            .prober(prober)
            .resolver(CandidateResolver::new(
                MediaKind::Video,
                &config.media,
                config.formats,
            ))
            .cache(Arc::new(PersistentCache::in_memory(ttl)))
            .network(network.clone())
            .monitor(Arc::clone(&monitor))
            .build()?;

        let profile = network.current_profile();
        info!(
            tier = %profile.tier,
            image_concurrency = profile.max_concurrency,
            video_concurrency = profile.video_concurrency,
            "Media loader ready"
        );

        Ok(Self {
            images,
            videos,
            observer: ViewportObserver::new(network.clone()),
            network,
            monitor,
        })
    }

    /// Wire the subsystem against a live origin, persisting under the
    /// configured data directory.
    pub fn connect(config: &Config, base_url: &str, connection: ConnectionInfo) -> Result<Self> {
        let store = FileStore::new(config.paths.data_dir.clone())?;
        let prober = HttpProber::new(&config.probe)?.with_base_url(base_url)?;
        Self::new(config, Arc::new(store), Arc::new(prober), connection)
    }

    /// Image queue.
    #[must_use]
    pub const fn images(&self) -> &LoadQueue {
        &self.images
    }

    /// Video queue.
    #[must_use]
    pub const fn videos(&self) -> &LoadQueue {
        &self.videos
    }

    /// Queue for `kind`.
    #[must_use]
    pub const fn queue(&self, kind: MediaKind) -> &LoadQueue {
        match kind {
            MediaKind::Image => &self.images,
            MediaKind::Video => &self.videos,
        }
    }

    /// Shared network monitor; feed connectivity changes here.
    #[must_use]
    pub const fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    /// Viewport observer using the shared network profile.
    #[must_use]
    pub const fn observer(&self) -> &ViewportObserver {
        &self.observer
    }

    /// Load-time samples from both queues.
    #[must_use]
    pub const fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    /// Clear both caches.
    pub fn clear_caches(&self) -> Result<()> {
        self.images.clear_cache()?;
        self.videos.clear_cache()
    }
}
