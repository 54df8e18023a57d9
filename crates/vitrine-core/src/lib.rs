//! # vitrine-core
//!
//! Media resolution for the storefront gallery: finds a working URL for every
//! photo and video the gallery asks for, without a CDN or an asset pipeline to
//! lean on.
//!
//! ## Architecture
//!
//! The crate is organized around a handful of explicitly constructed
//! components, wired together once at startup by [`MediaLoader`]:
//!
//! - **Network estimation**: maps connectivity hints onto a low/medium/high
//!   tier and publishes the resulting [`ConnectionProfile`]
//! - **Candidate resolution**: turns a nominal path into an ordered list of
//!   fallbacks (case, extension, directory)
//! - **Probing**: header-only existence checks against candidate URLs
//! - **Load queues**: bounded-concurrency, priority-ordered, de-duplicated
//!   resolution with cancellation
//! - **Persistent cache**: versioned, TTL-bounded hints so the next visit skips
//!   the probing
//! - **Visibility**: tight and loose viewport observations that decide when to
//!   load and at what priority
//! - **Profiling**: advisory load-time and web-vital samples
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vitrine_core::{Config, ConnectionInfo, MediaLoader};
//!
//! # async fn demo() -> vitrine_core::Result<()> {
//! let config = Config::load()?;
//! let loader = MediaLoader::connect(&config, "https://example.com", ConnectionInfo::default())?;
//!
//! let photo = loader.images().resolve_or_placeholder("/galeria/vestido.jpg", 7).await;
//! let clip = loader.videos().resolve("/videos/desfile.mp4", 10).await;
//! println!("{photo} {:?}", clip.ok());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Probe failures never surface; they just move resolution on to the next
//! candidate. What callers see is the terminal outcome:
//!
//! ```rust,no_run
//! use vitrine_core::{Error, MediaLoader};
//!
//! # async fn demo(loader: MediaLoader) {
//! match loader.videos().resolve("/videos/desfile.mp4", 10).await {
//!     Ok(url) => println!("play {url}"),
//!     Err(Error::Unresolvable { url }) => eprintln!("{url} is unavailable"),
//!     Err(e) if e.is_recoverable() => eprintln!("try again later: {e}"),
//!     Err(e) => eprintln!("error: {e}"),
//! }
//! # }
//! ```

/// Persistent resolution hint cache
pub mod cache;
/// Configuration management
pub mod config;
/// Error types and result aliases
pub mod error;
/// Gallery catalog, filtering, and load planning
pub mod gallery;
/// Application-level wiring
pub mod loader;
/// Network tier estimation
pub mod network;
/// Existence probes
pub mod probe;
/// Performance sampling
pub mod profiling;
/// Priority load queues
pub mod queue;
/// Fallback candidate generation
pub mod resolver;
/// Key-value persistence
pub mod storage;
/// Core data types
pub mod types;
/// Viewport visibility tracking
pub mod visibility;

// Re-export commonly used types
pub use cache::{CacheStats, PersistentCache};
pub use config::{
    CacheConfig, Config, FormatSupport, MediaConfig, NetworkConfig, PathsConfig, ProbeConfig,
    TierSettings,
};
pub use error::{Error, Result};
pub use gallery::{
    ALL_CATEGORIES, CarouselSlot, Catalog, CatalogFilter, CatalogItem, ImageSlot, carousel_window,
    plan_image_slots,
};
pub use loader::MediaLoader;
pub use network::{ConnectionInfo, ConnectionProfile, EffectiveType, NetworkMonitor, NetworkTier};
pub use probe::{HttpProber, Prober};
pub use profiling::{LoadTimer, MetricSummary, PerformanceMonitor, WebVital};
pub use queue::{LoadQueue, LoadQueueBuilder, PreloadStats, QueueStats};
pub use resolver::{CandidateResolver, display_name};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use types::{CacheEntry, DEFAULT_PRIORITY, MediaKind, PreloadHint, Priority, ResolutionStatus};
pub use visibility::{ObserveOptions, Observation, Rect, ViewportObserver, VisibilityState};
