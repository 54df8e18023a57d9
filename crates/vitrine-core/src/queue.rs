//! Bounded-concurrency priority queue that resolves nominal asset URLs.
//!
//! One [`LoadQueue`] serves one media family. Callers ask for a URL at a
//! priority; the queue answers from the [`PersistentCache`] when it can,
//! otherwise it parks the request in a wait list ordered by descending
//! priority (FIFO among equals) and starts workers while the current
//! [`ConnectionProfile`](crate::ConnectionProfile) ceiling allows.
//!
//! Identical URLs share one resolution: a second caller for a URL that is
//! already queued or in flight attaches to it instead of probing again. A
//! caller that stops waiting detaches; once the last caller has gone the
//! resolution is cancelled and its slot freed.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vitrine_core::{
//!     CandidateResolver, Config, HttpProber, LoadQueue, MediaKind, NetworkMonitor,
//!     PersistentCache,
//! };
//!
//! # async fn demo() -> vitrine_core::Result<()> {
//! let config = Config::default();
//! let prober = HttpProber::new(&config.probe)?.with_base_url("https://example.com")?;
//! let queue = LoadQueue::builder(MediaKind::Image)
//!     .prober(Arc::new(prober))
//!     .resolver(CandidateResolver::new(MediaKind::Image, &config.media, config.formats))
//!     .cache(Arc::new(PersistentCache::in_memory(config.cache.ttl())))
//!     .network(NetworkMonitor::unknown(config.network))
//!     .placeholder("/placeholder.svg")
//!     .build()?;
//!
//! let url = queue.resolve_or_placeholder("/galeria/vestido.jpg", 7).await;
//! # let _ = url;
//! # Ok(())
//! # }
//! ```

use crate::cache::PersistentCache;
use crate::network::NetworkMonitor;
use crate::probe::Prober;
use crate::profiling::PerformanceMonitor;
use crate::resolver::CandidateResolver;
use crate::types::{CacheEntry, MediaKind, Priority, ResolutionStatus};
use crate::{Error, Result};
use futures::future::join_all;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Snapshot of queue occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Resolutions waiting for a slot.
    pub queued: usize,
    /// Resolutions currently probing.
    pub active: usize,
    /// Highest `active` value observed since the queue was built.
    pub peak_active: usize,
    /// Ceiling the current network profile allows.
    pub max_concurrent: usize,
}

/// Outcome of a batch preload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PreloadStats {
    /// URLs requested.
    pub total: usize,
    /// URLs that resolved.
    pub loaded: usize,
    /// URLs that failed or were cancelled.
    pub errors: usize,
    /// No URL was abandoned before reaching a terminal outcome.
    pub complete: bool,
}

/// Priority scheduler for one media family. Cheap to clone.
#[derive(Clone)]
pub struct LoadQueue {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for LoadQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadQueue")
            .field("kind", &self.inner.kind)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Assembles a [`LoadQueue`] from its collaborators.
#[must_use]
pub struct LoadQueueBuilder {
    kind: MediaKind,
    prober: Option<Arc<dyn Prober>>,
    resolver: Option<CandidateResolver>,
    cache: Option<Arc<PersistentCache>>,
    network: Option<NetworkMonitor>,
    monitor: Option<Arc<PerformanceMonitor>>,
    placeholder: Option<String>,
}

impl LoadQueueBuilder {
    /// Existence checker used for every candidate.
    pub fn prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Candidate generator; must be built for the same media kind.
    pub fn resolver(mut self, resolver: CandidateResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Hint cache shared with nothing else of a different media kind.
    pub fn cache(mut self, cache: Arc<PersistentCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Source of the concurrency ceiling.
    pub fn network(mut self, network: NetworkMonitor) -> Self {
        self.network = Some(network);
        self
    }

    /// Receives load-time samples.
    pub fn monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// URL substituted by [`LoadQueue::resolve_or_placeholder`] on failure.
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Build the queue.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a required collaborator is missing or
    /// the resolver serves a different media kind.
    pub fn build(self) -> Result<LoadQueue> {
        let missing = |what: &str| Error::Config(format!("load queue is missing a {what}"));
        let resolver = self.resolver.ok_or_else(|| missing("resolver"))?;
        if resolver.kind() != self.kind {
            return Err(Error::Config(format!(
                "{} queue given a {} resolver",
                self.kind.as_str(),
                resolver.kind().as_str()
            )));
        }
        Ok(LoadQueue {
            inner: Arc::new(Inner {
                kind: self.kind,
                prober: self.prober.ok_or_else(|| missing("prober"))?,
                resolver,
                cache: self.cache.ok_or_else(|| missing("cache"))?,
                network: self.network.ok_or_else(|| missing("network monitor"))?,
                monitor: self.monitor,
                placeholder: self.placeholder,
                state: Mutex::new(QueueState::default()),
            }),
        })
    }
}

impl LoadQueue {
    /// Start building a queue for `kind`.
    pub fn builder(kind: MediaKind) -> LoadQueueBuilder {
        LoadQueueBuilder {
            kind,
            prober: None,
            resolver: None,
            cache: None,
            network: None,
            monitor: None,
            placeholder: None,
        }
    }

    /// Media family this queue serves.
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    /// Hint cache backing this queue.
    #[must_use]
    pub fn cache(&self) -> &Arc<PersistentCache> {
        &self.inner.cache
    }

    /// Resolve `url` to a working URL.
    ///
    /// # Errors
    ///
    /// [`Error::Unresolvable`] when every candidate failed, now or earlier in
    /// the session; [`Error::InvalidUrl`] for an empty URL.
    #[instrument(skip(self), fields(kind = self.inner.kind.as_str()))]
    pub async fn resolve(&self, url: &str, priority: Priority) -> Result<String> {
        let (guard, rx) = match Inner::request(&self.inner, url, priority)? {
            Request::Ready(result) => return result,
            Request::Waiting { guard, rx } => (guard, rx),
        };
        let outcome = rx.await;
        drop(guard);
        match outcome {
            Ok(Some(resolved)) => Ok(resolved),
            Ok(None) => Err(Error::Unresolvable {
                url: url.to_string(),
            }),
            Err(_) => Err(Error::Cancelled),
        }
    }

    /// Like [`resolve`](Self::resolve), but gives up when `cancel` fires.
    ///
    /// Giving up detaches this caller. If nobody else is waiting on the same
    /// URL the resolution is aborted and its slot released.
    pub async fn resolve_with_cancel(
        &self,
        url: &str,
        priority: Priority,
        cancel: CancellationToken,
    ) -> Result<String> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            result = self.resolve(url, priority) => result,
        }
    }

    /// Resolve `url`, substituting the placeholder when it cannot be resolved.
    ///
    /// Without a configured placeholder the nominal URL is returned unchanged.
    pub async fn resolve_or_placeholder(&self, url: &str, priority: Priority) -> String {
        match self.resolve(url, priority).await {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!(url, "Using placeholder: {e}");
                self.inner
                    .placeholder
                    .clone()
                    .unwrap_or_else(|| url.to_string())
            },
        }
    }

    /// Resolve many URLs at `priority`; failures are counted, never raised.
    pub async fn preload(&self, urls: &[String], priority: Priority) -> PreloadStats {
        self.preload_with_cancel(urls, priority, CancellationToken::new())
            .await
    }

    /// Like [`preload`](Self::preload), but stops waiting when `cancel` fires.
    ///
    /// URLs still outstanding at that point count as errors and the stats are
    /// marked incomplete.
    #[instrument(skip(self, urls, cancel), fields(kind = self.inner.kind.as_str(), count = urls.len()))]
    pub async fn preload_with_cancel(
        &self,
        urls: &[String],
        priority: Priority,
        cancel: CancellationToken,
    ) -> PreloadStats {
        let results = join_all(
            urls.iter()
                .map(|url| self.resolve_with_cancel(url, priority, cancel.clone())),
        )
        .await;
        let loaded = results.iter().filter(|r| r.is_ok()).count();
        let stats = PreloadStats {
            total: urls.len(),
            loaded,
            errors: results.len() - loaded,
            complete: !results.iter().any(|r| matches!(r, Err(Error::Cancelled))),
        };
        info!(
            loaded = stats.loaded,
            errors = stats.errors,
            complete = stats.complete,
            "Preload finished"
        );
        stats
    }

    /// Current status of `url`, if it has been requested.
    pub fn status(&self, url: &str) -> Option<ResolutionStatus> {
        self.inner.cache.get(url).map(|entry| entry.status)
    }

    /// Forget every cached outcome, in memory and in storage.
    pub fn clear_cache(&self) -> Result<()> {
        self.inner.cache.clear()
    }

    /// Occupancy snapshot.
    pub fn stats(&self) -> QueueStats {
        let max_concurrent = self.inner.ceiling();
        let state = self.inner.lock();
        QueueStats {
            queued: state.pending.values().filter(|p| !p.in_flight).count(),
            active: state.active,
            peak_active: state.peak_active,
            max_concurrent,
        }
    }
}

struct Inner {
    kind: MediaKind,
    prober: Arc<dyn Prober>,
    resolver: CandidateResolver,
    cache: Arc<PersistentCache>,
    network: NetworkMonitor,
    monitor: Option<Arc<PerformanceMonitor>>,
    placeholder: Option<String>,
    state: Mutex<QueueState>,
}

#[derive(Default)]
struct QueueState {
    waiting: BinaryHeap<Queued>,
    pending: HashMap<String, Pending>,
    active: usize,
    peak_active: usize,
    next_seq: u64,
    next_id: u64,
}

impl QueueState {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// One resolution shared by every caller of the same URL.
struct Pending {
    id: u64,
    waiters: Vec<(u64, oneshot::Sender<Option<String>>)>,
    cancel: CancellationToken,
    priority: Priority,
    /// Sequence number of the live wait-list entry; older entries are stale.
    seq: u64,
    in_flight: bool,
}

/// Wait-list entry. Higher priority first, then lower sequence number.
#[derive(Debug, PartialEq, Eq)]
struct Queued {
    priority: Priority,
    seq: u64,
    url: String,
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

enum Request {
    Ready(Result<String>),
    Waiting {
        guard: WaiterGuard,
        rx: oneshot::Receiver<Option<String>>,
    },
}

enum Outcome {
    Resolved(String),
    Failed,
    Cancelled,
}

/// Detaches its caller from a pending resolution when dropped.
struct WaiterGuard {
    inner: Arc<Inner>,
    url: String,
    pending_id: u64,
    waiter_id: u64,
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        self.inner
            .detach(&self.url, self.pending_id, self.waiter_id);
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ceiling(&self) -> usize {
        let profile = self.network.current_profile();
        match self.kind {
            MediaKind::Image => profile.max_concurrency,
            MediaKind::Video => profile.video_concurrency,
        }
    }

    /// Answer from cache, join a pending resolution, or enqueue a new one.
    fn request(this: &Arc<Self>, url: &str, priority: Priority) -> Result<Request> {
        if url.trim().is_empty() {
            return Err(Error::InvalidUrl("empty asset URL".into()));
        }

        let mut state = this.lock();
        if let Some(entry) = this.cache.get(url) {
            match entry.status {
                ResolutionStatus::Resolved => {
                    debug!(url, resolved = %entry.resolved_url, "Cache hit");
                    return Ok(Request::Ready(Ok(entry.resolved_url)));
                },
                ResolutionStatus::Failed => {
                    debug!(url, "Cached failure");
                    return Ok(Request::Ready(Err(Error::Unresolvable {
                        url: url.to_string(),
                    })));
                },
                ResolutionStatus::Pending => {},
            }
        }

        let waiter_id = state.next_id();
        let fresh_id = state.next_id();
        let seq = state.next_seq();
        let (tx, rx) = oneshot::channel();
        let QueueState {
            waiting, pending, ..
        } = &mut *state;

        let pending_id = if let Some(existing) = pending.get_mut(url) {
            existing.waiters.push((waiter_id, tx));
            if !existing.in_flight && priority > existing.priority {
                debug!(url, from = existing.priority, to = priority, "Raised queued priority");
                existing.priority = priority;
                existing.seq = seq;
                waiting.push(Queued {
                    priority,
                    seq,
                    url: url.to_string(),
                });
            }
            existing.id
        } else {
            pending.insert(
                url.to_string(),
                Pending {
                    id: fresh_id,
                    waiters: vec![(waiter_id, tx)],
                    cancel: CancellationToken::new(),
                    priority,
                    seq,
                    in_flight: false,
                },
            );
            waiting.push(Queued {
                priority,
                seq,
                url: url.to_string(),
            });
            this.cache.put(url, CacheEntry::pending(url, priority));
            fresh_id
        };
        drop(state);

        Self::dispatch(this);
        Ok(Request::Waiting {
            guard: WaiterGuard {
                inner: Arc::clone(this),
                url: url.to_string(),
                pending_id,
                waiter_id,
            },
            rx,
        })
    }

    /// Start workers for the highest-priority waiting URLs while slots are free.
    ///
    /// The ceiling is read once per call, so a profile change applies to the
    /// next dispatch, never to work already running.
    fn dispatch(this: &Arc<Self>) {
        let Ok(handle) = Handle::try_current() else {
            warn!("No async runtime available; leaving work queued");
            return;
        };
        let ceiling = this.ceiling();

        let mut started = Vec::new();
        {
            let mut state = this.lock();
            while state.active < ceiling {
                let Some(item) = state.waiting.pop() else {
                    break;
                };
                let Some(pending) = state.pending.get_mut(&item.url) else {
                    continue;
                };
                if pending.in_flight || pending.seq != item.seq {
                    continue;
                }
                pending.in_flight = true;
                started.push((item.url, pending.id, pending.priority, pending.cancel.clone()));
                state.active += 1;
                state.peak_active = state.peak_active.max(state.active);
            }
        }

        for (url, id, priority, cancel) in started {
            handle.spawn(Self::run(Arc::clone(this), url, id, priority, cancel));
        }
    }

    async fn run(
        this: Arc<Self>,
        url: String,
        pending_id: u64,
        priority: Priority,
        cancel: CancellationToken,
    ) {
        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Outcome::Cancelled,
            found = this.probe_candidates(&url) => match found {
                Some(resolved) => Outcome::Resolved(resolved),
                None => Outcome::Failed,
            },
        };
        this.finish(&url, pending_id, priority, outcome, started);
        Self::dispatch(&this);
    }

    async fn probe_candidates(&self, url: &str) -> Option<String> {
        for candidate in self.resolver.candidates(url) {
            if self.prober.probe(&candidate, self.kind).await {
                return Some(candidate);
            }
        }
        None
    }

    fn finish(
        &self,
        url: &str,
        pending_id: u64,
        priority: Priority,
        outcome: Outcome,
        started: Instant,
    ) {
        let waiters = {
            let mut state = self.lock();
            state.active = state.active.saturating_sub(1);

            match state.pending.get(url) {
                Some(pending) if pending.id == pending_id => {},
                _ => {
                    // Every caller detached and the entry was already cleaned up.
                    debug!(url, "Discarding result of abandoned resolution");
                    return;
                },
            }
            let waiters = state
                .pending
                .remove(url)
                .map(|pending| pending.waiters)
                .unwrap_or_default();

            match &outcome {
                Outcome::Resolved(resolved) => self
                    .cache
                    .put(url, CacheEntry::resolved(resolved.clone(), priority)),
                Outcome::Failed => self.cache.put(url, CacheEntry::failed(url, priority)),
                Outcome::Cancelled => {
                    self.cache.remove(url);
                },
            }
            waiters
        };

        let elapsed = started.elapsed();
        let result = match outcome {
            Outcome::Resolved(resolved) => {
                info!(url, resolved = %resolved, elapsed_ms = elapsed.as_millis(), "Resolved");
                if let Some(monitor) = &self.monitor {
                    monitor.record_load(self.kind, elapsed);
                }
                if let Err(e) = self.cache.flush_to_storage() {
                    warn!(url, "Failed to persist resolution cache: {e}");
                }
                Some(resolved)
            },
            Outcome::Failed => {
                warn!(url, kind = self.kind.as_str(), "No working candidate");
                if let Some(monitor) = &self.monitor {
                    monitor.record(&format!("{}_failures", self.kind.as_str()), 1.0);
                }
                None
            },
            Outcome::Cancelled => None,
        };

        for (_, tx) in waiters {
            // A closed receiver means that caller stopped waiting.
            let _ = tx.send(result.clone());
        }
    }

    /// Remove one caller; abort the resolution when it was the last.
    fn detach(&self, url: &str, pending_id: u64, waiter_id: u64) {
        let mut state = self.lock();
        let Some(pending) = state.pending.get_mut(url) else {
            return;
        };
        if pending.id != pending_id {
            return;
        }
        pending.waiters.retain(|(id, _)| *id != waiter_id);
        if !pending.waiters.is_empty() {
            return;
        }

        if let Some(abandoned) = state.pending.remove(url) {
            abandoned.cancel.cancel();
            if self
                .cache
                .get(url)
                .is_some_and(|entry| entry.status == ResolutionStatus::Pending)
            {
                self.cache.remove(url);
            }
            debug!(url, in_flight = abandoned.in_flight, "Resolution abandoned");
        }
    }
}
